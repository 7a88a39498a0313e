//! Outbound notification port consumed by the session handlers.

use anyhow::Result;
use async_trait::async_trait;

use crate::model::ConnectionId;
use crate::protocol::ServerMsg;

/// Delivers server events to identified connections. The WebSocket
/// fan-out registry is the shipped implementation.
#[async_trait]
pub trait NotificationPort: Send + Sync {
    /// Send one event to every listed connection. Unknown or closed
    /// connections are skipped.
    async fn send(&self, connections: &[ConnectionId], event: ServerMsg) -> Result<()>;

    /// Send one event to every registered connection except `exclude`.
    async fn broadcast_except(&self, exclude: &ConnectionId, event: ServerMsg) -> Result<()>;
}
