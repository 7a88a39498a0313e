//! Per-connection event sinks.
//!
//! Each WebSocket registers an unbounded channel under its connection id;
//! session handlers push events through the [`NotificationPort`] and the
//! socket task forwards them. A closed sink is skipped, never an error:
//! the disconnect cleanup will drop it shortly.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::{mpsc, RwLock};

use crate::model::ConnectionId;
use crate::notify::NotificationPort;
use crate::protocol::ServerMsg;

#[derive(Clone, Default)]
pub struct Fanout {
    sinks: Arc<RwLock<HashMap<ConnectionId, mpsc::UnboundedSender<ServerMsg>>>>,
}

impl Fanout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sink for `connection` and return its receiving end.
    pub async fn register(&self, connection: ConnectionId) -> mpsc::UnboundedReceiver<ServerMsg> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.sinks.write().await.insert(connection, tx);
        rx
    }

    pub async fn unregister(&self, connection: &ConnectionId) {
        self.sinks.write().await.remove(connection);
    }

    pub async fn connected(&self) -> usize {
        self.sinks.read().await.len()
    }
}

#[async_trait]
impl NotificationPort for Fanout {
    async fn send(&self, connections: &[ConnectionId], event: ServerMsg) -> Result<()> {
        let sinks = self.sinks.read().await;
        for connection in connections {
            match sinks.get(connection) {
                Some(tx) => {
                    if tx.send(event.clone()).is_err() {
                        tracing::debug!(connection = %connection, "sink closed, dropping event");
                    }
                }
                None => {
                    tracing::debug!(connection = %connection, "no sink for connection");
                }
            }
        }
        Ok(())
    }

    async fn broadcast_except(&self, exclude: &ConnectionId, event: ServerMsg) -> Result<()> {
        let sinks = self.sinks.read().await;
        for (connection, tx) in sinks.iter() {
            if connection == exclude {
                continue;
            }
            if tx.send(event.clone()).is_err() {
                tracing::debug!(connection = %connection, "sink closed, dropping event");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ErrorCode;

    fn conn(label: &str) -> ConnectionId {
        ConnectionId(label.to_owned())
    }

    fn probe() -> ServerMsg {
        ServerMsg::error(ErrorCode::Internal, "probe")
    }

    #[tokio::test]
    async fn send_targets_only_listed_connections() {
        let fanout = Fanout::new();
        let mut rx1 = fanout.register(conn("c1")).await;
        let mut rx2 = fanout.register(conn("c2")).await;

        fanout.send(&[conn("c1")], probe()).await.unwrap();

        assert_eq!(rx1.recv().await, Some(probe()));
        assert!(rx2.try_recv().is_err());
    }

    #[tokio::test]
    async fn broadcast_skips_the_excluded_connection() {
        let fanout = Fanout::new();
        let mut rx1 = fanout.register(conn("c1")).await;
        let mut rx2 = fanout.register(conn("c2")).await;

        fanout.broadcast_except(&conn("c1"), probe()).await.unwrap();

        assert!(rx1.try_recv().is_err());
        assert_eq!(rx2.recv().await, Some(probe()));
    }

    #[tokio::test]
    async fn unknown_and_closed_sinks_are_skipped() {
        let fanout = Fanout::new();
        let rx = fanout.register(conn("c1")).await;
        drop(rx);

        // Neither the closed sink nor the unknown one errors.
        fanout
            .send(&[conn("c1"), conn("ghost")], probe())
            .await
            .unwrap();

        fanout.unregister(&conn("c1")).await;
        assert_eq!(fanout.connected().await, 0);
    }
}
