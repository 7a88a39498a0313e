//! Error taxonomy for coordinator and dispenser operations.

use thiserror::Error;

/// Failure surface of session and reward operations.
///
/// `NotFound` and `NotAllowed` are the two outcomes callers branch on;
/// anything the backing stores report bubbles up as `Store`.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The referenced user, lobby, sound or case does not exist, or the
    /// caller is not in a position to see it.
    #[error("not found")]
    NotFound,
    /// The operation is understood but refused: duplicate connection,
    /// foreign sound or case, or an active cooldown.
    #[error("not allowed")]
    NotAllowed,
    /// The backing store failed.
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl SessionError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, SessionError::NotFound)
    }

    pub fn is_not_allowed(&self) -> bool {
        matches!(self, SessionError::NotAllowed)
    }
}
