//! Account registration and lookup.
//!
//! Accounts are created on first contact: an unknown username becomes a
//! fresh user, a known one is fetched as-is.

use std::sync::Arc;

use crate::error::SessionError;
use crate::model::{Role, User, MAX_USERNAME_LEN};
use crate::store::UserStore;

/// A username must be non-blank and at most [`MAX_USERNAME_LEN`]
/// characters. Callers are expected to trim first.
pub fn valid_username(username: &str) -> bool {
    !username.trim().is_empty() && username.chars().count() <= MAX_USERNAME_LEN
}

/// Fetch the user behind `username`, creating it when missing. The second
/// value reports whether the account is new.
pub async fn register_or_fetch(
    users: &Arc<dyn UserStore>,
    username: &str,
) -> Result<(User, bool), SessionError> {
    if let Some(user) = users.get_by_username(username).await? {
        return Ok((user, false));
    }

    match users.add(username.to_owned(), Role::User).await {
        Ok(user) => {
            tracing::info!(username = %user.username, user_id = %user.id, "user registered");
            Ok((user, true))
        }
        // Lost a registration race; the other task's insert wins.
        Err(err) => match users.get_by_username(username).await? {
            Some(user) => Ok((user, false)),
            None => Err(SessionError::Store(err)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn username_rules() {
        assert!(valid_username("alice"));
        assert!(valid_username(&"a".repeat(30)));

        assert!(!valid_username(""));
        assert!(!valid_username("   "));
        assert!(!valid_username(&"a".repeat(31)));
    }

    #[tokio::test]
    async fn registers_once_and_fetches_after() {
        let users: Arc<dyn UserStore> = Arc::new(MemoryStore::new());

        let (first, created) = register_or_fetch(&users, "alice").await.unwrap();
        assert!(created);

        let (second, created) = register_or_fetch(&users, "alice").await.unwrap();
        assert!(!created);
        assert_eq!(first.id, second.id);
    }
}
