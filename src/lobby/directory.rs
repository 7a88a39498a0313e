//! Lobby records and their member sets.
//!
//! The directory tracks which lobbies exist and which usernames sit in
//! them; who may enter or leave is the coordinator's business. The
//! `user_count` of every record always equals the size of its member set.

use std::collections::{BTreeSet, HashMap};

use crate::model::{Lobby, LobbyId};

#[derive(Debug, Default)]
pub struct LobbyDirectory {
    lobbies: HashMap<LobbyId, Lobby>,
    // BTreeSet keeps member listings in a stable order.
    members: HashMap<LobbyId, BTreeSet<String>>,
}

impl LobbyDirectory {
    /// Insert an empty lobby under `id` and return its record.
    pub fn create(&mut self, id: LobbyId, name: String) -> Lobby {
        let lobby = Lobby {
            id: id.clone(),
            name,
            user_count: 0,
        };
        self.lobbies.insert(id.clone(), lobby.clone());
        self.members.insert(id, BTreeSet::new());
        lobby
    }

    /// Add `username` to the lobby and return the updated member count,
    /// or `None` if no such lobby exists. Adding a member twice is a no-op.
    pub fn add_member(&mut self, id: &LobbyId, username: &str) -> Option<u32> {
        let lobby = self.lobbies.get_mut(id)?;
        let members = self.members.entry(id.clone()).or_default();
        if members.insert(username.to_owned()) {
            lobby.user_count += 1;
        }
        Some(lobby.user_count)
    }

    /// Remove `username` from the lobby and return the remaining member
    /// count, or `None` if no such lobby exists.
    pub fn remove_member(&mut self, id: &LobbyId, username: &str) -> Option<u32> {
        let lobby = self.lobbies.get_mut(id)?;
        if let Some(members) = self.members.get_mut(id) {
            if members.remove(username) {
                lobby.user_count = lobby.user_count.saturating_sub(1);
            }
        }
        Some(lobby.user_count)
    }

    /// Delete the lobby record and its member set.
    pub fn remove(&mut self, id: &LobbyId) -> bool {
        self.members.remove(id);
        self.lobbies.remove(id).is_some()
    }

    pub fn get(&self, id: &LobbyId) -> Option<&Lobby> {
        self.lobbies.get(id)
    }

    pub fn list_all(&self) -> Vec<Lobby> {
        let mut lobbies: Vec<Lobby> = self.lobbies.values().cloned().collect();
        lobbies.sort_by(|a, b| a.id.cmp(&b.id));
        lobbies
    }

    /// Usernames in the lobby, or empty for an unknown id.
    pub fn members_of(&self, id: &LobbyId) -> Vec<String> {
        self.members
            .get(id)
            .map(|m| m.iter().cloned().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lobby(label: &str) -> LobbyId {
        LobbyId(label.to_owned())
    }

    #[test]
    fn count_tracks_membership() {
        let mut directory = LobbyDirectory::default();
        let created = directory.create(lobby("l1"), "Party".into());
        assert_eq!(created.user_count, 0);

        assert_eq!(directory.add_member(&lobby("l1"), "alice"), Some(1));
        assert_eq!(directory.add_member(&lobby("l1"), "bob"), Some(2));
        // Double-add is a no-op.
        assert_eq!(directory.add_member(&lobby("l1"), "alice"), Some(2));

        assert_eq!(directory.remove_member(&lobby("l1"), "alice"), Some(1));
        assert_eq!(directory.remove_member(&lobby("l1"), "alice"), Some(1));
        assert_eq!(directory.remove_member(&lobby("l1"), "bob"), Some(0));

        let record = directory.get(&lobby("l1")).unwrap();
        assert_eq!(record.user_count as usize, directory.members_of(&lobby("l1")).len());
    }

    #[test]
    fn unknown_lobby_yields_none() {
        let mut directory = LobbyDirectory::default();
        assert_eq!(directory.add_member(&lobby("nope"), "alice"), None);
        assert_eq!(directory.remove_member(&lobby("nope"), "alice"), None);
        assert!(!directory.remove(&lobby("nope")));
        assert!(directory.members_of(&lobby("nope")).is_empty());
    }

    #[test]
    fn removal_deletes_record_and_members() {
        let mut directory = LobbyDirectory::default();
        directory.create(lobby("l1"), "Party".into());
        directory.add_member(&lobby("l1"), "alice");

        assert!(directory.remove(&lobby("l1")));
        assert!(directory.get(&lobby("l1")).is_none());
        assert!(directory.members_of(&lobby("l1")).is_empty());
        assert!(directory.list_all().is_empty());
    }

    #[test]
    fn members_are_listed_in_stable_order() {
        let mut directory = LobbyDirectory::default();
        directory.create(lobby("l1"), "Party".into());
        directory.add_member(&lobby("l1"), "carol");
        directory.add_member(&lobby("l1"), "alice");
        directory.add_member(&lobby("l1"), "bob");

        assert_eq!(directory.members_of(&lobby("l1")), vec!["alice", "bob", "carol"]);
    }
}
