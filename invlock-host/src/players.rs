//! Directory of connected players, used to resolve command targets.

use std::collections::HashMap;

use invlock_core::types::UserId;
use parking_lot::RwLock;

/// A connected player as the command handler sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerRecord {
    /// Account id.
    pub id: UserId,
    /// Name shown in replies.
    pub display_name: String,
}

/// Connected players keyed by id.
#[derive(Debug, Default)]
pub struct PlayerDirectory {
    online: RwLock<HashMap<UserId, PlayerRecord>>,
}

impl PlayerDirectory {
    /// Empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a player online.
    pub fn insert(&self, id: UserId, display_name: impl Into<String>) {
        self.online.write().insert(
            id,
            PlayerRecord {
                id,
                display_name: display_name.into(),
            },
        );
    }

    /// Mark a player offline.
    pub fn remove(&self, id: UserId) -> Option<PlayerRecord> {
        self.online.write().remove(&id)
    }

    /// Look up by id.
    #[must_use]
    pub fn get(&self, id: UserId) -> Option<PlayerRecord> {
        self.online.read().get(&id).cloned()
    }

    /// Ids of every online player.
    #[must_use]
    pub fn online_ids(&self) -> Vec<UserId> {
        self.online.read().keys().copied().collect()
    }

    /// Resolve a command argument to a player.
    ///
    /// Tried in order: numeric id, exact display name (case-insensitive),
    /// then a display-name substring that matches exactly one player.
    #[must_use]
    pub fn resolve(&self, token: &str) -> Option<PlayerRecord> {
        let token = token.trim();
        if token.is_empty() {
            return None;
        }
        let online = self.online.read();

        if let Some(found) = token.parse::<UserId>().ok().and_then(|id| online.get(&id)) {
            return Some(found.clone());
        }

        if let Some(found) = online
            .values()
            .find(|p| p.display_name.eq_ignore_ascii_case(token))
        {
            return Some(found.clone());
        }

        let needle = token.to_lowercase();
        let mut partial = online
            .values()
            .filter(|p| p.display_name.to_lowercase().contains(&needle));
        match (partial.next(), partial.next()) {
            (Some(only), None) => Some(only.clone()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directory() -> PlayerDirectory {
        let d = PlayerDirectory::new();
        d.insert(UserId(76_561_198_000_000_001), "Alice");
        d.insert(UserId(76_561_198_000_000_002), "Alicia");
        d.insert(UserId(76_561_198_000_000_003), "Bob");
        d
    }

    #[test]
    fn resolves_by_id() {
        let d = directory();
        let p = d.resolve("76561198000000003").expect("bob by id");
        assert_eq!(p.display_name, "Bob");
    }

    #[test]
    fn exact_name_beats_partial() {
        let d = directory();
        assert_eq!(d.resolve("alice").map(|p| p.id), Some(UserId(76_561_198_000_000_001)));
    }

    #[test]
    fn unique_partial_name_resolves() {
        let d = directory();
        assert_eq!(d.resolve("ob").map(|p| p.display_name), Some("Bob".to_string()));
    }

    #[test]
    fn ambiguous_or_unknown_does_not_resolve() {
        let d = directory();
        assert!(d.resolve("ali").is_none());
        assert!(d.resolve("carol").is_none());
        assert!(d.resolve("").is_none());
        assert!(d.resolve("12345").is_none());
    }

    #[test]
    fn removed_player_no_longer_resolves() {
        let d = directory();
        d.remove(UserId(76_561_198_000_000_003));
        assert!(d.resolve("Bob").is_none());
    }
}
