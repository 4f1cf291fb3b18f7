//! Reference live-inventory model.
//!
//! Stands in for the game's item containers: each player has a wear, belt
//! and main container carrying an `IsLocked` flag, and a counter of
//! snapshots pushed to the client. Implements
//! [`CompartmentApplier`] so the engine can drive it directly.

use std::collections::HashMap;

use invlock_core::types::{Compartment, CompartmentFlags, UserId};
use invlock_core::CompartmentApplier;
use parking_lot::Mutex;
use tracing::trace;

/// One player's containers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlayerInventory {
    /// `IsLocked` flag per container.
    pub locked: CompartmentFlags,
    /// Snapshots sent to the client.
    pub snapshots_sent: u32,
}

/// Inventories of every player the engine has touched.
#[derive(Debug, Default)]
pub struct InventoryStore {
    players: Mutex<HashMap<UserId, PlayerInventory>>,
}

impl InventoryStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state of `user`'s containers.
    #[must_use]
    pub fn inventory(&self, user: UserId) -> PlayerInventory {
        self.players.lock().get(&user).copied().unwrap_or_default()
    }

    /// Whether `compartment` is locked for `user`.
    #[must_use]
    pub fn is_locked(&self, user: UserId, compartment: Compartment) -> bool {
        self.inventory(user).locked.get(compartment)
    }
}

impl CompartmentApplier for InventoryStore {
    fn set_locked(&self, user: UserId, compartment: Compartment, locked: bool) {
        let mut players = self.players.lock();
        let inventory = players.entry(user).or_default();
        if inventory.locked.get(compartment) != locked {
            inventory.locked.set(compartment, locked);
        }
        trace!(user = %user, compartment = %compartment, locked, "Container flag set");
    }

    fn request_refresh(&self, user: UserId) {
        self.players.lock().entry(user).or_default().snapshots_sent += 1;
        trace!(user = %user, "Inventory snapshot sent");
    }
}
