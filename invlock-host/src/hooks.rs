//! Host callback shims.
//!
//! Each function mirrors the signature the host (or its zone plugin)
//! invokes, argument order included, and produces a [`HostEvent`].

use invlock_core::types::{UserId, ZoneId};

use crate::events::HostEvent;

/// Player finished connecting.
#[must_use]
pub fn on_player_connected(user: UserId) -> HostEvent {
    HostEvent::Connected { user }
}

/// Player left the server.
#[must_use]
pub fn on_player_disconnected(user: UserId) -> HostEvent {
    HostEvent::Disconnected { user }
}

/// Zone plugin callback: player entered `zone_id`.
#[must_use]
pub fn on_enter_zone(zone_id: &str, user: UserId) -> HostEvent {
    HostEvent::EnteredZone {
        zone: ZoneId::new(zone_id),
        user,
    }
}

/// Zone plugin callback: player left `zone_id`.
#[must_use]
pub fn on_exit_zone(zone_id: &str, user: UserId) -> HostEvent {
    HostEvent::ExitedZone {
        zone: ZoneId::new(zone_id),
        user,
    }
}
