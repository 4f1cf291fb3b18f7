//! Host events consumed by the lock engine.

use invlock_core::types::{UserId, ZoneId};
use invlock_core::{CompartmentApplier, LockEngine, PermissionCheck, ReconcileReport};

/// A session or zone event delivered by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    /// Player finished connecting.
    Connected {
        user: UserId,
    },

    /// Player left the server.
    Disconnected {
        user: UserId,
    },

    /// Zone system reports the player inside a zone.
    EnteredZone {
        zone: ZoneId,
        user: UserId,
    },

    /// Zone system reports the player outside a zone.
    ExitedZone {
        zone: ZoneId,
        user: UserId,
    },
}

impl HostEvent {
    /// The player the event concerns.
    #[must_use]
    pub fn user(&self) -> UserId {
        match self {
            Self::Connected { user }
            | Self::Disconnected { user }
            | Self::EnteredZone { user, .. }
            | Self::ExitedZone { user, .. } => *user,
        }
    }

    /// Short label for logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connected { .. } => "connected",
            Self::Disconnected { .. } => "disconnected",
            Self::EnteredZone { .. } => "entered_zone",
            Self::ExitedZone { .. } => "exited_zone",
        }
    }
}

/// Route one event to the matching engine operation.
pub fn dispatch<A, P>(engine: &LockEngine<A, P>, event: &HostEvent) -> ReconcileReport
where
    A: CompartmentApplier,
    P: PermissionCheck,
{
    match event {
        HostEvent::Connected { user } => engine.on_connect(*user),
        HostEvent::Disconnected { user } => engine.on_disconnect(*user),
        HostEvent::EnteredZone { zone, user } => engine.on_zone_enter(*user, zone),
        HostEvent::ExitedZone { zone, user } => engine.on_zone_exit(*user, zone),
    }
}
