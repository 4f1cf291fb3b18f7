//! Lock Reconciliation Engine.
//!
//! Every operation mutates the user's contribution set and then reconciles:
//! the desired flag for each compartment is "some contribution names it",
//! the applier is called only for compartments whose desired flag differs
//! from the applied one, and at most one refresh is requested per
//! operation.
//!
//! Event operations (`on_connect`, `on_zone_enter`, ...) are total: unknown
//! zones and users without a record are no-ops. Only [`LockEngine::manual_set`]
//! can fail, and only when the target holds bypass.

use std::sync::Arc;

use tracing::{debug, debug_span, info, info_span};

use crate::error::{InvLockError, Result};
use crate::metrics::{spans, LockCounters};
use crate::registry::{SessionLockRegistry, SessionLockState};
use crate::rules::RuleStore;
use crate::types::{
    Compartment, CompartmentFlags, ContainerType, LockContribution, LockSource, Permission,
    UserId, ZoneId,
};

// ---------------------------------------------------------------------------
// Collaborator seams
// ---------------------------------------------------------------------------

/// Writes compartment lock flags to the live inventory.
pub trait CompartmentApplier: Send + Sync {
    /// Set the lock flag on one compartment of `user`'s inventory.
    fn set_locked(&self, user: UserId, compartment: Compartment, locked: bool);

    /// Push the updated inventory state to `user`'s client.
    fn request_refresh(&self, user: UserId);
}

impl<T: CompartmentApplier + ?Sized> CompartmentApplier for Arc<T> {
    fn set_locked(&self, user: UserId, compartment: Compartment, locked: bool) {
        (**self).set_locked(user, compartment, locked);
    }

    fn request_refresh(&self, user: UserId) {
        (**self).request_refresh(user);
    }
}

/// Answers permission queries from the host's permission store.
pub trait PermissionCheck: Send + Sync {
    /// Whether `user` currently holds `permission`.
    fn has_permission(&self, user: UserId, permission: Permission) -> bool;

    /// Whether `user` is exempt from locking.
    fn has_bypass(&self, user: UserId) -> bool {
        self.has_permission(user, Permission::Bypass)
    }
}

impl<T: PermissionCheck + ?Sized> PermissionCheck for Arc<T> {
    fn has_permission(&self, user: UserId, permission: Permission) -> bool {
        (**self).has_permission(user, permission)
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// What one reconciliation pass wrote to the live inventory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    /// The user reconciled.
    pub user: UserId,
    /// Compartments written, with the flag they were set to.
    pub changes: Vec<(Compartment, bool)>,
    /// Whether a refresh was requested.
    pub refreshed: bool,
}

impl ReconcileReport {
    /// A pass that touched nothing.
    #[must_use]
    pub fn unchanged(user: UserId) -> Self {
        Self {
            user,
            changes: Vec::new(),
            refreshed: false,
        }
    }

    /// Whether nothing was written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// The reconciliation engine. Rule store and registry are shared handles so
/// the event adapter and the command handler can hold the same ones.
pub struct LockEngine<A, P> {
    rules: Arc<RuleStore>,
    registry: Arc<SessionLockRegistry>,
    applier: A,
    permissions: P,
    counters: Arc<LockCounters>,
}

impl<A, P> std::fmt::Debug for LockEngine<A, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockEngine")
            .field("sessions", &self.registry.len())
            .field("counters", &self.counters.snapshot())
            .finish_non_exhaustive()
    }
}

impl<A: CompartmentApplier, P: PermissionCheck> LockEngine<A, P> {
    /// Wire an engine to its collaborators.
    #[must_use]
    pub fn new(
        rules: Arc<RuleStore>,
        registry: Arc<SessionLockRegistry>,
        applier: A,
        permissions: P,
    ) -> Self {
        Self {
            rules,
            registry,
            applier,
            permissions,
            counters: Arc::new(LockCounters::new()),
        }
    }

    /// Shared rule store.
    #[must_use]
    pub fn rules(&self) -> &Arc<RuleStore> {
        &self.rules
    }

    /// Shared session registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<SessionLockRegistry> {
        &self.registry
    }

    /// The applier.
    #[must_use]
    pub fn applier(&self) -> &A {
        &self.applier
    }

    /// The permission source.
    #[must_use]
    pub fn permissions(&self) -> &P {
        &self.permissions
    }

    /// Engine counters.
    #[must_use]
    pub fn counters(&self) -> &Arc<LockCounters> {
        &self.counters
    }

    // -- events -------------------------------------------------------------

    /// User joined the session. Adds a `Connect` contribution per
    /// connect-rule compartment.
    pub fn on_connect(&self, user: UserId) -> ReconcileReport {
        if self.permissions.has_bypass(user) {
            return self.skip_bypassed(user);
        }

        let connect = self.rules.connect_rule();
        self.with_session(user, |state| {
            let added = connect
                .into_iter()
                .filter(|c| state.add(LockContribution::new(LockSource::Connect, *c)))
                .count();
            LockCounters::add(&self.counters.contributions_added, added as u64);
            debug!(user = %user, added, "Connect rule applied");
            self.reconcile(state)
        })
    }

    /// User left. Every compartment is unlocked and the record destroyed,
    /// regardless of bypass.
    pub fn on_disconnect(&self, user: UserId) -> ReconcileReport {
        self.release(user)
            .unwrap_or_else(|| ReconcileReport::unchanged(user))
    }

    /// User entered `zone`. Unconfigured zones are ignored.
    pub fn on_zone_enter(&self, user: UserId, zone: &ZoneId) -> ReconcileReport {
        if self.permissions.has_bypass(user) {
            return self.skip_bypassed(user);
        }

        let Some(compartments) = self.rules.zone_rule(zone) else {
            LockCounters::bump(&self.counters.unknown_zone_events);
            return ReconcileReport::unchanged(user);
        };

        let source = LockSource::Zone(zone.clone());
        self.with_session(user, |state| {
            let added = compartments
                .into_iter()
                .filter(|c| state.add(LockContribution::new(source.clone(), *c)))
                .count();
            LockCounters::add(&self.counters.contributions_added, added as u64);
            debug!(user = %user, zone = %zone, added, "Entered locked zone");
            self.reconcile(state)
        })
    }

    /// User left `zone`. Removes only that zone's contributions.
    ///
    /// Removal does not consult the current rules, so contributions from a
    /// zone dropped by a config reload are still released on exit.
    pub fn on_zone_exit(&self, user: UserId, zone: &ZoneId) -> ReconcileReport {
        let Some(handle) = self.registry.find(user) else {
            return ReconcileReport::unchanged(user);
        };

        let mut state = handle.lock();
        let removed = state.remove_source(&LockSource::Zone(zone.clone()));
        if removed == 0 {
            if self.rules.zone_rule(zone).is_none() {
                LockCounters::bump(&self.counters.unknown_zone_events);
            }
            return ReconcileReport::unchanged(user);
        }
        LockCounters::add(&self.counters.contributions_removed, removed as u64);
        debug!(user = %user, zone = %zone, removed, "Exited locked zone");
        self.reconcile(&mut state)
    }

    /// Administrative override.
    ///
    /// Locking adds a `ManualOverride` contribution per compartment. Unlocking
    /// removes every contribution of every source for those compartments.
    ///
    /// # Errors
    /// Returns [`InvLockError::TargetHasBypass`] if `user` holds bypass; no
    /// state changes in that case.
    pub fn manual_set(
        &self,
        user: UserId,
        target: ContainerType,
        locked: bool,
    ) -> Result<ReconcileReport> {
        if self.permissions.has_bypass(user) {
            return Err(InvLockError::TargetHasBypass(user));
        }

        let report = self.with_session(user, |state| {
            for &compartment in target.compartments() {
                if locked {
                    if state.add(LockContribution::new(LockSource::ManualOverride, compartment)) {
                        LockCounters::bump(&self.counters.contributions_added);
                    }
                } else {
                    let removed = state.remove_compartment(compartment);
                    LockCounters::add(&self.counters.contributions_removed, removed as u64);
                }
            }
            self.reconcile(state)
        });
        LockCounters::bump(&self.counters.manual_overrides);
        info!(user = %user, target = %target, locked, "Manual lock override");
        Ok(report)
    }

    /// Force every tracked session to unlocked and drop all records. Returns
    /// the number of sessions released.
    pub fn shutdown(&self) -> usize {
        let _span = info_span!(spans::SHUTDOWN).entered();
        let released = self
            .registry
            .users()
            .into_iter()
            .filter_map(|user| self.release(user))
            .count();
        info!(released, "All inventory locks released");
        released
    }

    // -- inspection ---------------------------------------------------------

    /// Whether `user` has a session record.
    #[must_use]
    pub fn is_tracked(&self, user: UserId) -> bool {
        self.registry.contains(user)
    }

    /// Lock flags currently applied for `user`.
    #[must_use]
    pub fn locked_compartments(&self, user: UserId) -> CompartmentFlags {
        self.registry
            .find(user)
            .map_or(CompartmentFlags::UNLOCKED, |s| s.lock().applied())
    }

    /// Active contributions for `user`.
    #[must_use]
    pub fn contributions(&self, user: UserId) -> Vec<LockContribution> {
        self.registry
            .find(user)
            .map(|s| s.lock().contributions().iter().cloned().collect())
            .unwrap_or_default()
    }

    // -- internals ----------------------------------------------------------

    fn with_session<R>(&self, user: UserId, f: impl FnOnce(&mut SessionLockState) -> R) -> R {
        if !self.registry.contains(user) {
            LockCounters::bump(&self.counters.sessions_opened);
        }
        self.registry.with_open(user, f)
    }

    fn release(&self, user: UserId) -> Option<ReconcileReport> {
        let report = self.registry.remove_with(user, |state| {
            let removed = state.clear();
            LockCounters::add(&self.counters.contributions_removed, removed as u64);
            debug!(user = %user, removed, "Session closed");
            self.reconcile(state)
        })?;
        LockCounters::bump(&self.counters.sessions_closed);
        Some(report)
    }

    /// A bypassed user gains nothing; contributions left over from before
    /// the permission was granted are dropped.
    fn skip_bypassed(&self, user: UserId) -> ReconcileReport {
        LockCounters::bump(&self.counters.bypass_skips);
        let Some(handle) = self.registry.find(user) else {
            return ReconcileReport::unchanged(user);
        };

        let mut state = handle.lock();
        let removed = state.clear();
        if removed > 0 {
            LockCounters::add(&self.counters.contributions_removed, removed as u64);
            debug!(user = %user, removed, "Dropped contributions of bypassed user");
        }
        self.reconcile(&mut state)
    }

    fn reconcile(&self, state: &mut SessionLockState) -> ReconcileReport {
        let user = state.user();
        let _span = debug_span!(spans::RECONCILE, user = %user).entered();

        let changes = state.pending_changes();
        if changes.is_empty() {
            return ReconcileReport::unchanged(user);
        }

        for &(compartment, locked) in &changes {
            self.applier.set_locked(user, compartment, locked);
            state.mark_applied(compartment, locked);
        }
        LockCounters::add(&self.counters.flag_writes, changes.len() as u64);

        self.applier.request_refresh(user);
        LockCounters::bump(&self.counters.refreshes);

        debug!(user = %user, changes = ?changes, "Reconciled inventory locks");
        ReconcileReport {
            user,
            changes,
            refreshed: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LockConfig, LockedZone};
    use parking_lot::Mutex;
    use std::collections::HashSet;

    #[derive(Default)]
    struct Recorder {
        writes: Mutex<Vec<(UserId, Compartment, bool)>>,
        refreshes: Mutex<Vec<UserId>>,
    }

    impl CompartmentApplier for Recorder {
        fn set_locked(&self, user: UserId, compartment: Compartment, locked: bool) {
            self.writes.lock().push((user, compartment, locked));
        }

        fn request_refresh(&self, user: UserId) {
            self.refreshes.lock().push(user);
        }
    }

    #[derive(Default)]
    struct Bypass(Mutex<HashSet<UserId>>);

    impl PermissionCheck for Bypass {
        fn has_permission(&self, user: UserId, permission: Permission) -> bool {
            permission == Permission::Bypass && self.0.lock().contains(&user)
        }
    }

    fn engine(config: &LockConfig) -> LockEngine<Arc<Recorder>, Arc<Bypass>> {
        LockEngine::new(
            Arc::new(RuleStore::load(config)),
            Arc::new(SessionLockRegistry::new()),
            Arc::new(Recorder::default()),
            Arc::new(Bypass::default()),
        )
    }

    fn config() -> LockConfig {
        LockConfig {
            version: "2.0.0".to_string(),
            lock_on_connect: vec![ContainerType::Clothing],
            locked_zones: vec![LockedZone::new("z", vec![ContainerType::Clothing, ContainerType::Belt])],
        }
    }

    const U: UserId = UserId(76_561_198_000_000_001);

    #[test]
    fn connect_locks_connect_rule() {
        let e = engine(&config());
        let report = e.on_connect(U);
        assert_eq!(report.changes, vec![(Compartment::Clothing, true)]);
        assert!(report.refreshed);
        assert!(e.locked_compartments(U).get(Compartment::Clothing));
    }

    #[test]
    fn one_refresh_per_operation() {
        let e = engine(&config());
        e.on_zone_enter(U, &ZoneId::new("z"));
        assert_eq!(e.applier().writes.lock().len(), 2);
        assert_eq!(e.applier().refreshes.lock().len(), 1);
    }

    #[test]
    fn unchanged_state_makes_no_applier_calls() {
        let e = engine(&config());
        e.on_connect(U);
        let report = e.on_connect(U);
        assert!(report.is_empty());
        assert!(!report.refreshed);
        assert_eq!(e.applier().refreshes.lock().len(), 1);
    }

    #[test]
    fn zone_exit_for_untracked_user_is_noop() {
        let e = engine(&config());
        let report = e.on_zone_exit(U, &ZoneId::new("z"));
        assert!(report.is_empty());
        assert!(!e.is_tracked(U));
    }

    #[test]
    fn unknown_zone_enter_creates_no_record() {
        let e = engine(&config());
        e.on_zone_enter(U, &ZoneId::new("elsewhere"));
        assert!(!e.is_tracked(U));
        assert_eq!(e.counters().snapshot().unknown_zone_events, 1);
    }

    #[test]
    fn zone_removed_by_reload_still_releases_on_exit() {
        let e = engine(&config());
        e.on_zone_enter(U, &ZoneId::new("z"));
        e.rules().reload(&LockConfig {
            version: "2.0.0".to_string(),
            lock_on_connect: Vec::new(),
            locked_zones: Vec::new(),
        });
        e.on_zone_exit(U, &ZoneId::new("z"));
        assert!(!e.locked_compartments(U).any());
    }

    #[test]
    fn granting_bypass_drops_stale_locks_on_next_event() {
        let e = engine(&config());
        e.on_connect(U);
        e.permissions().0.lock().insert(U);

        e.on_zone_enter(U, &ZoneId::new("z"));
        assert!(e.contributions(U).is_empty());
        assert!(!e.locked_compartments(U).any());
    }

    #[test]
    fn manual_lock_all_then_partial_unlock() {
        let e = engine(&config());
        e.manual_set(U, ContainerType::All, true).expect("not bypassed");
        assert_eq!(e.locked_compartments(U).iter_set().count(), 3);

        let report = e.manual_set(U, ContainerType::Main, false).expect("not bypassed");
        assert_eq!(report.changes, vec![(Compartment::Main, false)]);
        assert_eq!(e.counters().snapshot().manual_overrides, 2);
    }

    #[test]
    fn handle_held_across_disconnect_is_not_written_through() {
        let e = engine(&config());
        e.on_connect(U);
        let stale = e.registry().find(U).expect("tracked");

        e.on_disconnect(U);
        assert!(stale.lock().is_closed());

        e.on_zone_enter(U, &ZoneId::new("z"));
        assert!(stale.lock().contributions().is_empty());
        assert!(e.is_tracked(U));
        assert!(e.locked_compartments(U).get(Compartment::Belt));

        assert_eq!(e.shutdown(), 1);
        let writes = e.applier().writes.lock();
        let last_belt = writes.iter().rev().find(|w| w.0 == U && w.1 == Compartment::Belt);
        assert_eq!(last_belt.map(|w| w.2), Some(false));
    }

    #[test]
    fn shutdown_releases_every_session() {
        let e = engine(&config());
        e.on_connect(UserId(1));
        e.on_connect(UserId(2));
        e.on_zone_enter(UserId(3), &ZoneId::new("z"));

        assert_eq!(e.shutdown(), 3);
        assert!(e.registry().is_empty());
        let writes = e.applier().writes.lock();
        for user in [UserId(1), UserId(2), UserId(3)] {
            assert!(writes.iter().any(|w| w.0 == user && !w.2));
        }
    }
}
