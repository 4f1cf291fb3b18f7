//! Session Lock Registry: per-user record of active lock contributions.
//!
//! Each connected user owns one [`SessionLockState`]: the set of
//! `(source, compartment)` contributions currently asserting a lock, and the
//! lock flags last written to the live inventory. A compartment is wanted
//! locked while any contribution names it.
//!
//! The registry map is a `DashMap` so different users never contend; each
//! entry sits behind its own `parking_lot::Mutex`, which serializes events
//! for the same user when the host dispatches from several threads.
//!
//! Removing a record closes its state under that mutex before the map entry
//! goes away. A caller that cloned the handle earlier finds it closed and
//! must not add to it; [`SessionLockRegistry::with_open`] retries against
//! the live record.

use std::collections::BTreeSet;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;

use crate::types::{Compartment, CompartmentFlags, LockContribution, LockSource, UserId};

/// Lock bookkeeping for one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionLockState {
    user: UserId,
    contributions: BTreeSet<LockContribution>,
    applied: CompartmentFlags,
    closed: bool,
}

impl SessionLockState {
    /// Fresh state: no contributions, everything unlocked.
    #[must_use]
    pub fn new(user: UserId) -> Self {
        Self {
            user,
            contributions: BTreeSet::new(),
            applied: CompartmentFlags::UNLOCKED,
            closed: false,
        }
    }

    /// Owner of this state.
    #[must_use]
    pub fn user(&self) -> UserId {
        self.user
    }

    /// Active contributions.
    #[must_use]
    pub fn contributions(&self) -> &BTreeSet<LockContribution> {
        &self.contributions
    }

    /// Lock flags as last written to the live inventory.
    #[must_use]
    pub fn applied(&self) -> CompartmentFlags {
        self.applied
    }

    /// Lock flags implied by the current contributions.
    #[must_use]
    pub fn desired(&self) -> CompartmentFlags {
        let mut flags = CompartmentFlags::UNLOCKED;
        for contribution in &self.contributions {
            flags.set(contribution.compartment, true);
        }
        flags
    }

    /// Whether the record has been removed from the registry.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Mark the record as detached from the registry.
    pub fn close(&mut self) {
        self.closed = true;
    }

    /// Whether applied flags agree with contributions.
    #[must_use]
    pub fn is_coherent(&self) -> bool {
        self.applied == self.desired()
    }

    /// Insert a contribution. Returns `false` if it was already present.
    pub fn add(&mut self, contribution: LockContribution) -> bool {
        self.contributions.insert(contribution)
    }

    /// Remove one contribution. Returns `false` if it was absent.
    pub fn remove(&mut self, contribution: &LockContribution) -> bool {
        self.contributions.remove(contribution)
    }

    /// Remove every contribution from `source`.
    pub fn remove_source(&mut self, source: &LockSource) -> usize {
        let before = self.contributions.len();
        self.contributions.retain(|c| &c.source != source);
        before - self.contributions.len()
    }

    /// Remove every contribution, of any source, naming `compartment`.
    pub fn remove_compartment(&mut self, compartment: Compartment) -> usize {
        let before = self.contributions.len();
        self.contributions.retain(|c| c.compartment != compartment);
        before - self.contributions.len()
    }

    /// Remove all contributions.
    pub fn clear(&mut self) -> usize {
        let removed = self.contributions.len();
        self.contributions.clear();
        removed
    }

    /// Compartments whose desired flag differs from the applied one, paired
    /// with the flag they should move to.
    #[must_use]
    pub fn pending_changes(&self) -> Vec<(Compartment, bool)> {
        let desired = self.desired();
        Compartment::ALL
            .into_iter()
            .filter(|c| desired.get(*c) != self.applied.get(*c))
            .map(|c| (c, desired.get(c)))
            .collect()
    }

    /// Record that `compartment` now has `locked` on the live inventory.
    pub fn mark_applied(&mut self, compartment: Compartment, locked: bool) {
        self.applied.set(compartment, locked);
    }
}

/// Shared handle to one user's state.
pub type SessionHandle = Arc<Mutex<SessionLockState>>;

/// Concurrent map of per-user lock state.
#[derive(Debug, Default)]
pub struct SessionLockRegistry {
    sessions: DashMap<UserId, SessionHandle>,
}

impl SessionLockRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for `user`, creating empty state on first access.
    ///
    /// The map shard lock is released before returning; callers lock the
    /// handle itself.
    #[must_use]
    pub fn get(&self, user: UserId) -> SessionHandle {
        let entry = self
            .sessions
            .entry(user)
            .or_insert_with(|| Arc::new(Mutex::new(SessionLockState::new(user))));
        Arc::clone(entry.value())
    }

    /// Handle for `user` if a record exists.
    #[must_use]
    pub fn find(&self, user: UserId) -> Option<SessionHandle> {
        self.sessions.get(&user).map(|e| Arc::clone(e.value()))
    }

    /// Whether `user` has a record.
    #[must_use]
    pub fn contains(&self, user: UserId) -> bool {
        self.sessions.contains_key(&user)
    }

    /// Run `f` on the live record for `user`, creating it if needed.
    ///
    /// A handle closed between lookup and locking belongs to a removed
    /// record, so the lookup is repeated.
    pub fn with_open<R>(&self, user: UserId, f: impl FnOnce(&mut SessionLockState) -> R) -> R {
        loop {
            let handle = self.get(user);
            let mut state = handle.lock();
            if !state.is_closed() {
                return f(&mut state);
            }
        }
    }

    /// Close the record for `user`, run `f` on its final state and detach
    /// it. Returns `None` if `user` has no record.
    ///
    /// The record stays in the map until `f` returns, so a concurrent
    /// [`with_open`](Self::with_open) for the same user waits and then
    /// starts a fresh record after the final writes.
    pub fn remove_with<R>(&self, user: UserId, f: impl FnOnce(&mut SessionLockState) -> R) -> Option<R> {
        loop {
            let handle = self.find(user)?;
            let mut state = handle.lock();
            if state.is_closed() {
                continue;
            }
            state.close();
            let result = f(&mut state);
            self.sessions.remove_if(&user, |_, live| Arc::ptr_eq(live, &handle));
            return Some(result);
        }
    }

    /// Close and detach the record for `user`. Returns `false` if there was
    /// none.
    pub fn remove(&self, user: UserId) -> bool {
        self.remove_with(user, |_| ()).is_some()
    }

    /// Users with a record.
    #[must_use]
    pub fn users(&self) -> Vec<UserId> {
        self.sessions.iter().map(|e| *e.key()).collect()
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no user has a record.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Add a contribution for `user`.
    pub fn add_contribution(&self, user: UserId, contribution: LockContribution) -> bool {
        self.with_open(user, |state| state.add(contribution))
    }

    /// Remove a contribution for `user`. No record means nothing to remove.
    pub fn remove_contribution(&self, user: UserId, contribution: &LockContribution) -> bool {
        self.find(user).is_some_and(|s| s.lock().remove(contribution))
    }

    /// Remove all contributions from `source` for `user`.
    pub fn remove_all_from_source(&self, user: UserId, source: &LockSource) -> usize {
        self.find(user).map_or(0, |s| s.lock().remove_source(source))
    }

    /// Remove all contributions for `user`, keeping the record.
    pub fn remove_all_for_user(&self, user: UserId) -> usize {
        self.find(user).map_or(0, |s| s.lock().clear())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ZoneId;

    fn zone(id: &str, c: Compartment) -> LockContribution {
        LockContribution::new(LockSource::Zone(ZoneId::new(id)), c)
    }

    #[test]
    fn desired_is_union_of_contributions() {
        let mut state = SessionLockState::new(UserId(1));
        state.add(zone("a", Compartment::Belt));
        state.add(LockContribution::new(LockSource::Connect, Compartment::Belt));
        state.add(zone("b", Compartment::Main));

        let desired = state.desired();
        assert!(desired.get(Compartment::Belt));
        assert!(desired.get(Compartment::Main));
        assert!(!desired.get(Compartment::Clothing));
    }

    #[test]
    fn add_has_set_semantics() {
        let mut state = SessionLockState::new(UserId(1));
        assert!(state.add(zone("a", Compartment::Belt)));
        assert!(!state.add(zone("a", Compartment::Belt)));
        assert_eq!(state.contributions().len(), 1);
    }

    #[test]
    fn remove_source_leaves_other_sources() {
        let mut state = SessionLockState::new(UserId(1));
        state.add(zone("a", Compartment::Belt));
        state.add(zone("a", Compartment::Main));
        state.add(zone("b", Compartment::Belt));
        state.add(LockContribution::new(LockSource::Connect, Compartment::Belt));

        assert_eq!(state.remove_source(&LockSource::Zone(ZoneId::new("a"))), 2);
        assert_eq!(state.contributions().len(), 2);
        assert!(state.desired().get(Compartment::Belt));
        assert!(!state.desired().get(Compartment::Main));
    }

    #[test]
    fn remove_compartment_spans_sources() {
        let mut state = SessionLockState::new(UserId(1));
        state.add(zone("a", Compartment::Clothing));
        state.add(LockContribution::new(LockSource::Connect, Compartment::Clothing));
        state.add(LockContribution::new(LockSource::ManualOverride, Compartment::Main));

        assert_eq!(state.remove_compartment(Compartment::Clothing), 2);
        assert_eq!(state.contributions().len(), 1);
    }

    #[test]
    fn pending_changes_diff_against_applied() {
        let mut state = SessionLockState::new(UserId(1));
        state.add(zone("a", Compartment::Main));
        state.mark_applied(Compartment::Belt, true);

        let changes = state.pending_changes();
        assert_eq!(changes, vec![(Compartment::Belt, false), (Compartment::Main, true)]);
        assert!(!state.is_coherent());

        for (c, locked) in changes {
            state.mark_applied(c, locked);
        }
        assert!(state.is_coherent());
        assert!(state.pending_changes().is_empty());
    }

    #[test]
    fn registry_creates_lazily_and_removes() {
        let registry = SessionLockRegistry::new();
        assert!(registry.find(UserId(7)).is_none());
        assert!(!registry.remove_contribution(UserId(7), &zone("a", Compartment::Belt)));
        assert_eq!(registry.remove_all_for_user(UserId(7)), 0);
        assert!(registry.is_empty());

        assert!(registry.add_contribution(UserId(7), zone("a", Compartment::Belt)));
        assert!(registry.contains(UserId(7)));
        assert_eq!(registry.remove_all_from_source(UserId(7), &LockSource::Connect), 0);
        assert_eq!(registry.remove_all_for_user(UserId(7)), 1);
        assert!(registry.contains(UserId(7)));

        assert!(registry.remove(UserId(7)));
        assert!(!registry.remove(UserId(7)));
        assert!(registry.is_empty());
    }

    #[test]
    fn removed_record_is_closed_and_not_reused() {
        let registry = SessionLockRegistry::new();
        let stale = registry.get(UserId(9));
        assert!(registry.remove(UserId(9)));
        assert!(stale.lock().is_closed());

        assert!(registry.add_contribution(UserId(9), zone("a", Compartment::Main)));
        assert!(stale.lock().contributions().is_empty());

        let live = registry.find(UserId(9)).expect("recreated");
        assert!(!Arc::ptr_eq(&stale, &live));
        assert_eq!(live.lock().contributions().len(), 1);
    }

    #[test]
    fn get_returns_the_same_record() {
        let registry = SessionLockRegistry::new();
        let a = registry.get(UserId(3));
        let b = registry.get(UserId(3));
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.users(), vec![UserId(3)]);
    }
}
