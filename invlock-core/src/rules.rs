//! Rule Store: the configured connect-time and per-zone lock rules.
//!
//! A [`RuleSet`] is immutable once built. [`RuleStore`] publishes the current
//! set behind an `Arc`; a reload swaps the pointer, so a reader holding a
//! snapshot keeps seeing a complete old set while new readers see the new one.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{info, warn};

use crate::config::LockConfig;
use crate::types::{Compartment, ContainerType, ZoneId};

/// Expand a list of selectors (possibly containing `All`) to concrete compartments.
#[must_use]
pub fn expand(container_types: &[ContainerType]) -> BTreeSet<Compartment> {
    container_types
        .iter()
        .flat_map(|t| t.compartments().iter().copied())
        .collect()
}

/// Resolved lock rules.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    connect: BTreeSet<Compartment>,
    zones: HashMap<ZoneId, BTreeSet<Compartment>>,
}

impl RuleSet {
    /// Build directly from resolved parts.
    #[must_use]
    pub fn new(
        connect: BTreeSet<Compartment>,
        zones: HashMap<ZoneId, BTreeSet<Compartment>>,
    ) -> Self {
        Self { connect, zones }
    }

    /// Resolve a configuration document.
    ///
    /// When a zone id appears more than once the first entry wins, matching
    /// the host's first-match lookup; later duplicates are logged and ignored.
    #[must_use]
    pub fn from_config(config: &LockConfig) -> Self {
        let connect = expand(&config.lock_on_connect);
        let mut zones = HashMap::with_capacity(config.locked_zones.len());

        for zone in &config.locked_zones {
            if zones.contains_key(&zone.zone_id) {
                warn!(zone = %zone.zone_id, "Duplicate locked zone entry ignored");
                continue;
            }
            zones.insert(zone.zone_id.clone(), expand(&zone.container_types));
        }

        Self { connect, zones }
    }

    /// Compartments locked at connect time.
    #[must_use]
    pub fn connect_rule(&self) -> &BTreeSet<Compartment> {
        &self.connect
    }

    /// Compartments locked inside `zone`, if it is configured.
    #[must_use]
    pub fn zone_rule(&self, zone: &ZoneId) -> Option<&BTreeSet<Compartment>> {
        self.zones.get(zone)
    }

    /// Number of configured zones.
    #[must_use]
    pub fn zone_count(&self) -> usize {
        self.zones.len()
    }
}

/// Shared holder of the current [`RuleSet`].
#[derive(Debug, Default)]
pub struct RuleStore {
    current: RwLock<Arc<RuleSet>>,
}

impl RuleStore {
    /// Create a store publishing `rules`.
    #[must_use]
    pub fn new(rules: RuleSet) -> Self {
        Self {
            current: RwLock::new(Arc::new(rules)),
        }
    }

    /// Create a store from a configuration document.
    #[must_use]
    pub fn load(config: &LockConfig) -> Self {
        let store = Self::default();
        store.reload(config);
        store
    }

    /// Replace the published rules with those resolved from `config`.
    pub fn reload(&self, config: &LockConfig) {
        let rules = RuleSet::from_config(config);
        info!(
            connect = rules.connect.len(),
            zones = rules.zone_count(),
            "Lock rules loaded"
        );
        self.publish(rules);
    }

    /// Atomically swap in a new rule set.
    pub fn publish(&self, rules: RuleSet) {
        *self.current.write() = Arc::new(rules);
    }

    /// Snapshot of the current rules. Stays valid across reloads.
    #[must_use]
    pub fn snapshot(&self) -> Arc<RuleSet> {
        Arc::clone(&self.current.read())
    }

    /// Compartments locked at connect time.
    #[must_use]
    pub fn connect_rule(&self) -> BTreeSet<Compartment> {
        self.current.read().connect.clone()
    }

    /// Compartments locked inside `zone`, if it is configured.
    #[must_use]
    pub fn zone_rule(&self, zone: &ZoneId) -> Option<BTreeSet<Compartment>> {
        self.current.read().zones.get(zone).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LockedZone;

    fn config() -> LockConfig {
        LockConfig {
            version: "2.0.0".to_string(),
            lock_on_connect: vec![ContainerType::Clothing, ContainerType::Clothing],
            locked_zones: vec![
                LockedZone::new("a", vec![ContainerType::All]),
                LockedZone::new("b", vec![ContainerType::Belt]),
                LockedZone::new("a", vec![ContainerType::Main]),
            ],
        }
    }

    #[test]
    fn all_is_expanded_at_load() {
        let rules = RuleSet::from_config(&config());
        let a = rules.zone_rule(&ZoneId::new("a")).expect("zone a");
        assert_eq!(a.iter().copied().collect::<Vec<_>>(), Compartment::ALL.to_vec());
    }

    #[test]
    fn duplicate_zone_keeps_first_entry() {
        let rules = RuleSet::from_config(&config());
        assert_eq!(rules.zone_count(), 2);
        assert_eq!(rules.zone_rule(&ZoneId::new("a")).map(BTreeSet::len), Some(3));
    }

    #[test]
    fn connect_rule_is_a_set() {
        let rules = RuleSet::from_config(&config());
        assert_eq!(rules.connect_rule().len(), 1);
    }

    #[test]
    fn unknown_zone_has_no_rule() {
        let store = RuleStore::load(&config());
        assert!(store.zone_rule(&ZoneId::new("nowhere")).is_none());
    }

    #[test]
    fn reload_swaps_without_disturbing_snapshots() {
        let store = RuleStore::load(&config());
        let before = store.snapshot();

        store.reload(&LockConfig {
            version: "2.0.0".to_string(),
            lock_on_connect: Vec::new(),
            locked_zones: Vec::new(),
        });

        assert!(store.connect_rule().is_empty());
        assert!(store.zone_rule(&ZoneId::new("b")).is_none());
        assert_eq!(before.zone_count(), 2);
        assert!(before.zone_rule(&ZoneId::new("b")).is_some());
    }
}
