//! Plugin state. Wires configuration, permissions, players and the engine together.
//!
//! One [`InventoryLockPlugin`] is constructed per process and handed to the
//! host's callback layer. Nothing is global: the rule store and session
//! registry live inside the engine and are shared by handle.

use std::path::PathBuf;
use std::sync::Arc;

use invlock_core::config::LockConfig;
use invlock_core::error::Result;
use invlock_core::types::UserId;
use invlock_core::{CompartmentApplier, LockEngine, ReconcileReport, RuleStore, SessionLockRegistry};
use tracing::{debug, info};

use crate::command::{self, COMMAND_NAME};
use crate::config::ConfigFile;
use crate::events::{self, HostEvent};
use crate::lang::MessageCatalog;
use crate::permissions::PermissionStore;
use crate::players::PlayerDirectory;

/// The running plugin.
pub struct InventoryLockPlugin<A> {
    engine: LockEngine<A, Arc<PermissionStore>>,
    players: Arc<PlayerDirectory>,
    messages: MessageCatalog,
    config_path: Option<PathBuf>,
}

impl<A> std::fmt::Debug for InventoryLockPlugin<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InventoryLockPlugin")
            .field("engine", &self.engine)
            .field("config_path", &self.config_path)
            .finish_non_exhaustive()
    }
}

impl<A: CompartmentApplier> InventoryLockPlugin<A> {
    /// Build from an in-memory configuration and register permissions.
    #[must_use]
    pub fn new(
        config: &LockConfig,
        applier: A,
        permissions: Arc<PermissionStore>,
        players: Arc<PlayerDirectory>,
    ) -> Self {
        permissions.register_all();
        let engine = LockEngine::new(
            Arc::new(RuleStore::load(config)),
            Arc::new(SessionLockRegistry::new()),
            applier,
            permissions,
        );
        info!(version = %config.version, "Inventory lock plugin initialised");
        Self {
            engine,
            players,
            messages: MessageCatalog::new(),
            config_path: None,
        }
    }

    /// Build from a configuration file, creating or migrating it as needed.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed, or written back.
    pub fn from_config_file(
        path: impl Into<PathBuf>,
        applier: A,
        permissions: Arc<PermissionStore>,
        players: Arc<PlayerDirectory>,
    ) -> Result<Self> {
        let file = ConfigFile::load_or_create(path)?;
        let mut plugin = Self::new(file.config(), applier, permissions, players);
        plugin.config_path = Some(file.path().to_path_buf());
        Ok(plugin)
    }

    /// The engine.
    #[must_use]
    pub fn engine(&self) -> &LockEngine<A, Arc<PermissionStore>> {
        &self.engine
    }

    /// Connected players.
    #[must_use]
    pub fn players(&self) -> &Arc<PlayerDirectory> {
        &self.players
    }

    /// Reply message catalog.
    #[must_use]
    pub fn messages(&self) -> &MessageCatalog {
        &self.messages
    }

    /// Route a host event to the engine.
    ///
    /// Zone entries for players not in the directory are dropped, so a late
    /// zone callback after disconnect cannot start a new lock record.
    pub fn handle(&self, event: &HostEvent) -> ReconcileReport {
        debug!(kind = event.kind(), user = %event.user(), "Host event");
        if let HostEvent::EnteredZone { user, zone } = event {
            if self.players.get(*user).is_none() {
                debug!(user = %user, zone = %zone, "Zone entry for disconnected player ignored");
                return ReconcileReport::unchanged(*user);
            }
        }
        events::dispatch(&self.engine, event)
    }

    /// Player joined: record them for command lookup and apply connect rules.
    pub fn player_connected(&self, user: UserId, display_name: impl Into<String>) -> ReconcileReport {
        self.players.insert(user, display_name);
        self.handle(&HostEvent::Connected { user })
    }

    /// Player left: release every lock and forget them.
    pub fn player_disconnected(&self, user: UserId) -> ReconcileReport {
        let report = self.handle(&HostEvent::Disconnected { user });
        self.players.remove(user);
        report
    }

    /// Run `inv.lock` with pre-split arguments and return the reply text.
    #[must_use]
    pub fn run_command(&self, caller: UserId, language: &str, args: &[&str]) -> String {
        let result = command::execute(&self.engine, &self.players, caller, args);
        command::render_reply(&self.messages, language, &result)
    }

    /// Run a raw console line. Returns `None` when the line is not an
    /// `inv.lock` invocation.
    #[must_use]
    pub fn run_console_line(&self, caller: UserId, language: &str, line: &str) -> Option<String> {
        let mut tokens = line.split_whitespace();
        if !tokens.next()?.eq_ignore_ascii_case(COMMAND_NAME) {
            return None;
        }
        let args: Vec<&str> = tokens.collect();
        Some(self.run_command(caller, language, &args))
    }

    /// Publish rules from a new configuration. Existing contributions stay
    /// until their source releases them.
    pub fn reload_config(&self, config: &LockConfig) {
        self.engine.rules().reload(config);
    }

    /// Re-read the configuration file this plugin was built from. A plugin
    /// built from memory has nothing to re-read and returns `Ok(false)`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed, or written back.
    pub fn reload_from_disk(&self) -> Result<bool> {
        let Some(path) = &self.config_path else {
            return Ok(false);
        };
        let file = ConfigFile::load_or_create(path.clone())?;
        self.reload_config(file.config());
        Ok(true)
    }

    /// Release every lock and clear all session state. Returns the number
    /// of sessions released.
    pub fn unload(&self) -> usize {
        let released = self.engine.shutdown();
        info!(released, "Inventory lock plugin unloaded");
        released
    }
}
