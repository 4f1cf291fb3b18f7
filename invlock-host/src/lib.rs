//! # invlock-host: host integration for the inventory lock engine
//!
//! Glue between a game server's plugin callbacks and `invlock-core`.
//!
//! ```text
//!  session / zone callbacks ──▶ hooks ──▶ HostEvent ──┐
//!  console "inv.lock ..."   ──▶ command ─────────────┤
//!                                                     ▼
//!                                          InventoryLockPlugin
//!                                                     │
//!                                   invlock-core::LockEngine
//!                                                     │
//!                                       InventoryStore (applier)
//! ```
//!
//! ## Modules
//!
//! - `hooks`: host callback shims producing events
//! - `events`: event type and dispatch to the engine
//! - `command`: the `inv.lock` admin command
//! - `lang`: reply message catalog
//! - `permissions`: in-process permission store
//! - `players`: connected-player directory and target resolution
//! - `inventory`: reference live-inventory applier
//! - `config`: configuration file load/migrate/save
//! - `plugin`: top-level wiring and lifecycle
//! - `logging`: tracing subscriber setup

pub mod command;
pub mod config;
pub mod events;
pub mod hooks;
pub mod inventory;
pub mod lang;
pub mod logging;
pub mod permissions;
pub mod players;
pub mod plugin;

pub use command::CommandError;
pub use events::HostEvent;
pub use inventory::InventoryStore;
pub use permissions::PermissionStore;
pub use players::PlayerDirectory;
pub use plugin::InventoryLockPlugin;
