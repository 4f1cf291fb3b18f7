//! # invlock-core
//!
//! Game-agnostic inventory lock engine.
//!
//! A user's inventory has three compartments (belt, clothing, main). Locks
//! come from independent sources: the connect-time rule, each configured
//! zone the user occupies, and administrator overrides. The engine keeps,
//! per user, the set of `(source, compartment)` contributions and derives
//! each compartment's lock flag from it, so removing one source never
//! clears a lock another source still asserts.
//!
//! ```text
//!   host events ──▶ LockEngine ──▶ CompartmentApplier
//!                     │    ▲
//!                     ▼    │
//!               RuleStore  SessionLockRegistry
//! ```
//!
//! - `types`: identifiers, compartments, contributions, permissions
//! - `config`: versioned plugin configuration document
//! - `rules`: resolved rule set with atomic reload
//! - `registry`: per-user contribution bookkeeping
//! - `engine`: reconciliation and collaborator traits
//! - `metrics`: activity counters

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod registry;
pub mod rules;
pub mod types;

pub use config::LockConfig;
pub use engine::{CompartmentApplier, LockEngine, PermissionCheck, ReconcileReport};
pub use error::InvLockError;
pub use registry::{SessionLockRegistry, SessionLockState};
pub use rules::{RuleSet, RuleStore};
pub use types::*;
