//! The `inv.lock` admin command.
//!
//! ```text
//! inv.lock <PlayerId or PlayerName> <ContainerType> <True or False>
//! ```
//!
//! Checks run in a fixed order and stop at the first failure:
//! admin permission, argument count, target lookup, target bypass,
//! container type, lock flag. Every failure maps to a reply message; none
//! reach the engine.

use invlock_core::types::{ContainerType, Permission, UserId};
use invlock_core::{CompartmentApplier, InvLockError, LockEngine, PermissionCheck, ReconcileReport};
use thiserror::Error;
use tracing::{debug, info};

use crate::lang::{MessageCatalog, MessageKey};
use crate::players::{PlayerDirectory, PlayerRecord};

/// Console name of the command.
pub const COMMAND_NAME: &str = "inv.lock";

/// Rejections surfaced to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// Caller lacks `inventorylock.admin`.
    #[error("caller lacks the admin permission")]
    AdminPermissionRequired,
    /// Wrong argument count or unparseable lock flag.
    #[error("invalid arguments")]
    InvalidArguments,
    /// Target does not resolve to a connected player.
    #[error("player not found")]
    PlayerNotFound,
    /// Target holds `inventorylock.bypass`.
    #[error("{0} holds the bypass permission")]
    PlayerHasBypass(String),
    /// Container token is not Belt, Clothing, Main or All.
    #[error("invalid container type")]
    InvalidContainerType,
}

impl CommandError {
    /// Reply message for this rejection.
    #[must_use]
    pub fn message_key(&self) -> MessageKey {
        match self {
            Self::AdminPermissionRequired => MessageKey::AdminPermissionRequired,
            Self::InvalidArguments => MessageKey::InvalidArguments,
            Self::PlayerNotFound => MessageKey::PlayerNotFound,
            Self::PlayerHasBypass(_) => MessageKey::PlayerHasBypass,
            Self::InvalidContainerType => MessageKey::InvalidContainerType,
        }
    }

    /// Map an engine failure for `target_name` onto a reply. Bypass is the
    /// only failure `manual_set` reports; the remaining variants come from
    /// configuration and I/O paths.
    fn from_engine(err: InvLockError, target_name: &str) -> Self {
        match err {
            InvLockError::TargetHasBypass(_) => Self::PlayerHasBypass(target_name.to_string()),
            InvLockError::InvalidContainerType(_) => Self::InvalidContainerType,
            InvLockError::Config(_) | InvLockError::Serialization(_) | InvLockError::Io(_) => {
                Self::InvalidArguments
            }
        }
    }

    fn message_args(&self) -> Vec<&str> {
        match self {
            Self::PlayerHasBypass(name) => vec![name.as_str()],
            _ => Vec::new(),
        }
    }
}

/// A successful `inv.lock` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    /// Who was targeted.
    pub target: PlayerRecord,
    /// Selector as given.
    pub container: ContainerType,
    /// Lock or unlock.
    pub locked: bool,
    /// What the engine wrote.
    pub report: ReconcileReport,
}

impl CommandOutcome {
    /// Confirmation message for this outcome.
    #[must_use]
    pub fn message_key(&self) -> MessageKey {
        if self.locked {
            MessageKey::LockSuccess
        } else {
            MessageKey::UnlockSuccess
        }
    }
}

/// Parse the lock flag. Accepts `true`/`false` in any case and `1`/`0`.
#[must_use]
pub fn parse_lock_flag(token: &str) -> Option<bool> {
    let token = token.trim();
    if token.eq_ignore_ascii_case("true") || token == "1" {
        Some(true)
    } else if token.eq_ignore_ascii_case("false") || token == "0" {
        Some(false)
    } else {
        None
    }
}

/// Run `inv.lock` on behalf of `caller`.
///
/// # Errors
/// Returns the first failed check as a [`CommandError`].
pub fn execute<A, P>(
    engine: &LockEngine<A, P>,
    players: &PlayerDirectory,
    caller: UserId,
    args: &[&str],
) -> Result<CommandOutcome, CommandError>
where
    A: CompartmentApplier,
    P: PermissionCheck,
{
    if !engine.permissions().has_permission(caller, Permission::Admin) {
        debug!(caller = %caller, "inv.lock refused: not an admin");
        return Err(CommandError::AdminPermissionRequired);
    }

    let [target_arg, container_arg, flag_arg] = args else {
        return Err(CommandError::InvalidArguments);
    };

    let target = players
        .resolve(target_arg)
        .ok_or(CommandError::PlayerNotFound)?;

    if engine.permissions().has_bypass(target.id) {
        return Err(CommandError::PlayerHasBypass(target.display_name));
    }

    let container: ContainerType = container_arg
        .parse()
        .map_err(|_| CommandError::InvalidContainerType)?;

    let locked = parse_lock_flag(flag_arg).ok_or(CommandError::InvalidArguments)?;

    let report = engine
        .manual_set(target.id, container, locked)
        .map_err(|e| CommandError::from_engine(e, &target.display_name))?;

    info!(
        caller = %caller,
        target = %target.id,
        container = %container,
        locked,
        "inv.lock applied"
    );

    Ok(CommandOutcome {
        target,
        container,
        locked,
        report,
    })
}

/// Render the reply the caller sees for a command result.
#[must_use]
pub fn render_reply(
    catalog: &MessageCatalog,
    language: &str,
    result: &Result<CommandOutcome, CommandError>,
) -> String {
    match result {
        Ok(outcome) => catalog.render(
            outcome.message_key(),
            language,
            &[outcome.container.name(), outcome.target.display_name.as_str()],
        ),
        Err(err) => catalog.render(err.message_key(), language, &err.message_args()),
    }
}
