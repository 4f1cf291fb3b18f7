//! Reply messages for the admin command.
//!
//! Templates use positional placeholders (`{0}`, `{1}`). English ships
//! built in; other languages can be registered and fall back to English
//! per key.

use std::collections::HashMap;
use std::fmt;

use parking_lot::RwLock;

/// Language used when a requested one has no template.
pub const DEFAULT_LANGUAGE: &str = "en";

/// Message identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKey {
    /// Malformed invocation.
    InvalidArguments,
    /// Target did not resolve.
    PlayerNotFound,
    /// Unparseable container token.
    InvalidContainerType,
    /// Lock applied. `{0}` container, `{1}` player.
    LockSuccess,
    /// Lock removed. `{0}` container, `{1}` player.
    UnlockSuccess,
    /// Target is exempt. `{0}` player.
    PlayerHasBypass,
    /// Caller lacks the admin permission.
    AdminPermissionRequired,
}

impl MessageKey {
    /// Every key.
    pub const ALL: [MessageKey; 7] = [
        MessageKey::InvalidArguments,
        MessageKey::PlayerNotFound,
        MessageKey::InvalidContainerType,
        MessageKey::LockSuccess,
        MessageKey::UnlockSuccess,
        MessageKey::PlayerHasBypass,
        MessageKey::AdminPermissionRequired,
    ];

    /// Stable key name used in language files.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::InvalidArguments => "InvalidArguments",
            Self::PlayerNotFound => "PlayerNotFound",
            Self::InvalidContainerType => "InvalidContainerType",
            Self::LockSuccess => "LockSuccess",
            Self::UnlockSuccess => "UnlockSuccess",
            Self::PlayerHasBypass => "PlayerHasBypass",
            Self::AdminPermissionRequired => "AdminPermissionRequired",
        }
    }

    /// Look up a key by its name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    /// Built-in English template.
    #[must_use]
    pub const fn english(self) -> &'static str {
        match self {
            Self::InvalidArguments => {
                "Invalid arguments provided. Usage: inv.lock <PlayerId or PlayerName> <ContainerType> <True or False>"
            }
            Self::PlayerNotFound => "Player not found.",
            Self::InvalidContainerType => "Invalid container type provided.",
            Self::LockSuccess => {
                "Successfully locked <color=#ffb347>{0}</color> container for <color=#ffb347>{1}</color>."
            }
            Self::UnlockSuccess => {
                "Successfully unlocked <color=#ffb347>{0}</color> container for <color=#ffb347>{1}</color>."
            }
            Self::PlayerHasBypass => {
                "<color=#ffb347>{0}</color> has bypass permission and cannot have their inventory locked or unlocked."
            }
            Self::AdminPermissionRequired => {
                "You do not have the required admin permission to execute this command."
            }
        }
    }
}

impl fmt::Display for MessageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Substitute `{0}`, `{1}`, ... in `template`. Placeholders without an
/// argument are left as written.
#[must_use]
pub fn format_message(template: &str, args: &[&str]) -> String {
    let mut out = template.to_string();
    for (i, arg) in args.iter().enumerate() {
        out = out.replace(&format!("{{{i}}}"), arg);
    }
    out
}

/// Templates per language.
#[derive(Debug, Default)]
pub struct MessageCatalog {
    overrides: RwLock<HashMap<String, HashMap<MessageKey, String>>>,
}

impl MessageCatalog {
    /// Catalog with only the built-in English templates.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register templates for `language`, keyed by message name. Unknown
    /// names are ignored and returned.
    pub fn register(&self, language: &str, messages: &HashMap<String, String>) -> Vec<String> {
        let mut unknown = Vec::new();
        let mut overrides = self.overrides.write();
        let table = overrides.entry(language.to_string()).or_default();
        for (name, template) in messages {
            match MessageKey::from_name(name) {
                Some(key) => {
                    table.insert(key, template.clone());
                }
                None => unknown.push(name.clone()),
            }
        }
        unknown
    }

    /// Template for `key` in `language`, falling back to English.
    #[must_use]
    pub fn template(&self, key: MessageKey, language: &str) -> String {
        let overrides = self.overrides.read();
        overrides
            .get(language)
            .and_then(|t| t.get(&key))
            .or_else(|| overrides.get(DEFAULT_LANGUAGE).and_then(|t| t.get(&key)))
            .cloned()
            .unwrap_or_else(|| key.english().to_string())
    }

    /// Render `key` in `language` with positional `args`.
    #[must_use]
    pub fn render(&self, key: MessageKey, language: &str, args: &[&str]) -> String {
        format_message(&self.template(key, language), args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn english_lock_success_names_container_and_player() {
        let catalog = MessageCatalog::new();
        let msg = catalog.render(MessageKey::LockSuccess, "en", &["Belt", "Alice"]);
        assert_eq!(
            msg,
            "Successfully locked <color=#ffb347>Belt</color> container for <color=#ffb347>Alice</color>."
        );
    }

    #[test]
    fn registered_language_overrides_and_falls_back() {
        let catalog = MessageCatalog::new();
        let unknown = catalog.register(
            "de",
            &HashMap::from([
                ("PlayerNotFound".to_string(), "Spieler nicht gefunden.".to_string()),
                ("NoSuchKey".to_string(), "x".to_string()),
            ]),
        );
        assert_eq!(unknown, vec!["NoSuchKey".to_string()]);
        assert_eq!(catalog.render(MessageKey::PlayerNotFound, "de", &[]), "Spieler nicht gefunden.");
        assert_eq!(
            catalog.render(MessageKey::InvalidContainerType, "de", &[]),
            "Invalid container type provided."
        );
    }

    #[test]
    fn missing_arguments_leave_placeholders() {
        assert_eq!(format_message("{0} and {1}", &["a"]), "a and {1}");
    }

    #[test]
    fn key_names_round_trip() {
        for key in MessageKey::ALL {
            assert_eq!(MessageKey::from_name(key.name()), Some(key));
        }
    }
}
