//! Configuration for the inventory lock plugin.
//!
//! The on-disk document keeps the host's established key names so existing
//! configuration files load unchanged. Container types may be written as
//! names in any case or as the numeric indices older files carry
//! (`Belt = 0`, `Clothing = 1`, `Main = 2`, `All = 3`):
//!
//! ```json
//! {
//!   "Version": "2.0.0",
//!   "Lock On Connect": ["Clothing"],
//!   "Locked Zones": [
//!     { "Zone Id": "42626527", "Container Types": ["Clothing", "Belt"] }
//!   ]
//! }
//! ```
//!
//! Documents carry a version. Loading an older document upgrades it in
//! place; anything below the last breaking release is rebuilt from defaults.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{InvLockError, Result};
use crate::types::{ContainerType, ZoneId};

// ---------------------------------------------------------------------------
// Versioning
// ---------------------------------------------------------------------------

/// A `major.minor.patch` release number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PluginVersion {
    /// Major component.
    pub major: u32,
    /// Minor component.
    pub minor: u32,
    /// Patch component.
    pub patch: u32,
}

impl PluginVersion {
    /// The release this crate implements.
    pub const CURRENT: Self = Self::new(2, 0, 0);
    /// Documents older than this are discarded and rebuilt from defaults.
    pub const LAST_BREAKING: Self = Self::new(1, 0, 0);

    /// Build a version from its components.
    #[must_use]
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse `1`, `1.2` or `1.2.3`. Missing components are zero.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let mut parts = s.trim().split('.');
        let major = parts.next()?.parse().ok()?;
        let minor = parts.next().map_or(Some(0), |p| p.parse().ok())?;
        let patch = parts.next().map_or(Some(0), |p| p.parse().ok())?;
        if parts.next().is_some() {
            return None;
        }
        Some(Self::new(major, minor, patch))
    }
}

impl fmt::Display for PluginVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// What [`LockConfig::migrate`] did to a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Migration {
    /// Already at (or beyond) the current version.
    UpToDate,
    /// Version stamp raised; settings kept.
    Upgraded {
        /// Version string found in the document.
        from: String,
    },
    /// Below the last breaking release; replaced by defaults.
    Rebuilt {
        /// Version string found in the document.
        from: String,
    },
}

impl Migration {
    /// Whether the document changed and should be written back.
    #[must_use]
    pub fn changed(&self) -> bool {
        !matches!(self, Self::UpToDate)
    }
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// Top-level plugin configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockConfig {
    /// Release that last wrote this document.
    #[serde(rename = "Version", default)]
    pub version: String,
    /// Compartments locked for every non-bypassed user on connect.
    #[serde(rename = "Lock On Connect", default)]
    pub lock_on_connect: Vec<ContainerType>,
    /// Zones whose occupants get compartments locked.
    #[serde(rename = "Locked Zones", default)]
    pub locked_zones: Vec<LockedZone>,
}

/// One zone rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedZone {
    /// Identifier assigned by the zone system.
    #[serde(rename = "Zone Id")]
    pub zone_id: ZoneId,
    /// Compartments locked while inside.
    #[serde(rename = "Container Types", default)]
    pub container_types: Vec<ContainerType>,
}

impl LockedZone {
    /// Build a zone rule.
    #[must_use]
    pub fn new(zone_id: impl Into<String>, container_types: Vec<ContainerType>) -> Self {
        Self {
            zone_id: ZoneId::new(zone_id),
            container_types,
        }
    }
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            version: PluginVersion::CURRENT.to_string(),
            lock_on_connect: vec![ContainerType::Clothing],
            locked_zones: vec![
                LockedZone::new("42626527", vec![ContainerType::Clothing, ContainerType::Belt]),
                LockedZone::new("89401263", vec![ContainerType::All]),
            ],
        }
    }
}

impl LockConfig {
    /// Load configuration from a JSON string.
    ///
    /// # Errors
    /// Returns `InvLockError::Config` if the JSON is invalid.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| InvLockError::Config(e.to_string()))
    }

    /// Load configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `InvLockError::Config` if the TOML is invalid.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).map_err(|e| InvLockError::Config(e.to_string()))
    }

    /// Load configuration from a file. `.toml` files are read as TOML,
    /// everything else as JSON.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Self::from_toml(&content),
            _ => Self::from_json(&content),
        }
    }

    /// Render as indented JSON.
    ///
    /// # Errors
    /// Returns `InvLockError::Serialization` on encoder failure.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// The parsed version stamp. Missing or malformed stamps yield `None`
    /// and count as older than any release.
    #[must_use]
    pub fn parsed_version(&self) -> Option<PluginVersion> {
        PluginVersion::parse(&self.version)
    }

    /// Bring the document up to [`PluginVersion::CURRENT`].
    #[must_use]
    pub fn migrate(self) -> (Self, Migration) {
        let found = self.parsed_version();
        if found.is_some_and(|v| v >= PluginVersion::CURRENT) {
            return (self, Migration::UpToDate);
        }

        let from = self.version.clone();
        warn!(from = %from, to = %PluginVersion::CURRENT, "Config changes detected, updating");

        if found.is_none_or(|v| v < PluginVersion::LAST_BREAKING) {
            return (Self::default(), Migration::Rebuilt { from });
        }

        let mut upgraded = self;
        upgraded.version = PluginVersion::CURRENT.to_string();
        (upgraded, Migration::Upgraded { from })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_shipped_rules() {
        let config = LockConfig::default();
        assert_eq!(config.version, "2.0.0");
        assert_eq!(config.lock_on_connect, vec![ContainerType::Clothing]);
        assert_eq!(config.locked_zones.len(), 2);
        assert_eq!(config.locked_zones[1].container_types, vec![ContainerType::All]);
    }

    #[test]
    fn parses_host_key_names() {
        let json = r#"{
            "Version": "2.0.0",
            "Lock On Connect": ["Belt", "Main"],
            "Locked Zones": [
                { "Zone Id": "arena", "Container Types": ["All"] }
            ]
        }"#;
        let config = LockConfig::from_json(json).expect("valid json");
        assert_eq!(config.lock_on_connect, vec![ContainerType::Belt, ContainerType::Main]);
        assert_eq!(config.locked_zones[0].zone_id, ZoneId::new("arena"));
    }

    #[test]
    fn missing_sections_are_empty() {
        let config = LockConfig::from_json(r#"{ "Version": "2.0.0" }"#).expect("valid json");
        assert!(config.lock_on_connect.is_empty());
        assert!(config.locked_zones.is_empty());
    }

    #[test]
    fn parses_toml_rendition() {
        let toml_str = r#"
            Version = "2.0.0"
            "Lock On Connect" = ["Clothing"]

            [["Locked Zones"]]
            "Zone Id" = "spawn"
            "Container Types" = ["Belt"]
        "#;
        let config = LockConfig::from_toml(toml_str).expect("valid toml");
        assert_eq!(config.locked_zones[0].container_types, vec![ContainerType::Belt]);
    }

    #[test]
    fn numeric_container_types_from_older_files_load() {
        let json = r#"{
            "Version": "2.0.0",
            "Lock On Connect": [1],
            "Locked Zones": [
                { "Zone Id": "42626527", "Container Types": [1, 0] },
                { "Zone Id": "89401263", "Container Types": [3] }
            ]
        }"#;
        let config = LockConfig::from_json(json).expect("numeric container types");
        assert_eq!(config.lock_on_connect, vec![ContainerType::Clothing]);
        assert_eq!(
            config.locked_zones[0].container_types,
            vec![ContainerType::Clothing, ContainerType::Belt]
        );
        assert_eq!(config.locked_zones[1].container_types, vec![ContainerType::All]);
    }

    #[test]
    fn container_types_accept_any_case_and_toml_indices() {
        let config = LockConfig::from_json(r#"{ "Lock On Connect": ["clothing", "MAIN"] }"#)
            .expect("lowercase names");
        assert_eq!(config.lock_on_connect, vec![ContainerType::Clothing, ContainerType::Main]);

        let toml_str = r#"
            "Lock On Connect" = [2, 0]
        "#;
        let config = LockConfig::from_toml(toml_str).expect("numeric toml");
        assert_eq!(config.lock_on_connect, vec![ContainerType::Main, ContainerType::Belt]);
    }

    #[test]
    fn container_types_are_written_as_names() {
        let config = LockConfig::from_json(r#"{ "Version": "2.0.0", "Lock On Connect": [0] }"#)
            .expect("numeric");
        let json = config.to_json_pretty().expect("encode");
        assert!(json.contains(r#""Belt""#));
    }

    #[test]
    fn out_of_range_container_index_is_config_error() {
        let err = LockConfig::from_json(r#"{ "Lock On Connect": [4] }"#);
        assert!(matches!(err, Err(InvLockError::Config(_))));
        let err = LockConfig::from_json(r#"{ "Lock On Connect": [-1] }"#);
        assert!(matches!(err, Err(InvLockError::Config(_))));
    }

    #[test]
    fn invalid_container_type_in_document_is_config_error() {
        let err = LockConfig::from_json(r#"{ "Lock On Connect": ["Backpack"] }"#);
        assert!(matches!(err, Err(InvLockError::Config(_))));
    }

    #[test]
    fn version_parsing_and_ordering() {
        assert_eq!(PluginVersion::parse("1.2.3"), Some(PluginVersion::new(1, 2, 3)));
        assert_eq!(PluginVersion::parse("2"), Some(PluginVersion::new(2, 0, 0)));
        assert_eq!(PluginVersion::parse("1.x"), None);
        assert_eq!(PluginVersion::parse("1.2.3.4"), None);
        assert!(PluginVersion::new(1, 10, 0) > PluginVersion::new(1, 9, 0));
    }

    #[test]
    fn current_document_is_left_alone() {
        let (config, outcome) = LockConfig::default().migrate();
        assert_eq!(outcome, Migration::UpToDate);
        assert!(!outcome.changed());
        assert_eq!(config, LockConfig::default());
    }

    #[test]
    fn old_compatible_document_keeps_settings() {
        let config = LockConfig {
            version: "1.5.0".to_string(),
            lock_on_connect: vec![ContainerType::Main],
            locked_zones: Vec::new(),
        };
        let (migrated, outcome) = config.migrate();
        assert_eq!(outcome, Migration::Upgraded { from: "1.5.0".to_string() });
        assert_eq!(migrated.version, "2.0.0");
        assert_eq!(migrated.lock_on_connect, vec![ContainerType::Main]);
    }

    #[test]
    fn pre_breaking_document_is_rebuilt() {
        let config = LockConfig {
            version: "0.9.1".to_string(),
            lock_on_connect: vec![ContainerType::Main],
            locked_zones: Vec::new(),
        };
        let (migrated, outcome) = config.migrate();
        assert!(matches!(outcome, Migration::Rebuilt { ref from } if from == "0.9.1"));
        assert_eq!(migrated, LockConfig::default());
    }

    #[test]
    fn unversioned_document_is_rebuilt() {
        let config = LockConfig::from_json(r#"{ "Lock On Connect": ["Main"] }"#).expect("valid json");
        let (migrated, outcome) = config.migrate();
        assert!(matches!(outcome, Migration::Rebuilt { .. }));
        assert_eq!(migrated.lock_on_connect, vec![ContainerType::Clothing]);
    }
}
