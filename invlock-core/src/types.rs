//! Core type definitions for the inventory lock engine.
//!
//! `ContainerType` is what configuration and commands speak; `Compartment`
//! is what runtime state stores. `ContainerType::All` only exists on the
//! parsing side and is expanded through [`ContainerType::compartments`].

use serde::de::{self, Unexpected, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::InvLockError;

// ---------------------------------------------------------------------------
// Identity Types
// ---------------------------------------------------------------------------

/// Stable identifier of a connected user (the host's numeric account id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

/// Opaque zone identifier defined by the external zone system.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoneId(pub String);

impl ZoneId {
    /// Create a zone id from anything string-like.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ZoneId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// Compartments
// ---------------------------------------------------------------------------

/// One addressable partition of a user's inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Compartment {
    /// Hotbar.
    Belt,
    /// Worn items.
    Clothing,
    /// Main backpack grid.
    Main,
}

impl Compartment {
    /// Every concrete compartment, in a fixed order.
    pub const ALL: [Compartment; 3] = [Compartment::Belt, Compartment::Clothing, Compartment::Main];

    /// Dense index used by [`CompartmentFlags`].
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Belt => 0,
            Self::Clothing => 1,
            Self::Main => 2,
        }
    }

    /// Display name, matching the configuration spelling.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Belt => "Belt",
            Self::Clothing => "Clothing",
            Self::Main => "Main",
        }
    }
}

impl fmt::Display for Compartment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Compartment selector as written in configuration and on the command line.
///
/// Serializes as its name. Deserializes from a name in any case or from the
/// numeric index `0..=3` that older configuration files store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ContainerType {
    /// Hotbar.
    Belt,
    /// Worn items.
    Clothing,
    /// Main backpack grid.
    Main,
    /// Shorthand for all three compartments.
    All,
}

impl ContainerType {
    /// Expand to the concrete compartments this selector names.
    #[must_use]
    pub fn compartments(self) -> &'static [Compartment] {
        match self {
            Self::Belt => &[Compartment::Belt],
            Self::Clothing => &[Compartment::Clothing],
            Self::Main => &[Compartment::Main],
            Self::All => &Compartment::ALL,
        }
    }

    /// Display name, matching the configuration spelling.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Belt => "Belt",
            Self::Clothing => "Clothing",
            Self::Main => "Main",
            Self::All => "All",
        }
    }

    /// Selector for a stored numeric index.
    #[must_use]
    pub const fn from_index(index: u64) -> Option<Self> {
        match index {
            0 => Some(Self::Belt),
            1 => Some(Self::Clothing),
            2 => Some(Self::Main),
            3 => Some(Self::All),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for ContainerType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ContainerTypeVisitor;

        impl<'de> Visitor<'de> for ContainerTypeVisitor {
            type Value = ContainerType;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a container type name or an index from 0 to 3")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                ContainerType::from_index(v)
                    .ok_or_else(|| E::invalid_value(Unexpected::Unsigned(v), &self))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                u64::try_from(v)
                    .ok()
                    .and_then(ContainerType::from_index)
                    .ok_or_else(|| E::invalid_value(Unexpected::Signed(v), &self))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                v.parse()
                    .map_err(|_| E::invalid_value(Unexpected::Str(v), &self))
            }
        }

        deserializer.deserialize_any(ContainerTypeVisitor)
    }
}

impl fmt::Display for ContainerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<Compartment> for ContainerType {
    fn from(c: Compartment) -> Self {
        match c {
            Compartment::Belt => Self::Belt,
            Compartment::Clothing => Self::Clothing,
            Compartment::Main => Self::Main,
        }
    }
}

impl FromStr for ContainerType {
    type Err = InvLockError;

    /// Case-insensitive parse of `Belt`, `Clothing`, `Main` or `All`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        [Self::Belt, Self::Clothing, Self::Main, Self::All]
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(token))
            .ok_or_else(|| InvLockError::InvalidContainerType(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Contributions
// ---------------------------------------------------------------------------

/// Origin of a lock assertion.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LockSource {
    /// The connect-time rule.
    Connect,
    /// A configured zone the user currently occupies.
    Zone(ZoneId),
    /// An administrator's explicit lock.
    ManualOverride,
}

impl fmt::Display for LockSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect => f.write_str("connect"),
            Self::Zone(zone) => write!(f, "zone:{zone}"),
            Self::ManualOverride => f.write_str("manual"),
        }
    }
}

/// One source asserting that one compartment should be locked.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LockContribution {
    /// Who asserts the lock.
    pub source: LockSource,
    /// Which compartment.
    pub compartment: Compartment,
}

impl LockContribution {
    /// Pair a source with a compartment.
    #[must_use]
    pub fn new(source: LockSource, compartment: Compartment) -> Self {
        Self {
            source,
            compartment,
        }
    }
}

/// One boolean per compartment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CompartmentFlags([bool; 3]);

impl CompartmentFlags {
    /// All compartments unlocked.
    pub const UNLOCKED: Self = Self([false; 3]);

    /// Flag for one compartment.
    #[must_use]
    pub const fn get(&self, compartment: Compartment) -> bool {
        self.0[compartment.index()]
    }

    /// Set the flag for one compartment.
    pub fn set(&mut self, compartment: Compartment, value: bool) {
        self.0[compartment.index()] = value;
    }

    /// Compartments whose flag is set.
    pub fn iter_set(&self) -> impl Iterator<Item = Compartment> + '_ {
        Compartment::ALL.into_iter().filter(|c| self.get(*c))
    }

    /// Whether any compartment is set.
    #[must_use]
    pub fn any(&self) -> bool {
        self.0.iter().any(|v| *v)
    }
}

/// Named permissions exposed to the host's permission system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
    /// Required to run the admin command.
    Admin,
    /// Exempts a user from all automatic and manual locking.
    Bypass,
}

impl Permission {
    /// Both permissions, for registration.
    pub const ALL: [Permission; 2] = [Permission::Admin, Permission::Bypass];

    /// The name registered with the host.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Admin => "inventorylock.admin",
            Self::Bypass => "inventorylock.bypass",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
