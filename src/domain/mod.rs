//! Domain types for accounts and weather observations.
//!
//! Everything in here is free of I/O. Identifiers use the newtype pattern so
//! that account ids cannot be mixed up with weather log ids, and roles are a
//! closed enumeration so that authorization code can match exhaustively.

pub mod policy;
pub mod weather;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier for an account.
///
/// # Examples
///
/// ```rust
/// use gdash::domain::UserId;
/// use uuid::Uuid;
///
/// let raw = Uuid::from_u128(7);
/// let id = UserId::from(raw);
/// assert_eq!(id.value(), raw);
/// assert_eq!(id.to_string(), raw.to_string());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    /// Generates a fresh random id.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn value(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for UserId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl From<UserId> for Uuid {
    fn from(id: UserId) -> Self {
        id.0
    }
}

impl FromStr for UserId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// Account privilege tier.
///
/// The tiers are not numerically ordered: each one has its own asymmetric set
/// of powers, spelled out in [`policy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    #[default]
    User,
    Admin,
    AdminMaster,
}

impl Role {
    pub const ALL: [Self; 3] = [Self::User, Self::Admin, Self::AdminMaster];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
            Self::AdminMaster => "admin-master",
        }
    }

    /// Admin and admin-master both pass the administrator guards.
    #[must_use]
    pub const fn is_administrator(&self) -> bool {
        matches!(self, Self::Admin | Self::AdminMaster)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string does not name one of the three roles.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Role must be \"user\", \"admin\" or \"admin-master\", got \"{0}\"")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            "admin-master" => Ok(Self::AdminMaster),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}
