//! Platform roles.
//!
//! Mentora ships with three fixed roles:
//!
//! | Role        | Description                                              |
//! |-------------|----------------------------------------------------------|
//! | Participant | Submits reports, consumes tests and resources            |
//! | Mentor      | Reviews submissions, manages questions                   |
//! | Admin       | Full access to all entities and user administration      |
//!
//! The set is closed. Role values arrive as strings (JWT claims, database
//! columns) and are parsed into this enum exactly once; a string outside
//! the set is an [`UnknownRole`] and every authorization check treats the
//! bearer as having no role at all.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// A recognized platform role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Participant,
    Mentor,
    Admin,
}

/// Raised when a role string is outside the closed set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl Role {
    /// Canonical wire/storage form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Participant => "Participant",
            Self::Mentor => "Mentor",
            Self::Admin => "Admin",
        }
    }

    /// Parse a role string, returning `None` for anything outside the set.
    ///
    /// This is the fail-closed entry point used at the system boundary;
    /// callers that want the offending value for logging use the
    /// [`FromStr`] impl instead.
    pub fn parse(s: &str) -> Option<Self> {
        s.parse().ok()
    }

    /// All recognized roles.
    pub fn all() -> [Role; 3] {
        [Self::Participant, Self::Mentor, Self::Admin]
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Participant" => Ok(Self::Participant),
            "Mentor" => Ok(Self::Mentor),
            "Admin" => Ok(Self::Admin),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
