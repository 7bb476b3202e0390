//! The decision contract returned to the request layer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Result of a policy evaluation.
///
/// Denials carry a machine-readable reason; all of them translate to the
/// same 403 at the HTTP boundary, the reason only feeds logs and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// The action may proceed.
    Allow,
    /// The action must be rejected.
    Deny(DenyReason),
}

/// Why an evaluation denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    /// The rule table grants this actor nothing for the action.
    NotPermitted,
    /// The actor's role claim was missing or outside the closed set.
    InvalidRole,
    /// An instance-level action was checked without a snapshot.
    MissingSnapshot,
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }

    pub fn is_denied(&self) -> bool {
        matches!(self, Self::Deny(_))
    }

    /// The deny reason, if any.
    pub fn reason(&self) -> Option<DenyReason> {
        match self {
            Self::Allow => None,
            Self::Deny(reason) => Some(*reason),
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::NotPermitted => "the actor is not permitted to perform this action",
            Self::InvalidRole => "the actor carries no recognized role",
            Self::MissingSnapshot => "no resource snapshot was supplied for an instance-level check",
        };
        write!(f, "{msg}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predicates() {
        assert!(Decision::Allow.is_allowed());
        assert!(!Decision::Allow.is_denied());
        assert!(Decision::Deny(DenyReason::NotPermitted).is_denied());
        assert_eq!(
            Decision::Deny(DenyReason::InvalidRole).reason(),
            Some(DenyReason::InvalidRole)
        );
        assert_eq!(Decision::Allow.reason(), None);
    }
}
