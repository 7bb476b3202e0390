//! Field narrowing for submission updates.
//!
//! An allowed update is not all-or-nothing: the owner reworking a
//! submission may only touch its content, while review fields (status,
//! feedback) belong to staff. The engine hands the caller the scope it
//! may apply; the caller drops anything outside it.

use crate::domain::{Actor, Role, Submission};

use super::decision::Decision;
use super::engine::PolicyEngine;
use super::snapshot::Snapshot;

/// The set of submission fields an actor may change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionUpdateScope {
    /// Content fields only: title, description, file. The owner's rework
    /// window.
    Content,
    /// Content plus review fields (status, feedback).
    Full,
}

impl SubmissionUpdateScope {
    pub fn includes_review_fields(&self) -> bool {
        matches!(self, Self::Full)
    }
}

impl PolicyEngine {
    /// The update scope for an actor on a submission, `None` when the
    /// update itself is denied.
    pub fn submission_update_scope(
        &self,
        actor: &Actor,
        submission: &Submission,
    ) -> Option<SubmissionUpdateScope> {
        match self.can_update(actor, Snapshot::Submission(submission)) {
            Decision::Deny(_) => None,
            Decision::Allow => {
                if actor.is_admin() {
                    Some(SubmissionUpdateScope::Full)
                } else {
                    Some(SubmissionUpdateScope::Content)
                }
            }
        }
    }

    /// Whether the actor may move a submission through its review
    /// lifecycle. Status is staff territory regardless of ownership.
    pub fn can_change_status(&self, actor: &Actor) -> Decision {
        use super::decision::DenyReason;
        match actor.role {
            Some(Role::Admin) | Some(Role::Mentor) => Decision::Allow,
            Some(_) => Decision::Deny(DenyReason::NotPermitted),
            None => Decision::Deny(DenyReason::InvalidRole),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
