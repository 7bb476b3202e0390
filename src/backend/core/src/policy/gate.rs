//! Ownership and state gating shared by the project and report rules.
//!
//! The update and delete rows for both submission kinds use the same
//! compound predicate. It lives here once so the two rows cannot drift.

use crate::domain::{Actor, Submission, SubmissionStatus, UserId};

/// Whether the actor may rework a submission as its owner.
///
/// True exactly when the actor owns the submission and it still sits in
/// the `Submitted` state. Once review moves it out of `Submitted`, only
/// the roles named in the rule table may touch it.
pub fn can_owner_mutate(actor: &Actor, submission: &Submission) -> bool {
    owner_gate(actor.id, Some(submission.owner_id), Some(submission.status))
}

/// The same gate over raw snapshot fields. Missing owner or status fails
/// the gate.
pub(crate) fn owner_gate(
    actor_id: UserId,
    owner: Option<UserId>,
    status: Option<SubmissionStatus>,
) -> bool {
    owner == Some(actor_id) && status == Some(SubmissionStatus::Submitted)
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Role, SubmissionKind};
    use chrono::Utc;

    fn submission(owner: i64, status: SubmissionStatus) -> Submission {
        Submission {
            id: 1,
            kind: SubmissionKind::Report,
            title: "weekly report".to_string(),
            description: None,
            file_url: "uploads/report.pdf".to_string(),
            file_type: "pdf".to_string(),
            owner_id: UserId(owner),
            status,
            feedback: None,
            submitted_at: Utc::now(),
        }
    }

    #[test]
    fn test_owner_in_submitted_state_may_mutate() {
        let actor = Actor::new(3, Role::Participant);
        assert!(can_owner_mutate(&actor, &submission(3, SubmissionStatus::Submitted)));
    }

    #[test]
    fn test_gate_closes_once_out_of_submitted() {
        let actor = Actor::new(3, Role::Participant);
        for status in [
            SubmissionStatus::InReview,
            SubmissionStatus::Approved,
            SubmissionStatus::Rejected,
        ] {
            assert!(!can_owner_mutate(&actor, &submission(3, status)));
        }
    }

    #[test]
    fn test_non_owner_never_passes() {
        let actor = Actor::new(4, Role::Participant);
        assert!(!can_owner_mutate(&actor, &submission(3, SubmissionStatus::Submitted)));
    }

    #[test]
    fn test_gate_fails_closed_on_missing_fields() {
        assert!(!owner_gate(UserId(1), None, Some(SubmissionStatus::Submitted)));
        assert!(!owner_gate(UserId(1), Some(UserId(1)), None));
    }
}
