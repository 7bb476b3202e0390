//! Policy evaluation.
//!
//! The engine answers "may this actor perform this action on this
//! resource?" by interpreting the declarative table in [`super::rules`].
//! Evaluation is pure and side-effect free; counter increments and status
//! changes happen in the calling layer strictly after an `Allow`.

use thiserror::Error;
use tracing::debug;

use crate::domain::Actor;

use super::action::{Action, ResourceKind};
use super::decision::{Decision, DenyReason};
use super::gate::owner_gate;
use super::rules::{grant_for, Grant};
use super::snapshot::Snapshot;

/// Errors from the enforcement shorthand.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("permission denied: {0}")]
    PermissionDenied(DenyReason),
}

/// The stateless policy engine.
///
/// Carrying a value rather than free functions keeps the call sites
/// uniform with the rest of the service plumbing and leaves room for
/// per-deployment rule overrides later without touching every handler.
#[derive(Debug, Clone, Copy, Default)]
pub struct PolicyEngine;

impl PolicyEngine {
    pub fn new() -> Self {
        Self
    }

    /// Evaluate an action against a resource class, with the entity
    /// snapshot when the action targets an instance.
    ///
    /// Fail-closed behavior, in order:
    /// 1. an actor without a recognized role is denied everything;
    /// 2. an instance-level action without a snapshot is denied.
    ///
    /// Identical inputs always produce identical decisions.
    pub fn decide(
        &self,
        actor: &Actor,
        action: Action,
        kind: ResourceKind,
        snapshot: Option<Snapshot<'_>>,
    ) -> Decision {
        if actor.role.is_none() {
            debug!(actor_id = %actor.id, %action, resource = %kind, "deny: unrecognized role");
            return Decision::Deny(DenyReason::InvalidRole);
        }
        if action.requires_snapshot() && snapshot.is_none() {
            debug!(actor_id = %actor.id, %action, resource = %kind, "deny: missing snapshot");
            return Decision::Deny(DenyReason::MissingSnapshot);
        }

        let decision = self.apply(grant_for(kind, action), actor, kind, snapshot);
        debug!(
            actor_id = %actor.id,
            role = ?actor.role,
            %action,
            resource = %kind,
            ?decision,
            "policy evaluated"
        );
        decision
    }

    fn apply(
        &self,
        grant: Grant,
        actor: &Actor,
        kind: ResourceKind,
        snapshot: Option<Snapshot<'_>>,
    ) -> Decision {
        // Role presence was checked in `decide`; re-check here so `apply`
        // stays safe under recursion and future call sites.
        let Some(role) = actor.role else {
            return Decision::Deny(DenyReason::InvalidRole);
        };

        match grant {
            Grant::AnyRole => Decision::Allow,
            Grant::Roles(roles) => {
                if roles.contains(&role) {
                    Decision::Allow
                } else {
                    Decision::Deny(DenyReason::NotPermitted)
                }
            }
            Grant::RolesOrOwner(roles) => {
                if roles.contains(&role) {
                    return Decision::Allow;
                }
                match snapshot.and_then(|s| s.owner_id()) {
                    Some(owner) if owner == actor.id => Decision::Allow,
                    _ => Decision::Deny(DenyReason::NotPermitted),
                }
            }
            Grant::RolesOrGatedOwner(roles) => {
                if roles.contains(&role) {
                    return Decision::Allow;
                }
                let Some(snap) = snapshot else {
                    return Decision::Deny(DenyReason::MissingSnapshot);
                };
                if owner_gate(actor.id, snap.owner_id(), snap.submission_status()) {
                    Decision::Allow
                } else {
                    Decision::Deny(DenyReason::NotPermitted)
                }
            }
            Grant::SameAsView => self.apply(grant_for(kind, Action::View), actor, kind, snapshot),
            Grant::Never => Decision::Deny(DenyReason::NotPermitted),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Convenience verbs
    // ─────────────────────────────────────────────────────────────────────────

    /// Class-level listing check.
    pub fn can_view_any(&self, actor: &Actor, kind: ResourceKind) -> Decision {
        self.decide(actor, Action::ViewAny, kind, None)
    }

    /// Class-level creation check.
    pub fn can_create(&self, actor: &Actor, kind: ResourceKind) -> Decision {
        self.decide(actor, Action::Create, kind, None)
    }

    pub fn can_view(&self, actor: &Actor, snapshot: Snapshot<'_>) -> Decision {
        self.decide(actor, Action::View, snapshot.kind(), Some(snapshot))
    }

    pub fn can_update(&self, actor: &Actor, snapshot: Snapshot<'_>) -> Decision {
        self.decide(actor, Action::Update, snapshot.kind(), Some(snapshot))
    }

    pub fn can_delete(&self, actor: &Actor, snapshot: Snapshot<'_>) -> Decision {
        self.decide(actor, Action::Delete, snapshot.kind(), Some(snapshot))
    }

    pub fn can_download(&self, actor: &Actor, snapshot: Snapshot<'_>) -> Decision {
        self.decide(actor, Action::Download, snapshot.kind(), Some(snapshot))
    }

    /// Shorthand: `Ok(())` on allow, `Err(PolicyError)` on deny.
    pub fn enforce(
        &self,
        actor: &Actor,
        action: Action,
        kind: ResourceKind,
        snapshot: Option<Snapshot<'_>>,
    ) -> Result<(), PolicyError> {
        match self.decide(actor, action, kind, snapshot) {
            Decision::Allow => Ok(()),
            Decision::Deny(reason) => Err(PolicyError::PermissionDenied(reason)),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        Question, QuestionKind, ResourceDoc, Role, Submission, SubmissionKind, SubmissionStatus,
        Test, TestKind, TestResult, UserAccount, UserId,
    };
    use chrono::Utc;

    fn engine() -> PolicyEngine {
        PolicyEngine::new()
    }

    fn submission(kind: SubmissionKind, owner: i64, status: SubmissionStatus) -> Submission {
        Submission {
            id: 10,
            kind,
            title: "entry".to_string(),
            description: None,
            file_url: "uploads/entry.pdf".to_string(),
            file_type: "pdf".to_string(),
            owner_id: UserId(owner),
            status,
            feedback: None,
            submitted_at: Utc::now(),
        }
    }

    fn resource(uploader: i64) -> ResourceDoc {
        ResourceDoc {
            id: 5,
            title: "handbook".to_string(),
            description: None,
            file_url: "uploads/handbook.pdf".to_string(),
            file_type: "pdf".to_string(),
            uploaded_by: UserId(uploader),
            is_published: true,
            download_count: 0,
        }
    }

    fn test_paper() -> Test {
        Test {
            id: 8,
            title: "rust basics".to_string(),
            description: None,
            kind: TestKind::Qcm,
            file_url: None,
            file_type: None,
            created_by: UserId(1),
        }
    }

    fn question() -> Question {
        Question {
            id: 2,
            test_id: 8,
            text: "what does ownership mean?".to_string(),
            kind: QuestionKind::Open,
            options: None,
            correct_answer: None,
            file_url: None,
            file_type: None,
        }
    }

    fn result_for(user: i64) -> TestResult {
        TestResult {
            id: 3,
            user_id: UserId(user),
            test_id: 8,
            score: Some(17.5),
            file_path: None,
            file_type: None,
            completed_at: Some(Utc::now()),
        }
    }

    fn account(id: i64, role: Role) -> UserAccount {
        UserAccount {
            id: UserId(id),
            first_name: "Ada".to_string(),
            last_name: "L".to_string(),
            email: "ada@example.org".to_string(),
            role,
            verified: true,
        }
    }

    #[test]
    fn test_unknown_role_denied_everywhere() {
        let actor = Actor::without_role(1);
        let sub = submission(SubmissionKind::Report, 1, SubmissionStatus::Submitted);
        for kind in ResourceKind::all() {
            for action in Action::all() {
                let snapshot = action.requires_snapshot().then_some(Snapshot::Submission(&sub));
                assert_eq!(
                    engine().decide(&actor, action, kind, snapshot),
                    Decision::Deny(DenyReason::InvalidRole),
                    "{kind}/{action} should deny a role-less actor"
                );
            }
        }
    }

    #[test]
    fn test_missing_snapshot_fails_closed() {
        let admin = Actor::new(1, Role::Admin);
        assert_eq!(
            engine().decide(&admin, Action::Update, ResourceKind::Project, None),
            Decision::Deny(DenyReason::MissingSnapshot)
        );
        // Class-level actions do not need one.
        assert_eq!(
            engine().decide(&admin, Action::Create, ResourceKind::Project, None),
            Decision::Allow
        );
    }

    #[test]
    fn test_decide_is_idempotent() {
        let mentor = Actor::new(2, Role::Mentor);
        let sub = submission(SubmissionKind::Project, 9, SubmissionStatus::InReview);
        let first = engine().can_view(&mentor, Snapshot::Submission(&sub));
        let second = engine().can_view(&mentor, Snapshot::Submission(&sub));
        assert_eq!(first, second);
        assert_eq!(first, Decision::Allow);
    }

    #[test]
    fn test_project_view_restricted_to_staff_and_owner() {
        let sub = submission(SubmissionKind::Project, 9, SubmissionStatus::Submitted);
        let snap = Snapshot::Submission(&sub);

        assert!(engine().can_view(&Actor::new(1, Role::Admin), snap).is_allowed());
        assert!(engine().can_view(&Actor::new(2, Role::Mentor), snap).is_allowed());
        assert!(engine().can_view(&Actor::new(9, Role::Participant), snap).is_allowed());
        assert!(engine().can_view(&Actor::new(8, Role::Participant), snap).is_denied());
    }

    #[test]
    fn test_report_view_open_to_every_role() {
        let sub = submission(SubmissionKind::Report, 9, SubmissionStatus::Submitted);
        let snap = Snapshot::Submission(&sub);

        // Unlike projects, an unrelated participant may read a report.
        assert!(engine().can_view(&Actor::new(8, Role::Participant), snap).is_allowed());
    }

    #[test]
    fn test_creation_asymmetry_between_project_and_report() {
        let admin = Actor::new(1, Role::Admin);
        let participant = Actor::new(5, Role::Participant);

        assert!(engine().can_create(&admin, ResourceKind::Project).is_allowed());
        assert!(engine().can_create(&participant, ResourceKind::Project).is_denied());

        assert!(engine().can_create(&participant, ResourceKind::Report).is_allowed());
        assert!(engine().can_create(&admin, ResourceKind::Report).is_denied());
    }

    #[test]
    fn test_owner_mutation_gated_on_submitted() {
        let owner = Actor::new(9, Role::Participant);
        let mentor = Actor::new(2, Role::Mentor);

        for kind in [SubmissionKind::Project, SubmissionKind::Report] {
            let open = submission(kind, 9, SubmissionStatus::Submitted);
            let frozen = submission(kind, 9, SubmissionStatus::InReview);

            assert!(engine().can_update(&owner, Snapshot::Submission(&open)).is_allowed());
            assert!(engine().can_delete(&owner, Snapshot::Submission(&open)).is_allowed());
            assert!(engine().can_update(&owner, Snapshot::Submission(&frozen)).is_denied());
            assert!(engine().can_delete(&owner, Snapshot::Submission(&frozen)).is_denied());

            // Mentors review through the status endpoint, not entity edits.
            assert!(engine().can_update(&mentor, Snapshot::Submission(&open)).is_denied());
        }
    }

    #[test]
    fn test_admin_may_delete_every_resource() {
        let admin = Actor::new(1, Role::Admin);
        let sub = submission(SubmissionKind::Project, 9, SubmissionStatus::Approved);
        let test = test_paper();
        let q = question();
        let res = resource(1);
        let tr = result_for(4);
        let acct = account(6, Role::Participant);

        let snapshots = [
            Snapshot::Submission(&sub),
            Snapshot::Test(&test),
            Snapshot::Question(&q),
            Snapshot::Resource(&res),
            Snapshot::TestResult(&tr),
            Snapshot::User(&acct),
        ];
        for snap in snapshots {
            assert!(
                engine().can_delete(&admin, snap).is_allowed(),
                "admin delete on {:?} denied",
                snap.kind()
            );
        }
    }

    #[test]
    fn test_tests_open_questions_staff_only() {
        let participant = Actor::new(5, Role::Participant);
        let mentor = Actor::new(2, Role::Mentor);
        let test = test_paper();
        let q = question();

        assert!(engine().can_view(&participant, Snapshot::Test(&test)).is_allowed());
        assert!(engine().can_download(&participant, Snapshot::Test(&test)).is_allowed());
        assert!(engine().can_view(&participant, Snapshot::Question(&q)).is_denied());
        assert!(engine().can_download(&participant, Snapshot::Question(&q)).is_denied());

        assert!(engine().can_view(&mentor, Snapshot::Question(&q)).is_allowed());
        assert!(engine().can_update(&mentor, Snapshot::Question(&q)).is_allowed());
        assert!(engine().can_delete(&mentor, Snapshot::Question(&q)).is_denied());
    }

    #[test]
    fn test_resource_rules() {
        let res = resource(1);
        for role in Role::all() {
            let actor = Actor::new(50, role);
            assert!(engine().can_view(&actor, Snapshot::Resource(&res)).is_allowed());
            assert!(engine().can_download(&actor, Snapshot::Resource(&res)).is_allowed());
            assert!(engine().can_view_any(&actor, ResourceKind::Resource).is_allowed());
        }
        let mentor = Actor::new(2, Role::Mentor);
        assert!(engine().can_create(&mentor, ResourceKind::Resource).is_denied());
        assert!(engine().can_update(&mentor, Snapshot::Resource(&res)).is_denied());
    }

    #[test]
    fn test_result_visible_to_admin_and_owner_only() {
        let tr = result_for(4);
        let snap = Snapshot::TestResult(&tr);

        assert!(engine().can_view(&Actor::new(1, Role::Admin), snap).is_allowed());
        assert!(engine().can_view(&Actor::new(4, Role::Participant), snap).is_allowed());
        assert!(engine().can_download(&Actor::new(4, Role::Participant), snap).is_allowed());
        assert!(engine().can_view(&Actor::new(5, Role::Participant), snap).is_denied());
        assert!(engine().can_view(&Actor::new(2, Role::Mentor), snap).is_denied());
        assert!(engine().can_view_any(&Actor::new(2, Role::Mentor), ResourceKind::TestResult).is_denied());
    }

    #[test]
    fn test_user_rules() {
        let acct = account(6, Role::Participant);
        let snap = Snapshot::User(&acct);

        assert!(engine().can_view(&Actor::new(1, Role::Admin), snap).is_allowed());
        assert!(engine().can_view(&Actor::new(6, Role::Participant), snap).is_allowed());
        assert!(engine().can_view(&Actor::new(7, Role::Participant), snap).is_denied());

        assert!(engine().can_update(&Actor::new(6, Role::Participant), snap).is_allowed());
        assert!(engine().can_delete(&Actor::new(6, Role::Participant), snap).is_denied());

        // Accounts are created by registration, never through the engine.
        assert!(engine().can_create(&Actor::new(1, Role::Admin), ResourceKind::User).is_denied());
    }

    #[test]
    fn test_enforce_maps_denials_to_errors() {
        let participant = Actor::new(5, Role::Participant);
        assert!(engine()
            .enforce(&participant, Action::Create, ResourceKind::Report, None)
            .is_ok());
        let err = engine()
            .enforce(&participant, Action::Create, ResourceKind::Test, None)
            .unwrap_err();
        assert!(matches!(err, PolicyError::PermissionDenied(DenyReason::NotPermitted)));
    }
}
