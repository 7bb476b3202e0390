//! Read-only entity views consumed by instance-level checks.

use crate::domain::{
    Question, ResourceDoc, Submission, SubmissionKind, SubmissionStatus, Test, TestResult,
    UserAccount, UserId,
};

use super::action::ResourceKind;

/// The minimal view of a persisted entity a policy check needs: identity
/// of the owner and, for submissions, the lifecycle status. Borrowed from
/// the loaded entity so evaluation never clones.
#[derive(Debug, Clone, Copy)]
pub enum Snapshot<'a> {
    Submission(&'a Submission),
    Test(&'a Test),
    Question(&'a Question),
    Resource(&'a ResourceDoc),
    TestResult(&'a TestResult),
    User(&'a UserAccount),
}

impl Snapshot<'_> {
    /// The identity owner clauses compare against. Questions have no
    /// owner; their rules are role-only.
    pub fn owner_id(&self) -> Option<UserId> {
        match self {
            Self::Submission(s) => Some(s.owner_id),
            Self::Test(t) => Some(t.created_by),
            Self::Question(_) => None,
            Self::Resource(r) => Some(r.uploaded_by),
            Self::TestResult(r) => Some(r.user_id),
            Self::User(u) => Some(u.id),
        }
    }

    /// Lifecycle status, present only for submissions. The ownership gate
    /// fails closed on anything else.
    pub fn submission_status(&self) -> Option<SubmissionStatus> {
        match self {
            Self::Submission(s) => Some(s.status),
            _ => None,
        }
    }

    /// The rule-table row this snapshot resolves to.
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::Submission(s) => match s.kind {
                SubmissionKind::Project => ResourceKind::Project,
                SubmissionKind::Report => ResourceKind::Report,
            },
            Self::Test(_) => ResourceKind::Test,
            Self::Question(_) => ResourceKind::Question,
            Self::Resource(_) => ResourceKind::Resource,
            Self::TestResult(_) => ResourceKind::TestResult,
            Self::User(_) => ResourceKind::User,
        }
    }
}
