//! Entity models: actors, submissions, tests, questions, resources, results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::role::Role;

// ═══════════════════════════════════════════════════════════════════════════════
// Identifiers
// ═══════════════════════════════════════════════════════════════════════════════

/// Strongly-typed user identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl UserId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Actor
// ═══════════════════════════════════════════════════════════════════════════════

/// An authenticated identity as seen by the policy engine.
///
/// The role is `None` when the boundary failed to parse the role claim;
/// such actors are denied every action rather than rejected with an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: UserId,
    pub role: Option<Role>,
    pub verified: bool,
}

impl Actor {
    /// Actor with a recognized role.
    pub fn new(id: impl Into<UserId>, role: Role) -> Self {
        Self {
            id: id.into(),
            role: Some(role),
            verified: true,
        }
    }

    /// Actor whose role claim did not parse. Kept around so request
    /// handling can still log the identity while every check denies it.
    pub fn without_role(id: impl Into<UserId>) -> Self {
        Self {
            id: id.into(),
            role: None,
            verified: false,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Some(Role::Admin)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Submissions (projects and reports)
// ═══════════════════════════════════════════════════════════════════════════════

/// Discriminates the two submission families. They share a shape and a
/// review workflow but are governed by different policy rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionKind {
    Project,
    Report,
}

impl SubmissionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Report => "report",
        }
    }
}

impl FromStr for SubmissionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "project" => Ok(Self::Project),
            "report" => Ok(Self::Report),
            other => Err(format!("unknown submission kind: {other}")),
        }
    }
}

impl fmt::Display for SubmissionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Review lifecycle of a submission.
///
/// Owners may edit only while `Submitted`; review outcomes are set by
/// Admin or Mentor and there is no path back to `Submitted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Submitted,
    InReview,
    Approved,
    Rejected,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::InReview => "in_review",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl FromStr for SubmissionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "submitted" => Ok(Self::Submitted),
            "in_review" => Ok(Self::InReview),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(format!("unknown submission status: {other}")),
        }
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A reviewable artifact handed in by its owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub id: i64,
    pub kind: SubmissionKind,
    pub title: String,
    pub description: Option<String>,
    pub file_url: String,
    pub file_type: String,
    /// The submitting user. Ownership never changes.
    pub owner_id: UserId,
    pub status: SubmissionStatus,
    pub feedback: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests and questions
// ═══════════════════════════════════════════════════════════════════════════════

/// Kind of test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestKind {
    Qcm,
    Open,
    Practical,
}

impl TestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Qcm => "qcm",
            Self::Open => "open",
            Self::Practical => "practical",
        }
    }
}

impl FromStr for TestKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "qcm" => Ok(Self::Qcm),
            "open" => Ok(Self::Open),
            "practical" => Ok(Self::Practical),
            other => Err(format!("unknown test kind: {other}")),
        }
    }
}

/// Kind of question. Mirrors [`TestKind`] but questions are typed
/// independently of the test that contains them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    Qcm,
    Open,
    Practical,
}

impl QuestionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Qcm => "qcm",
            Self::Open => "open",
            Self::Practical => "practical",
        }
    }
}

impl FromStr for QuestionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "qcm" => Ok(Self::Qcm),
            "open" => Ok(Self::Open),
            "practical" => Ok(Self::Practical),
            other => Err(format!("unknown question kind: {other}")),
        }
    }
}

/// An assessment visible to every authenticated user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Test {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub kind: TestKind,
    pub file_url: Option<String>,
    pub file_type: Option<String>,
    pub created_by: UserId,
}

/// A question belonging to a test. Removed together with its test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub test_id: i64,
    pub text: String,
    pub kind: QuestionKind,
    pub options: Option<Vec<String>>,
    pub correct_answer: Option<String>,
    pub file_url: Option<String>,
    pub file_type: Option<String>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Resources
// ═══════════════════════════════════════════════════════════════════════════════

/// A downloadable learning resource uploaded by an admin.
///
/// `download_count` only ever grows, by exactly one per successful
/// download, through the store's atomic increment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDoc {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub file_url: String,
    pub file_type: String,
    pub uploaded_by: UserId,
    pub is_published: bool,
    pub download_count: i64,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Test results
// ═══════════════════════════════════════════════════════════════════════════════

/// A user's graded outcome for a test. Admin-managed; visible to the
/// admin and to the user it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub id: i64,
    pub user_id: UserId,
    pub test_id: i64,
    pub score: Option<f64>,
    pub file_path: Option<String>,
    pub file_type: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// User accounts
// ═══════════════════════════════════════════════════════════════════════════════

/// A stored user account.
///
/// Unlike [`Actor`], the role here is always valid: the column is
/// constrained at write time. Accounts are created by registration with
/// the Participant role; only an admin changes it afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: Role,
    pub verified: bool,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
