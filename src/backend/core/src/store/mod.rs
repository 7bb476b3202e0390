//! Persistence layer.
//!
//! Handlers talk to the [`Store`] trait; [`PgStore`] backs production and
//! [`MemStore`] backs tests and local development. Both uphold the same
//! contract the policy layer relies on:
//!
//! - ownership columns never change after insert;
//! - `download_count` moves only through [`Store::increment_download_count`],
//!   which is atomic in both backends, so concurrent downloads never lose
//!   an update;
//! - deleting a test removes its questions.
//!
//! Update operations take a change-set struct whose `None` fields mean
//! "leave untouched". The request layer narrows change-sets to the fields
//! the policy engine granted before calling in here.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    Question, QuestionKind, ResourceDoc, Role, Submission, SubmissionKind, SubmissionStatus, Test,
    TestKind, TestResult, UserAccount, UserId,
};
use crate::error::Result;

pub use memory::MemStore;
pub use postgres::PgStore;

// ═══════════════════════════════════════════════════════════════════════════════
// Insert payloads
// ═══════════════════════════════════════════════════════════════════════════════

/// Payload for a new submission. Status always starts at `Submitted`.
#[derive(Debug, Clone)]
pub struct NewSubmission {
    pub kind: SubmissionKind,
    pub title: String,
    pub description: Option<String>,
    pub file_url: String,
    pub file_type: String,
    pub owner_id: UserId,
}

#[derive(Debug, Clone)]
pub struct NewTest {
    pub title: String,
    pub description: Option<String>,
    pub kind: TestKind,
    pub file_url: Option<String>,
    pub file_type: Option<String>,
    pub created_by: UserId,
}

#[derive(Debug, Clone)]
pub struct NewQuestion {
    pub test_id: i64,
    pub text: String,
    pub kind: QuestionKind,
    pub options: Option<Vec<String>>,
    pub correct_answer: Option<String>,
    pub file_url: Option<String>,
    pub file_type: Option<String>,
}

/// Payload for a new resource. The download counter starts at zero.
#[derive(Debug, Clone)]
pub struct NewResource {
    pub title: String,
    pub description: Option<String>,
    pub file_url: String,
    pub file_type: String,
    pub uploaded_by: UserId,
    pub is_published: bool,
}

#[derive(Debug, Clone)]
pub struct NewTestResult {
    pub user_id: UserId,
    pub test_id: i64,
    pub score: Option<f64>,
    pub file_path: Option<String>,
    pub file_type: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Change-sets
// ═══════════════════════════════════════════════════════════════════════════════

/// Submission update; `None` leaves a field untouched. Ownership and
/// submission time are deliberately absent.
#[derive(Debug, Clone, Default)]
pub struct SubmissionChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub file_url: Option<String>,
    pub file_type: Option<String>,
    pub status: Option<SubmissionStatus>,
    pub feedback: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct TestChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub kind: Option<TestKind>,
    pub file_url: Option<String>,
    pub file_type: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct QuestionChanges {
    pub text: Option<String>,
    pub kind: Option<QuestionKind>,
    pub options: Option<Vec<String>>,
    pub correct_answer: Option<String>,
    pub file_url: Option<String>,
    pub file_type: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ResourceChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub file_url: Option<String>,
    pub file_type: Option<String>,
    pub is_published: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct TestResultChanges {
    pub score: Option<f64>,
    pub file_path: Option<String>,
    pub file_type: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// User account update. Role changes are narrowed to admins by the
/// request layer before this reaches the store.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub verified: Option<bool>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Store trait
// ═══════════════════════════════════════════════════════════════════════════════

/// The persistence operations the request layer needs.
#[async_trait]
pub trait Store: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Submissions (projects and reports)
    // ─────────────────────────────────────────────────────────────────────────

    async fn insert_submission(&self, new: NewSubmission) -> Result<Submission>;

    async fn get_submission(&self, kind: SubmissionKind, id: i64) -> Result<Option<Submission>>;

    async fn list_submissions(&self, kind: SubmissionKind) -> Result<Vec<Submission>>;

    async fn list_submissions_for_owner(
        &self,
        kind: SubmissionKind,
        owner: UserId,
    ) -> Result<Vec<Submission>>;

    /// Apply a change-set. Returns the updated row, `None` if absent.
    async fn update_submission(
        &self,
        kind: SubmissionKind,
        id: i64,
        changes: SubmissionChanges,
    ) -> Result<Option<Submission>>;

    async fn delete_submission(&self, kind: SubmissionKind, id: i64) -> Result<bool>;

    // ─────────────────────────────────────────────────────────────────────────
    // Tests
    // ─────────────────────────────────────────────────────────────────────────

    async fn insert_test(&self, new: NewTest) -> Result<Test>;

    async fn get_test(&self, id: i64) -> Result<Option<Test>>;

    async fn list_tests(&self) -> Result<Vec<Test>>;

    async fn update_test(&self, id: i64, changes: TestChanges) -> Result<Option<Test>>;

    /// Delete a test and, transactionally, every question attached to it.
    async fn delete_test(&self, id: i64) -> Result<bool>;

    // ─────────────────────────────────────────────────────────────────────────
    // Questions
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert a question. Fails with a validation error when the
    /// referenced test does not exist.
    async fn insert_question(&self, new: NewQuestion) -> Result<Question>;

    async fn get_question(&self, id: i64) -> Result<Option<Question>>;

    /// All questions, or those of one test.
    async fn list_questions(&self, test_id: Option<i64>) -> Result<Vec<Question>>;

    async fn update_question(&self, id: i64, changes: QuestionChanges) -> Result<Option<Question>>;

    async fn delete_question(&self, id: i64) -> Result<bool>;

    // ─────────────────────────────────────────────────────────────────────────
    // Resources
    // ─────────────────────────────────────────────────────────────────────────

    async fn insert_resource(&self, new: NewResource) -> Result<ResourceDoc>;

    async fn get_resource(&self, id: i64) -> Result<Option<ResourceDoc>>;

    async fn list_resources(&self) -> Result<Vec<ResourceDoc>>;

    async fn update_resource(&self, id: i64, changes: ResourceChanges)
        -> Result<Option<ResourceDoc>>;

    async fn delete_resource(&self, id: i64) -> Result<bool>;

    /// Atomically bump the download counter by one. Returns the new
    /// count, `None` if the resource is absent.
    async fn increment_download_count(&self, id: i64) -> Result<Option<i64>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Test results
    // ─────────────────────────────────────────────────────────────────────────

    async fn insert_test_result(&self, new: NewTestResult) -> Result<TestResult>;

    async fn get_test_result(&self, id: i64) -> Result<Option<TestResult>>;

    async fn list_test_results(&self) -> Result<Vec<TestResult>>;

    async fn list_test_results_for_user(&self, user: UserId) -> Result<Vec<TestResult>>;

    async fn update_test_result(
        &self,
        id: i64,
        changes: TestResultChanges,
    ) -> Result<Option<TestResult>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Users
    // ─────────────────────────────────────────────────────────────────────────

    async fn get_user(&self, id: UserId) -> Result<Option<UserAccount>>;

    async fn list_users(&self) -> Result<Vec<UserAccount>>;

    async fn update_user(&self, id: UserId, changes: UserChanges) -> Result<Option<UserAccount>>;

    async fn delete_user(&self, id: UserId) -> Result<bool>;
}
