//! PostgreSQL store backed by sqlx.
//!
//! Optional change-set fields map to `COALESCE($n, column)` so one
//! statement covers every combination of touched fields. The download
//! counter moves through a single `UPDATE ... SET download_count =
//! download_count + 1`, never a read-modify-write from this process.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::config::DatabaseConfig;
use crate::domain::{
    Question, ResourceDoc, Submission, SubmissionKind, Test, TestResult, UserAccount, UserId,
};
use crate::error::{MentoraError, Result};

use super::{
    NewQuestion, NewResource, NewSubmission, NewTest, NewTestResult, QuestionChanges,
    ResourceChanges, Store, SubmissionChanges, TestChanges, TestResultChanges, UserChanges,
};

/// Database connection and operations.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a new connection pool.
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(std::time::Duration::from_secs(5))
            .connect(&config.url)
            .await?;

        Ok(Self { pool })
    }

    /// Run migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| MentoraError::from(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Row Types
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, sqlx::FromRow)]
struct SubmissionRow {
    id: i64,
    kind: String,
    title: String,
    description: Option<String>,
    file_url: String,
    file_type: String,
    owner_id: i64,
    status: String,
    feedback: Option<String>,
    submitted_at: DateTime<Utc>,
}

impl SubmissionRow {
    fn into_submission(self) -> Result<Submission> {
        Ok(Submission {
            id: self.id,
            kind: self.kind.parse().map_err(MentoraError::internal)?,
            title: self.title,
            description: self.description,
            file_url: self.file_url,
            file_type: self.file_type,
            owner_id: UserId(self.owner_id),
            status: self.status.parse().map_err(MentoraError::internal)?,
            feedback: self.feedback,
            submitted_at: self.submitted_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TestRow {
    id: i64,
    title: String,
    description: Option<String>,
    kind: String,
    file_url: Option<String>,
    file_type: Option<String>,
    created_by: i64,
}

impl TestRow {
    fn into_test(self) -> Result<Test> {
        Ok(Test {
            id: self.id,
            title: self.title,
            description: self.description,
            kind: self.kind.parse().map_err(MentoraError::internal)?,
            file_url: self.file_url,
            file_type: self.file_type,
            created_by: UserId(self.created_by),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct QuestionRow {
    id: i64,
    test_id: i64,
    text: String,
    kind: String,
    options: Option<serde_json::Value>,
    correct_answer: Option<String>,
    file_url: Option<String>,
    file_type: Option<String>,
}

impl QuestionRow {
    fn into_question(self) -> Result<Question> {
        let options = self
            .options
            .map(serde_json::from_value::<Vec<String>>)
            .transpose()?;
        Ok(Question {
            id: self.id,
            test_id: self.test_id,
            text: self.text,
            kind: self.kind.parse().map_err(MentoraError::internal)?,
            options,
            correct_answer: self.correct_answer,
            file_url: self.file_url,
            file_type: self.file_type,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ResourceRow {
    id: i64,
    title: String,
    description: Option<String>,
    file_url: String,
    file_type: String,
    uploaded_by: i64,
    is_published: bool,
    download_count: i64,
}

impl ResourceRow {
    fn into_resource(self) -> ResourceDoc {
        ResourceDoc {
            id: self.id,
            title: self.title,
            description: self.description,
            file_url: self.file_url,
            file_type: self.file_type,
            uploaded_by: UserId(self.uploaded_by),
            is_published: self.is_published,
            download_count: self.download_count,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TestResultRow {
    id: i64,
    user_id: i64,
    test_id: i64,
    score: Option<f64>,
    file_path: Option<String>,
    file_type: Option<String>,
    completed_at: Option<DateTime<Utc>>,
}

impl TestResultRow {
    fn into_result(self) -> TestResult {
        TestResult {
            id: self.id,
            user_id: UserId(self.user_id),
            test_id: self.test_id,
            score: self.score,
            file_path: self.file_path,
            file_type: self.file_type,
            completed_at: self.completed_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i64,
    first_name: String,
    last_name: String,
    email: String,
    role: String,
    verified: bool,
}

impl UserRow {
    fn into_account(self) -> Result<UserAccount> {
        Ok(UserAccount {
            id: UserId(self.id),
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            role: self
                .role
                .parse()
                .map_err(|e: crate::domain::UnknownRole| MentoraError::internal(e.to_string()))?,
            verified: self.verified,
        })
    }
}

const SUBMISSION_COLUMNS: &str =
    "id, kind, title, description, file_url, file_type, owner_id, status, feedback, submitted_at";
const TEST_COLUMNS: &str = "id, title, description, kind, file_url, file_type, created_by";
const QUESTION_COLUMNS: &str =
    "id, test_id, text, kind, options, correct_answer, file_url, file_type";
const RESOURCE_COLUMNS: &str =
    "id, title, description, file_url, file_type, uploaded_by, is_published, download_count";
const RESULT_COLUMNS: &str = "id, user_id, test_id, score, file_path, file_type, completed_at";
const USER_COLUMNS: &str = "id, first_name, last_name, email, role, verified";

// ═══════════════════════════════════════════════════════════════════════════════
// Store Implementation
// ═══════════════════════════════════════════════════════════════════════════════

#[async_trait]
impl Store for PgStore {
    // ─────────────────────────────────────────────────────────────────────────
    // Submissions
    // ─────────────────────────────────────────────────────────────────────────

    async fn insert_submission(&self, new: NewSubmission) -> Result<Submission> {
        let row = sqlx::query_as::<_, SubmissionRow>(
            r#"
            INSERT INTO submissions (kind, title, description, file_url, file_type, owner_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, kind, title, description, file_url, file_type, owner_id, status, feedback, submitted_at
            "#,
        )
        .bind(new.kind.as_str())
        .bind(&new.title)
        .bind(&new.description)
        .bind(&new.file_url)
        .bind(&new.file_type)
        .bind(new.owner_id.as_i64())
        .fetch_one(&self.pool)
        .await?;

        row.into_submission()
    }

    async fn get_submission(&self, kind: SubmissionKind, id: i64) -> Result<Option<Submission>> {
        let row = sqlx::query_as::<_, SubmissionRow>(&format!(
            "SELECT {SUBMISSION_COLUMNS} FROM submissions WHERE id = $1 AND kind = $2"
        ))
        .bind(id)
        .bind(kind.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(SubmissionRow::into_submission).transpose()
    }

    async fn list_submissions(&self, kind: SubmissionKind) -> Result<Vec<Submission>> {
        let rows = sqlx::query_as::<_, SubmissionRow>(&format!(
            "SELECT {SUBMISSION_COLUMNS} FROM submissions WHERE kind = $1 ORDER BY id"
        ))
        .bind(kind.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(SubmissionRow::into_submission).collect()
    }

    async fn list_submissions_for_owner(
        &self,
        kind: SubmissionKind,
        owner: UserId,
    ) -> Result<Vec<Submission>> {
        let rows = sqlx::query_as::<_, SubmissionRow>(&format!(
            "SELECT {SUBMISSION_COLUMNS} FROM submissions WHERE kind = $1 AND owner_id = $2 ORDER BY id"
        ))
        .bind(kind.as_str())
        .bind(owner.as_i64())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(SubmissionRow::into_submission).collect()
    }

    async fn update_submission(
        &self,
        kind: SubmissionKind,
        id: i64,
        changes: SubmissionChanges,
    ) -> Result<Option<Submission>> {
        let row = sqlx::query_as::<_, SubmissionRow>(
            r#"
            UPDATE submissions
            SET title = COALESCE($3, title),
                description = COALESCE($4, description),
                file_url = COALESCE($5, file_url),
                file_type = COALESCE($6, file_type),
                status = COALESCE($7, status),
                feedback = COALESCE($8, feedback)
            WHERE id = $1 AND kind = $2
            RETURNING id, kind, title, description, file_url, file_type, owner_id, status, feedback, submitted_at
            "#,
        )
        .bind(id)
        .bind(kind.as_str())
        .bind(&changes.title)
        .bind(&changes.description)
        .bind(&changes.file_url)
        .bind(&changes.file_type)
        .bind(changes.status.map(|s| s.as_str()))
        .bind(&changes.feedback)
        .fetch_optional(&self.pool)
        .await?;

        row.map(SubmissionRow::into_submission).transpose()
    }

    async fn delete_submission(&self, kind: SubmissionKind, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM submissions WHERE id = $1 AND kind = $2")
            .bind(id)
            .bind(kind.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Tests
    // ─────────────────────────────────────────────────────────────────────────

    async fn insert_test(&self, new: NewTest) -> Result<Test> {
        let row = sqlx::query_as::<_, TestRow>(
            r#"
            INSERT INTO tests (title, description, kind, file_url, file_type, created_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, title, description, kind, file_url, file_type, created_by
            "#,
        )
        .bind(&new.title)
        .bind(&new.description)
        .bind(new.kind.as_str())
        .bind(&new.file_url)
        .bind(&new.file_type)
        .bind(new.created_by.as_i64())
        .fetch_one(&self.pool)
        .await?;

        row.into_test()
    }

    async fn get_test(&self, id: i64) -> Result<Option<Test>> {
        let row = sqlx::query_as::<_, TestRow>(&format!(
            "SELECT {TEST_COLUMNS} FROM tests WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TestRow::into_test).transpose()
    }

    async fn list_tests(&self) -> Result<Vec<Test>> {
        let rows = sqlx::query_as::<_, TestRow>(&format!(
            "SELECT {TEST_COLUMNS} FROM tests ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TestRow::into_test).collect()
    }

    async fn update_test(&self, id: i64, changes: TestChanges) -> Result<Option<Test>> {
        let row = sqlx::query_as::<_, TestRow>(
            r#"
            UPDATE tests
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                kind = COALESCE($4, kind),
                file_url = COALESCE($5, file_url),
                file_type = COALESCE($6, file_type)
            WHERE id = $1
            RETURNING id, title, description, kind, file_url, file_type, created_by
            "#,
        )
        .bind(id)
        .bind(&changes.title)
        .bind(&changes.description)
        .bind(changes.kind.map(|k| k.as_str()))
        .bind(&changes.file_url)
        .bind(&changes.file_type)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TestRow::into_test).transpose()
    }

    async fn delete_test(&self, id: i64) -> Result<bool> {
        // Questions go with it through the ON DELETE CASCADE constraint.
        let result = sqlx::query("DELETE FROM tests WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Questions
    // ─────────────────────────────────────────────────────────────────────────

    async fn insert_question(&self, new: NewQuestion) -> Result<Question> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM tests WHERE id = $1)")
            .bind(new.test_id)
            .fetch_one(&self.pool)
            .await?;
        if !exists {
            return Err(MentoraError::validation(format!(
                "test {} does not exist",
                new.test_id
            )));
        }

        let options = new.options.map(serde_json::to_value).transpose()?;

        let row = sqlx::query_as::<_, QuestionRow>(
            r#"
            INSERT INTO questions (test_id, text, kind, options, correct_answer, file_url, file_type)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, test_id, text, kind, options, correct_answer, file_url, file_type
            "#,
        )
        .bind(new.test_id)
        .bind(&new.text)
        .bind(new.kind.as_str())
        .bind(options)
        .bind(&new.correct_answer)
        .bind(&new.file_url)
        .bind(&new.file_type)
        .fetch_one(&self.pool)
        .await?;

        row.into_question()
    }

    async fn get_question(&self, id: i64) -> Result<Option<Question>> {
        let row = sqlx::query_as::<_, QuestionRow>(&format!(
            "SELECT {QUESTION_COLUMNS} FROM questions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(QuestionRow::into_question).transpose()
    }

    async fn list_questions(&self, test_id: Option<i64>) -> Result<Vec<Question>> {
        let rows = match test_id {
            Some(test_id) => {
                sqlx::query_as::<_, QuestionRow>(&format!(
                    "SELECT {QUESTION_COLUMNS} FROM questions WHERE test_id = $1 ORDER BY id"
                ))
                .bind(test_id)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, QuestionRow>(&format!(
                    "SELECT {QUESTION_COLUMNS} FROM questions ORDER BY id"
                ))
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.into_iter().map(QuestionRow::into_question).collect()
    }

    async fn update_question(&self, id: i64, changes: QuestionChanges) -> Result<Option<Question>> {
        let options = changes.options.map(serde_json::to_value).transpose()?;

        let row = sqlx::query_as::<_, QuestionRow>(
            r#"
            UPDATE questions
            SET text = COALESCE($2, text),
                kind = COALESCE($3, kind),
                options = COALESCE($4, options),
                correct_answer = COALESCE($5, correct_answer),
                file_url = COALESCE($6, file_url),
                file_type = COALESCE($7, file_type)
            WHERE id = $1
            RETURNING id, test_id, text, kind, options, correct_answer, file_url, file_type
            "#,
        )
        .bind(id)
        .bind(&changes.text)
        .bind(changes.kind.map(|k| k.as_str()))
        .bind(options)
        .bind(&changes.correct_answer)
        .bind(&changes.file_url)
        .bind(&changes.file_type)
        .fetch_optional(&self.pool)
        .await?;

        row.map(QuestionRow::into_question).transpose()
    }

    async fn delete_question(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM questions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Resources
    // ─────────────────────────────────────────────────────────────────────────

    async fn insert_resource(&self, new: NewResource) -> Result<ResourceDoc> {
        let row = sqlx::query_as::<_, ResourceRow>(
            r#"
            INSERT INTO resources (title, description, file_url, file_type, uploaded_by, is_published)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, title, description, file_url, file_type, uploaded_by, is_published, download_count
            "#,
        )
        .bind(&new.title)
        .bind(&new.description)
        .bind(&new.file_url)
        .bind(&new.file_type)
        .bind(new.uploaded_by.as_i64())
        .bind(new.is_published)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into_resource())
    }

    async fn get_resource(&self, id: i64) -> Result<Option<ResourceDoc>> {
        let row = sqlx::query_as::<_, ResourceRow>(&format!(
            "SELECT {RESOURCE_COLUMNS} FROM resources WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(ResourceRow::into_resource))
    }

    async fn list_resources(&self) -> Result<Vec<ResourceDoc>> {
        let rows = sqlx::query_as::<_, ResourceRow>(&format!(
            "SELECT {RESOURCE_COLUMNS} FROM resources ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ResourceRow::into_resource).collect())
    }

    async fn update_resource(
        &self,
        id: i64,
        changes: ResourceChanges,
    ) -> Result<Option<ResourceDoc>> {
        let row = sqlx::query_as::<_, ResourceRow>(
            r#"
            UPDATE resources
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                file_url = COALESCE($4, file_url),
                file_type = COALESCE($5, file_type),
                is_published = COALESCE($6, is_published)
            WHERE id = $1
            RETURNING id, title, description, file_url, file_type, uploaded_by, is_published, download_count
            "#,
        )
        .bind(id)
        .bind(&changes.title)
        .bind(&changes.description)
        .bind(&changes.file_url)
        .bind(&changes.file_type)
        .bind(changes.is_published)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(ResourceRow::into_resource))
    }

    async fn delete_resource(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM resources WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn increment_download_count(&self, id: i64) -> Result<Option<i64>> {
        let count: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE resources
            SET download_count = download_count + 1
            WHERE id = $1
            RETURNING download_count
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(count)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Test results
    // ─────────────────────────────────────────────────────────────────────────

    async fn insert_test_result(&self, new: NewTestResult) -> Result<TestResult> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM tests WHERE id = $1)")
            .bind(new.test_id)
            .fetch_one(&self.pool)
            .await?;
        if !exists {
            return Err(MentoraError::validation(format!(
                "test {} does not exist",
                new.test_id
            )));
        }

        let row = sqlx::query_as::<_, TestResultRow>(
            r#"
            INSERT INTO user_test_results (user_id, test_id, score, file_path, file_type, completed_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, user_id, test_id, score, file_path, file_type, completed_at
            "#,
        )
        .bind(new.user_id.as_i64())
        .bind(new.test_id)
        .bind(new.score)
        .bind(&new.file_path)
        .bind(&new.file_type)
        .bind(new.completed_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into_result())
    }

    async fn get_test_result(&self, id: i64) -> Result<Option<TestResult>> {
        let row = sqlx::query_as::<_, TestResultRow>(&format!(
            "SELECT {RESULT_COLUMNS} FROM user_test_results WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(TestResultRow::into_result))
    }

    async fn list_test_results(&self) -> Result<Vec<TestResult>> {
        let rows = sqlx::query_as::<_, TestResultRow>(&format!(
            "SELECT {RESULT_COLUMNS} FROM user_test_results ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(TestResultRow::into_result).collect())
    }

    async fn list_test_results_for_user(&self, user: UserId) -> Result<Vec<TestResult>> {
        let rows = sqlx::query_as::<_, TestResultRow>(&format!(
            "SELECT {RESULT_COLUMNS} FROM user_test_results WHERE user_id = $1 ORDER BY id"
        ))
        .bind(user.as_i64())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(TestResultRow::into_result).collect())
    }

    async fn update_test_result(
        &self,
        id: i64,
        changes: TestResultChanges,
    ) -> Result<Option<TestResult>> {
        let row = sqlx::query_as::<_, TestResultRow>(
            r#"
            UPDATE user_test_results
            SET score = COALESCE($2, score),
                file_path = COALESCE($3, file_path),
                file_type = COALESCE($4, file_type),
                completed_at = COALESCE($5, completed_at)
            WHERE id = $1
            RETURNING id, user_id, test_id, score, file_path, file_type, completed_at
            "#,
        )
        .bind(id)
        .bind(changes.score)
        .bind(&changes.file_path)
        .bind(&changes.file_type)
        .bind(changes.completed_at)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(TestResultRow::into_result))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Users
    // ─────────────────────────────────────────────────────────────────────────

    async fn get_user(&self, id: UserId) -> Result<Option<UserAccount>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        row.map(UserRow::into_account).transpose()
    }

    async fn list_users(&self) -> Result<Vec<UserAccount>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(UserRow::into_account).collect()
    }

    async fn update_user(&self, id: UserId, changes: UserChanges) -> Result<Option<UserAccount>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            UPDATE users
            SET first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                email = COALESCE($4, email),
                role = COALESCE($5, role),
                verified = COALESCE($6, verified)
            WHERE id = $1
            RETURNING id, first_name, last_name, email, role, verified
            "#,
        )
        .bind(id.as_i64())
        .bind(&changes.first_name)
        .bind(&changes.last_name)
        .bind(&changes.email)
        .bind(changes.role.map(|r| r.as_str()))
        .bind(changes.verified)
        .fetch_optional(&self.pool)
        .await?;

        row.map(UserRow::into_account).transpose()
    }

    async fn delete_user(&self, id: UserId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id.as_i64())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
