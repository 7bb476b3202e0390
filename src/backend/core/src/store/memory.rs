//! In-memory store.
//!
//! Backs integration tests and local development. DashMap gives per-key
//! exclusive access, which is what makes [`Store::increment_download_count`]
//! atomic here: the counter is bumped under the entry's write guard, never
//! via a separate read and write.

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::domain::{
    Question, ResourceDoc, Submission, SubmissionKind, SubmissionStatus, Test, TestResult,
    UserAccount, UserId,
};
use crate::error::{MentoraError, Result};

use super::{
    NewQuestion, NewResource, NewSubmission, NewTest, NewTestResult, QuestionChanges,
    ResourceChanges, Store, SubmissionChanges, TestChanges, TestResultChanges, UserChanges,
};

/// DashMap-backed store. Cheap to create per test.
#[derive(Debug, Default)]
pub struct MemStore {
    submissions: DashMap<i64, Submission>,
    tests: DashMap<i64, Test>,
    questions: DashMap<i64, Question>,
    resources: DashMap<i64, ResourceDoc>,
    results: DashMap<i64, TestResult>,
    users: DashMap<i64, UserAccount>,
    next_id: AtomicI64,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Seed a user account. Registration is handled outside this service,
    /// so accounts enter the memory store through this helper.
    pub fn put_user(&self, account: UserAccount) {
        self.users.insert(account.id.as_i64(), account);
    }

    fn sorted<T: Clone>(map: &DashMap<i64, T>, mut keep: impl FnMut(&T) -> bool) -> Vec<T> {
        let mut items: Vec<(i64, T)> = map
            .iter()
            .filter(|entry| keep(entry.value()))
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();
        items.sort_by_key(|(id, _)| *id);
        items.into_iter().map(|(_, item)| item).collect()
    }
}

#[async_trait]
impl Store for MemStore {
    // ─────────────────────────────────────────────────────────────────────────
    // Submissions
    // ─────────────────────────────────────────────────────────────────────────

    async fn insert_submission(&self, new: NewSubmission) -> Result<Submission> {
        let id = self.allocate_id();
        let submission = Submission {
            id,
            kind: new.kind,
            title: new.title,
            description: new.description,
            file_url: new.file_url,
            file_type: new.file_type,
            owner_id: new.owner_id,
            status: SubmissionStatus::Submitted,
            feedback: None,
            submitted_at: chrono::Utc::now(),
        };
        self.submissions.insert(id, submission.clone());
        Ok(submission)
    }

    async fn get_submission(&self, kind: SubmissionKind, id: i64) -> Result<Option<Submission>> {
        Ok(self
            .submissions
            .get(&id)
            .filter(|s| s.kind == kind)
            .map(|s| s.clone()))
    }

    async fn list_submissions(&self, kind: SubmissionKind) -> Result<Vec<Submission>> {
        Ok(Self::sorted(&self.submissions, |s| s.kind == kind))
    }

    async fn list_submissions_for_owner(
        &self,
        kind: SubmissionKind,
        owner: UserId,
    ) -> Result<Vec<Submission>> {
        Ok(Self::sorted(&self.submissions, |s| {
            s.kind == kind && s.owner_id == owner
        }))
    }

    async fn update_submission(
        &self,
        kind: SubmissionKind,
        id: i64,
        changes: SubmissionChanges,
    ) -> Result<Option<Submission>> {
        let Some(mut entry) = self.submissions.get_mut(&id) else {
            return Ok(None);
        };
        if entry.kind != kind {
            return Ok(None);
        }
        if let Some(title) = changes.title {
            entry.title = title;
        }
        if let Some(description) = changes.description {
            entry.description = Some(description);
        }
        if let Some(file_url) = changes.file_url {
            entry.file_url = file_url;
        }
        if let Some(file_type) = changes.file_type {
            entry.file_type = file_type;
        }
        if let Some(status) = changes.status {
            entry.status = status;
        }
        if let Some(feedback) = changes.feedback {
            entry.feedback = Some(feedback);
        }
        Ok(Some(entry.clone()))
    }

    async fn delete_submission(&self, kind: SubmissionKind, id: i64) -> Result<bool> {
        Ok(self
            .submissions
            .remove_if(&id, |_, s| s.kind == kind)
            .is_some())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Tests
    // ─────────────────────────────────────────────────────────────────────────

    async fn insert_test(&self, new: NewTest) -> Result<Test> {
        let id = self.allocate_id();
        let test = Test {
            id,
            title: new.title,
            description: new.description,
            kind: new.kind,
            file_url: new.file_url,
            file_type: new.file_type,
            created_by: new.created_by,
        };
        self.tests.insert(id, test.clone());
        Ok(test)
    }

    async fn get_test(&self, id: i64) -> Result<Option<Test>> {
        Ok(self.tests.get(&id).map(|t| t.clone()))
    }

    async fn list_tests(&self) -> Result<Vec<Test>> {
        Ok(Self::sorted(&self.tests, |_| true))
    }

    async fn update_test(&self, id: i64, changes: TestChanges) -> Result<Option<Test>> {
        let Some(mut entry) = self.tests.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(title) = changes.title {
            entry.title = title;
        }
        if let Some(description) = changes.description {
            entry.description = Some(description);
        }
        if let Some(kind) = changes.kind {
            entry.kind = kind;
        }
        if let Some(file_url) = changes.file_url {
            entry.file_url = Some(file_url);
        }
        if let Some(file_type) = changes.file_type {
            entry.file_type = Some(file_type);
        }
        Ok(Some(entry.clone()))
    }

    async fn delete_test(&self, id: i64) -> Result<bool> {
        let removed = self.tests.remove(&id).is_some();
        if removed {
            // Cascade, mirroring the foreign key in the SQL backend.
            self.questions.retain(|_, q| q.test_id != id);
        }
        Ok(removed)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Questions
    // ─────────────────────────────────────────────────────────────────────────

    async fn insert_question(&self, new: NewQuestion) -> Result<Question> {
        if !self.tests.contains_key(&new.test_id) {
            return Err(MentoraError::validation(format!(
                "test {} does not exist",
                new.test_id
            )));
        }
        let id = self.allocate_id();
        let question = Question {
            id,
            test_id: new.test_id,
            text: new.text,
            kind: new.kind,
            options: new.options,
            correct_answer: new.correct_answer,
            file_url: new.file_url,
            file_type: new.file_type,
        };
        self.questions.insert(id, question.clone());
        Ok(question)
    }

    async fn get_question(&self, id: i64) -> Result<Option<Question>> {
        Ok(self.questions.get(&id).map(|q| q.clone()))
    }

    async fn list_questions(&self, test_id: Option<i64>) -> Result<Vec<Question>> {
        Ok(Self::sorted(&self.questions, |q| {
            test_id.map_or(true, |t| q.test_id == t)
        }))
    }

    async fn update_question(&self, id: i64, changes: QuestionChanges) -> Result<Option<Question>> {
        let Some(mut entry) = self.questions.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(text) = changes.text {
            entry.text = text;
        }
        if let Some(kind) = changes.kind {
            entry.kind = kind;
        }
        if let Some(options) = changes.options {
            entry.options = Some(options);
        }
        if let Some(correct_answer) = changes.correct_answer {
            entry.correct_answer = Some(correct_answer);
        }
        if let Some(file_url) = changes.file_url {
            entry.file_url = Some(file_url);
        }
        if let Some(file_type) = changes.file_type {
            entry.file_type = Some(file_type);
        }
        Ok(Some(entry.clone()))
    }

    async fn delete_question(&self, id: i64) -> Result<bool> {
        Ok(self.questions.remove(&id).is_some())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Resources
    // ─────────────────────────────────────────────────────────────────────────

    async fn insert_resource(&self, new: NewResource) -> Result<ResourceDoc> {
        let id = self.allocate_id();
        let resource = ResourceDoc {
            id,
            title: new.title,
            description: new.description,
            file_url: new.file_url,
            file_type: new.file_type,
            uploaded_by: new.uploaded_by,
            is_published: new.is_published,
            download_count: 0,
        };
        self.resources.insert(id, resource.clone());
        Ok(resource)
    }

    async fn get_resource(&self, id: i64) -> Result<Option<ResourceDoc>> {
        Ok(self.resources.get(&id).map(|r| r.clone()))
    }

    async fn list_resources(&self) -> Result<Vec<ResourceDoc>> {
        Ok(Self::sorted(&self.resources, |_| true))
    }

    async fn update_resource(
        &self,
        id: i64,
        changes: ResourceChanges,
    ) -> Result<Option<ResourceDoc>> {
        let Some(mut entry) = self.resources.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(title) = changes.title {
            entry.title = title;
        }
        if let Some(description) = changes.description {
            entry.description = Some(description);
        }
        if let Some(file_url) = changes.file_url {
            entry.file_url = file_url;
        }
        if let Some(file_type) = changes.file_type {
            entry.file_type = file_type;
        }
        if let Some(is_published) = changes.is_published {
            entry.is_published = is_published;
        }
        Ok(Some(entry.clone()))
    }

    async fn delete_resource(&self, id: i64) -> Result<bool> {
        Ok(self.resources.remove(&id).is_some())
    }

    async fn increment_download_count(&self, id: i64) -> Result<Option<i64>> {
        Ok(self.resources.get_mut(&id).map(|mut entry| {
            entry.download_count += 1;
            entry.download_count
        }))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Test results
    // ─────────────────────────────────────────────────────────────────────────

    async fn insert_test_result(&self, new: NewTestResult) -> Result<TestResult> {
        if !self.tests.contains_key(&new.test_id) {
            return Err(MentoraError::validation(format!(
                "test {} does not exist",
                new.test_id
            )));
        }
        let id = self.allocate_id();
        let result = TestResult {
            id,
            user_id: new.user_id,
            test_id: new.test_id,
            score: new.score,
            file_path: new.file_path,
            file_type: new.file_type,
            completed_at: new.completed_at,
        };
        self.results.insert(id, result.clone());
        Ok(result)
    }

    async fn get_test_result(&self, id: i64) -> Result<Option<TestResult>> {
        Ok(self.results.get(&id).map(|r| r.clone()))
    }

    async fn list_test_results(&self) -> Result<Vec<TestResult>> {
        Ok(Self::sorted(&self.results, |_| true))
    }

    async fn list_test_results_for_user(&self, user: UserId) -> Result<Vec<TestResult>> {
        Ok(Self::sorted(&self.results, |r| r.user_id == user))
    }

    async fn update_test_result(
        &self,
        id: i64,
        changes: TestResultChanges,
    ) -> Result<Option<TestResult>> {
        let Some(mut entry) = self.results.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(score) = changes.score {
            entry.score = Some(score);
        }
        if let Some(file_path) = changes.file_path {
            entry.file_path = Some(file_path);
        }
        if let Some(file_type) = changes.file_type {
            entry.file_type = Some(file_type);
        }
        if let Some(completed_at) = changes.completed_at {
            entry.completed_at = Some(completed_at);
        }
        Ok(Some(entry.clone()))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Users
    // ─────────────────────────────────────────────────────────────────────────

    async fn get_user(&self, id: UserId) -> Result<Option<UserAccount>> {
        Ok(self.users.get(&id.as_i64()).map(|u| u.clone()))
    }

    async fn list_users(&self) -> Result<Vec<UserAccount>> {
        Ok(Self::sorted(&self.users, |_| true))
    }

    async fn update_user(&self, id: UserId, changes: UserChanges) -> Result<Option<UserAccount>> {
        let Some(mut entry) = self.users.get_mut(&id.as_i64()) else {
            return Ok(None);
        };
        if let Some(first_name) = changes.first_name {
            entry.first_name = first_name;
        }
        if let Some(last_name) = changes.last_name {
            entry.last_name = last_name;
        }
        if let Some(email) = changes.email {
            entry.email = email;
        }
        if let Some(role) = changes.role {
            entry.role = role;
        }
        if let Some(verified) = changes.verified {
            entry.verified = verified;
        }
        Ok(Some(entry.clone()))
    }

    async fn delete_user(&self, id: UserId) -> Result<bool> {
        Ok(self.users.remove(&id.as_i64()).is_some())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{QuestionKind, TestKind};
    use std::sync::Arc;

    fn new_test() -> NewTest {
        NewTest {
            title: "rust basics".to_string(),
            description: None,
            kind: TestKind::Qcm,
            file_url: None,
            file_type: None,
            created_by: UserId(1),
        }
    }

    fn new_resource() -> NewResource {
        NewResource {
            title: "handbook".to_string(),
            description: None,
            file_url: "uploads/handbook.pdf".to_string(),
            file_type: "pdf".to_string(),
            uploaded_by: UserId(1),
            is_published: true,
        }
    }

    #[tokio::test]
    async fn test_submission_lifecycle() {
        let store = MemStore::new();
        let created = store
            .insert_submission(NewSubmission {
                kind: SubmissionKind::Report,
                title: "week 1".to_string(),
                description: None,
                file_url: "uploads/w1.pdf".to_string(),
                file_type: "pdf".to_string(),
                owner_id: UserId(9),
            })
            .await
            .unwrap();
        assert_eq!(created.status, SubmissionStatus::Submitted);

        // Kind acts as a namespace: a report id is invisible to projects.
        assert!(store
            .get_submission(SubmissionKind::Project, created.id)
            .await
            .unwrap()
            .is_none());

        let updated = store
            .update_submission(
                SubmissionKind::Report,
                created.id,
                SubmissionChanges {
                    status: Some(SubmissionStatus::Approved),
                    feedback: Some("solid work".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, SubmissionStatus::Approved);
        assert_eq!(updated.owner_id, UserId(9));

        assert!(store
            .delete_submission(SubmissionKind::Report, created.id)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_question_requires_existing_test() {
        let store = MemStore::new();
        let missing = store
            .insert_question(NewQuestion {
                test_id: 999,
                text: "q".to_string(),
                kind: QuestionKind::Open,
                options: None,
                correct_answer: None,
                file_url: None,
                file_type: None,
            })
            .await;
        assert!(missing.is_err());
    }

    #[tokio::test]
    async fn test_deleting_test_cascades_questions() {
        let store = MemStore::new();
        let test = store.insert_test(new_test()).await.unwrap();
        let question = store
            .insert_question(NewQuestion {
                test_id: test.id,
                text: "q".to_string(),
                kind: QuestionKind::Qcm,
                options: Some(vec!["a".to_string(), "b".to_string()]),
                correct_answer: Some("a".to_string()),
                file_url: None,
                file_type: None,
            })
            .await
            .unwrap();

        assert!(store.delete_test(test.id).await.unwrap());
        assert!(store.get_question(question.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_download_counter_increments_by_one() {
        let store = MemStore::new();
        let resource = store.insert_resource(new_resource()).await.unwrap();
        assert_eq!(resource.download_count, 0);

        let count = store
            .increment_download_count(resource.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(count, 1);
        assert!(store.increment_download_count(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_increments_do_not_lose_updates() {
        let store = Arc::new(MemStore::new());
        let resource = store.insert_resource(new_resource()).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..50 {
            let store = store.clone();
            let id = resource.id;
            handles.push(tokio::spawn(async move {
                store.increment_download_count(id).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let reloaded = store.get_resource(resource.id).await.unwrap().unwrap();
        assert_eq!(reloaded.download_count, 50);
    }
}
