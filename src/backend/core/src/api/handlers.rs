//! API request handlers.
//!
//! All handlers follow the same shape: extract the authenticated actor,
//! ask the policy engine, then run the data operation. Errors propagate
//! as `MentoraError` and map to HTTP status codes via `IntoResponse`.
//! Side effects (status changes, the download counter) run strictly
//! after an `Allow`.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ApiResponse, AppState};
use crate::domain::{
    Actor, Question, QuestionKind, ResourceDoc, Role, Submission, SubmissionKind,
    SubmissionStatus, Test, TestKind, TestResult, UserAccount, UserId,
};
use crate::error::MentoraError;
use crate::policy::{Action, ResourceKind, Snapshot, SubmissionUpdateScope};
use crate::stats::{resource_stats, submission_stats, ResourceStats, SubmissionStats};
use crate::store::{
    NewQuestion, NewResource, NewSubmission, NewTest, NewTestResult, QuestionChanges,
    ResourceChanges, SubmissionChanges, TestChanges, TestResultChanges, UserChanges,
};

// ═══════════════════════════════════════════════════════════════════════════════
// Health Check
// ═══════════════════════════════════════════════════════════════════════════════

pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Submissions (shared by projects and reports)
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Deserialize)]
pub struct CreateSubmissionRequest {
    pub title: String,
    pub description: Option<String>,
    pub file_url: String,
    pub file_type: String,
}

#[derive(Deserialize)]
pub struct UpdateSubmissionRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub file_url: Option<String>,
    pub file_type: Option<String>,
    pub status: Option<SubmissionStatus>,
    pub feedback: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: SubmissionStatus,
    pub feedback: Option<String>,
}

#[derive(Serialize)]
pub struct SubmissionListResponse {
    pub items: Vec<Submission>,
    pub stats: SubmissionStats,
}

/// File reference handed out after a download is authorized. Streaming
/// the bytes belongs to the file storage frontend, not this service.
#[derive(Serialize)]
pub struct DownloadResponse {
    pub file_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_count: Option<i64>,
}

fn policy_kind(kind: SubmissionKind) -> ResourceKind {
    match kind {
        SubmissionKind::Project => ResourceKind::Project,
        SubmissionKind::Report => ResourceKind::Report,
    }
}

fn entity_name(kind: SubmissionKind) -> &'static str {
    match kind {
        SubmissionKind::Project => "Project",
        SubmissionKind::Report => "Report",
    }
}

async fn load_submission(
    state: &AppState,
    kind: SubmissionKind,
    id: i64,
) -> Result<Submission, MentoraError> {
    state
        .store
        .get_submission(kind, id)
        .await?
        .ok_or_else(|| MentoraError::not_found(entity_name(kind), id))
}

async fn list_submissions_inner(
    state: AppState,
    actor: Actor,
    kind: SubmissionKind,
) -> Result<Json<ApiResponse<SubmissionListResponse>>, MentoraError> {
    state
        .policy
        .enforce(&actor, Action::ViewAny, policy_kind(kind), None)?;

    let items = state.store.list_submissions(kind).await?;
    let stats = submission_stats(&items, Utc::now());

    Ok(Json(ApiResponse::success(SubmissionListResponse {
        items,
        stats,
    })))
}

/// Staff see the whole collection, everyone else their own submissions.
async fn my_submissions_inner(
    state: AppState,
    actor: Actor,
    kind: SubmissionKind,
) -> Result<Json<ApiResponse<SubmissionListResponse>>, MentoraError> {
    if actor.role.is_none() {
        return Err(MentoraError::forbidden(
            "You do not have permission to perform this action",
        ));
    }

    let items = if state.policy.can_view_any(&actor, policy_kind(kind)).is_allowed() {
        state.store.list_submissions(kind).await?
    } else {
        state
            .store
            .list_submissions_for_owner(kind, actor.id)
            .await?
    };
    let stats = submission_stats(&items, Utc::now());

    Ok(Json(ApiResponse::success(SubmissionListResponse {
        items,
        stats,
    })))
}

async fn create_submission_inner(
    state: AppState,
    actor: Actor,
    kind: SubmissionKind,
    req: CreateSubmissionRequest,
) -> Result<(StatusCode, Json<ApiResponse<Submission>>), MentoraError> {
    state
        .policy
        .enforce(&actor, Action::Create, policy_kind(kind), None)?;

    if req.title.trim().is_empty() {
        return Err(MentoraError::validation("title must not be empty"));
    }
    if req.file_url.trim().is_empty() {
        return Err(MentoraError::validation("file_url must not be empty"));
    }

    let submission = state
        .store
        .insert_submission(NewSubmission {
            kind,
            title: req.title,
            description: req.description,
            file_url: req.file_url,
            file_type: req.file_type,
            owner_id: actor.id,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(submission))))
}

async fn get_submission_inner(
    state: AppState,
    actor: Actor,
    kind: SubmissionKind,
    id: i64,
) -> Result<Json<ApiResponse<Submission>>, MentoraError> {
    let submission = load_submission(&state, kind, id).await?;
    state.policy.enforce(
        &actor,
        Action::View,
        policy_kind(kind),
        Some(Snapshot::Submission(&submission)),
    )?;

    Ok(Json(ApiResponse::success(submission)))
}

async fn update_submission_inner(
    state: AppState,
    actor: Actor,
    kind: SubmissionKind,
    id: i64,
    req: UpdateSubmissionRequest,
) -> Result<Json<ApiResponse<Submission>>, MentoraError> {
    let submission = load_submission(&state, kind, id).await?;

    let scope = state
        .policy
        .submission_update_scope(&actor, &submission)
        .ok_or_else(|| {
            MentoraError::forbidden("You do not have permission to perform this action")
        })?;

    let mut changes = SubmissionChanges {
        title: req.title,
        description: req.description,
        file_url: req.file_url,
        file_type: req.file_type,
        status: req.status,
        feedback: req.feedback,
    };
    // Narrow to what the scope grants: review fields stay untouched for
    // owner rework.
    if scope == SubmissionUpdateScope::Content
        && (changes.status.is_some() || changes.feedback.is_some())
    {
        debug!(actor_id = %actor.id, submission_id = id, "dropping review fields outside scope");
        changes.status = None;
        changes.feedback = None;
    }

    let updated = state
        .store
        .update_submission(kind, id, changes)
        .await?
        .ok_or_else(|| MentoraError::not_found(entity_name(kind), id))?;

    Ok(Json(ApiResponse::success(updated)))
}

async fn update_submission_status_inner(
    state: AppState,
    actor: Actor,
    kind: SubmissionKind,
    id: i64,
    req: UpdateStatusRequest,
) -> Result<Json<ApiResponse<Submission>>, MentoraError> {
    if state.policy.can_change_status(&actor).is_denied() {
        return Err(MentoraError::forbidden(
            "You do not have permission to perform this action",
        ));
    }
    let _ = load_submission(&state, kind, id).await?;

    let updated = state
        .store
        .update_submission(
            kind,
            id,
            SubmissionChanges {
                status: Some(req.status),
                feedback: req.feedback,
                ..Default::default()
            },
        )
        .await?
        .ok_or_else(|| MentoraError::not_found(entity_name(kind), id))?;

    Ok(Json(ApiResponse::success(updated)))
}

async fn delete_submission_inner(
    state: AppState,
    actor: Actor,
    kind: SubmissionKind,
    id: i64,
) -> Result<Json<ApiResponse<serde_json::Value>>, MentoraError> {
    let submission = load_submission(&state, kind, id).await?;
    state.policy.enforce(
        &actor,
        Action::Delete,
        policy_kind(kind),
        Some(Snapshot::Submission(&submission)),
    )?;

    state.store.delete_submission(kind, id).await?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "id": id,
        "deleted": true
    }))))
}

async fn download_submission_inner(
    state: AppState,
    actor: Actor,
    kind: SubmissionKind,
    id: i64,
) -> Result<Json<ApiResponse<DownloadResponse>>, MentoraError> {
    let submission = load_submission(&state, kind, id).await?;
    state.policy.enforce(
        &actor,
        Action::Download,
        policy_kind(kind),
        Some(Snapshot::Submission(&submission)),
    )?;

    Ok(Json(ApiResponse::success(DownloadResponse {
        file_url: submission.file_url,
        download_count: None,
    })))
}

// ─────────────────────────────────────────────────────────────────────────────
// Project routes
// ─────────────────────────────────────────────────────────────────────────────

pub async fn list_projects(
    State(state): State<AppState>,
    actor: Actor,
) -> Result<Json<ApiResponse<SubmissionListResponse>>, MentoraError> {
    list_submissions_inner(state, actor, SubmissionKind::Project).await
}

pub async fn my_projects(
    State(state): State<AppState>,
    actor: Actor,
) -> Result<Json<ApiResponse<SubmissionListResponse>>, MentoraError> {
    my_submissions_inner(state, actor, SubmissionKind::Project).await
}

pub async fn create_project(
    State(state): State<AppState>,
    actor: Actor,
    Json(req): Json<CreateSubmissionRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Submission>>), MentoraError> {
    create_submission_inner(state, actor, SubmissionKind::Project, req).await
}

pub async fn get_project(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Submission>>, MentoraError> {
    get_submission_inner(state, actor, SubmissionKind::Project, id).await
}

pub async fn update_project(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
    Json(req): Json<UpdateSubmissionRequest>,
) -> Result<Json<ApiResponse<Submission>>, MentoraError> {
    update_submission_inner(state, actor, SubmissionKind::Project, id, req).await
}

pub async fn update_project_status(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<ApiResponse<Submission>>, MentoraError> {
    update_submission_status_inner(state, actor, SubmissionKind::Project, id, req).await
}

pub async fn delete_project(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<serde_json::Value>>, MentoraError> {
    delete_submission_inner(state, actor, SubmissionKind::Project, id).await
}

pub async fn download_project(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<DownloadResponse>>, MentoraError> {
    download_submission_inner(state, actor, SubmissionKind::Project, id).await
}

// ─────────────────────────────────────────────────────────────────────────────
// Report routes
// ─────────────────────────────────────────────────────────────────────────────

pub async fn list_reports(
    State(state): State<AppState>,
    actor: Actor,
) -> Result<Json<ApiResponse<SubmissionListResponse>>, MentoraError> {
    list_submissions_inner(state, actor, SubmissionKind::Report).await
}

pub async fn my_reports(
    State(state): State<AppState>,
    actor: Actor,
) -> Result<Json<ApiResponse<SubmissionListResponse>>, MentoraError> {
    my_submissions_inner(state, actor, SubmissionKind::Report).await
}

pub async fn create_report(
    State(state): State<AppState>,
    actor: Actor,
    Json(req): Json<CreateSubmissionRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Submission>>), MentoraError> {
    create_submission_inner(state, actor, SubmissionKind::Report, req).await
}

pub async fn get_report(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Submission>>, MentoraError> {
    get_submission_inner(state, actor, SubmissionKind::Report, id).await
}

pub async fn update_report(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
    Json(req): Json<UpdateSubmissionRequest>,
) -> Result<Json<ApiResponse<Submission>>, MentoraError> {
    update_submission_inner(state, actor, SubmissionKind::Report, id, req).await
}

pub async fn update_report_status(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<ApiResponse<Submission>>, MentoraError> {
    update_submission_status_inner(state, actor, SubmissionKind::Report, id, req).await
}

pub async fn delete_report(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<serde_json::Value>>, MentoraError> {
    delete_submission_inner(state, actor, SubmissionKind::Report, id).await
}

pub async fn download_report(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<DownloadResponse>>, MentoraError> {
    download_submission_inner(state, actor, SubmissionKind::Report, id).await
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Deserialize)]
pub struct CreateTestRequest {
    pub title: String,
    pub description: Option<String>,
    pub kind: TestKind,
    pub file_url: Option<String>,
    pub file_type: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateTestRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub kind: Option<TestKind>,
    pub file_url: Option<String>,
    pub file_type: Option<String>,
}

async fn load_test(state: &AppState, id: i64) -> Result<Test, MentoraError> {
    state
        .store
        .get_test(id)
        .await?
        .ok_or_else(|| MentoraError::not_found("Test", id))
}

pub async fn list_tests(
    State(state): State<AppState>,
    actor: Actor,
) -> Result<Json<ApiResponse<Vec<Test>>>, MentoraError> {
    state
        .policy
        .enforce(&actor, Action::ViewAny, ResourceKind::Test, None)?;

    let tests = state.store.list_tests().await?;
    Ok(Json(ApiResponse::success(tests)))
}

pub async fn create_test(
    State(state): State<AppState>,
    actor: Actor,
    Json(req): Json<CreateTestRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Test>>), MentoraError> {
    state
        .policy
        .enforce(&actor, Action::Create, ResourceKind::Test, None)?;

    if req.title.trim().is_empty() {
        return Err(MentoraError::validation("title must not be empty"));
    }

    let test = state
        .store
        .insert_test(NewTest {
            title: req.title,
            description: req.description,
            kind: req.kind,
            file_url: req.file_url,
            file_type: req.file_type,
            created_by: actor.id,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(test))))
}

pub async fn get_test(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Test>>, MentoraError> {
    let test = load_test(&state, id).await?;
    state
        .policy
        .enforce(&actor, Action::View, ResourceKind::Test, Some(Snapshot::Test(&test)))?;

    Ok(Json(ApiResponse::success(test)))
}

pub async fn update_test(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
    Json(req): Json<UpdateTestRequest>,
) -> Result<Json<ApiResponse<Test>>, MentoraError> {
    let test = load_test(&state, id).await?;
    state.policy.enforce(
        &actor,
        Action::Update,
        ResourceKind::Test,
        Some(Snapshot::Test(&test)),
    )?;

    let updated = state
        .store
        .update_test(
            id,
            TestChanges {
                title: req.title,
                description: req.description,
                kind: req.kind,
                file_url: req.file_url,
                file_type: req.file_type,
            },
        )
        .await?
        .ok_or_else(|| MentoraError::not_found("Test", id))?;

    Ok(Json(ApiResponse::success(updated)))
}

pub async fn delete_test(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<serde_json::Value>>, MentoraError> {
    let test = load_test(&state, id).await?;
    state.policy.enforce(
        &actor,
        Action::Delete,
        ResourceKind::Test,
        Some(Snapshot::Test(&test)),
    )?;

    state.store.delete_test(id).await?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "id": id,
        "deleted": true
    }))))
}

pub async fn download_test(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<DownloadResponse>>, MentoraError> {
    let test = load_test(&state, id).await?;
    state.policy.enforce(
        &actor,
        Action::Download,
        ResourceKind::Test,
        Some(Snapshot::Test(&test)),
    )?;

    let file_url = test
        .file_url
        .ok_or_else(|| MentoraError::not_found("Test file", id))?;

    Ok(Json(ApiResponse::success(DownloadResponse {
        file_url,
        download_count: None,
    })))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Questions
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Deserialize)]
pub struct CreateQuestionRequest {
    pub test_id: i64,
    pub text: String,
    pub kind: QuestionKind,
    pub options: Option<Vec<String>>,
    pub correct_answer: Option<String>,
    pub file_url: Option<String>,
    pub file_type: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateQuestionRequest {
    pub text: Option<String>,
    pub kind: Option<QuestionKind>,
    pub options: Option<Vec<String>>,
    pub correct_answer: Option<String>,
    pub file_url: Option<String>,
    pub file_type: Option<String>,
}

#[derive(Deserialize)]
pub struct ListQuestionsQuery {
    pub test_id: Option<i64>,
}

async fn load_question(state: &AppState, id: i64) -> Result<Question, MentoraError> {
    state
        .store
        .get_question(id)
        .await?
        .ok_or_else(|| MentoraError::not_found("Question", id))
}

pub async fn list_questions(
    State(state): State<AppState>,
    actor: Actor,
    Query(query): Query<ListQuestionsQuery>,
) -> Result<Json<ApiResponse<Vec<Question>>>, MentoraError> {
    state
        .policy
        .enforce(&actor, Action::ViewAny, ResourceKind::Question, None)?;

    let questions = state.store.list_questions(query.test_id).await?;
    Ok(Json(ApiResponse::success(questions)))
}

pub async fn create_question(
    State(state): State<AppState>,
    actor: Actor,
    Json(req): Json<CreateQuestionRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Question>>), MentoraError> {
    state
        .policy
        .enforce(&actor, Action::Create, ResourceKind::Question, None)?;

    if req.text.trim().is_empty() {
        return Err(MentoraError::validation("text must not be empty"));
    }

    let question = state
        .store
        .insert_question(NewQuestion {
            test_id: req.test_id,
            text: req.text,
            kind: req.kind,
            options: req.options,
            correct_answer: req.correct_answer,
            file_url: req.file_url,
            file_type: req.file_type,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(question))))
}

pub async fn get_question(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Question>>, MentoraError> {
    let question = load_question(&state, id).await?;
    state.policy.enforce(
        &actor,
        Action::View,
        ResourceKind::Question,
        Some(Snapshot::Question(&question)),
    )?;

    Ok(Json(ApiResponse::success(question)))
}

pub async fn update_question(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
    Json(req): Json<UpdateQuestionRequest>,
) -> Result<Json<ApiResponse<Question>>, MentoraError> {
    let question = load_question(&state, id).await?;
    state.policy.enforce(
        &actor,
        Action::Update,
        ResourceKind::Question,
        Some(Snapshot::Question(&question)),
    )?;

    let updated = state
        .store
        .update_question(
            id,
            QuestionChanges {
                text: req.text,
                kind: req.kind,
                options: req.options,
                correct_answer: req.correct_answer,
                file_url: req.file_url,
                file_type: req.file_type,
            },
        )
        .await?
        .ok_or_else(|| MentoraError::not_found("Question", id))?;

    Ok(Json(ApiResponse::success(updated)))
}

pub async fn delete_question(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<serde_json::Value>>, MentoraError> {
    let question = load_question(&state, id).await?;
    state.policy.enforce(
        &actor,
        Action::Delete,
        ResourceKind::Question,
        Some(Snapshot::Question(&question)),
    )?;

    state.store.delete_question(id).await?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "id": id,
        "deleted": true
    }))))
}

pub async fn download_question(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<DownloadResponse>>, MentoraError> {
    let question = load_question(&state, id).await?;
    state.policy.enforce(
        &actor,
        Action::Download,
        ResourceKind::Question,
        Some(Snapshot::Question(&question)),
    )?;

    let file_url = question
        .file_url
        .ok_or_else(|| MentoraError::not_found("Question file", id))?;

    Ok(Json(ApiResponse::success(DownloadResponse {
        file_url,
        download_count: None,
    })))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Resources
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Deserialize)]
pub struct CreateResourceRequest {
    pub title: String,
    pub description: Option<String>,
    pub file_url: String,
    pub file_type: String,
    #[serde(default)]
    pub is_published: bool,
}

#[derive(Deserialize)]
pub struct UpdateResourceRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub file_url: Option<String>,
    pub file_type: Option<String>,
    pub is_published: Option<bool>,
}

#[derive(Serialize)]
pub struct ResourceListResponse {
    pub items: Vec<ResourceDoc>,
    pub stats: ResourceStats,
}

async fn load_resource(state: &AppState, id: i64) -> Result<ResourceDoc, MentoraError> {
    state
        .store
        .get_resource(id)
        .await?
        .ok_or_else(|| MentoraError::not_found("Resource", id))
}

pub async fn list_resources(
    State(state): State<AppState>,
    actor: Actor,
) -> Result<Json<ApiResponse<ResourceListResponse>>, MentoraError> {
    state
        .policy
        .enforce(&actor, Action::ViewAny, ResourceKind::Resource, None)?;

    let items = state.store.list_resources().await?;
    let stats = resource_stats(&items);

    Ok(Json(ApiResponse::success(ResourceListResponse {
        items,
        stats,
    })))
}

pub async fn create_resource(
    State(state): State<AppState>,
    actor: Actor,
    Json(req): Json<CreateResourceRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ResourceDoc>>), MentoraError> {
    state
        .policy
        .enforce(&actor, Action::Create, ResourceKind::Resource, None)?;

    if req.title.trim().is_empty() {
        return Err(MentoraError::validation("title must not be empty"));
    }
    if req.file_url.trim().is_empty() {
        return Err(MentoraError::validation("file_url must not be empty"));
    }

    let resource = state
        .store
        .insert_resource(NewResource {
            title: req.title,
            description: req.description,
            file_url: req.file_url,
            file_type: req.file_type,
            uploaded_by: actor.id,
            is_published: req.is_published,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(resource))))
}

pub async fn get_resource(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<ResourceDoc>>, MentoraError> {
    let resource = load_resource(&state, id).await?;
    state.policy.enforce(
        &actor,
        Action::View,
        ResourceKind::Resource,
        Some(Snapshot::Resource(&resource)),
    )?;

    Ok(Json(ApiResponse::success(resource)))
}

pub async fn update_resource(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
    Json(req): Json<UpdateResourceRequest>,
) -> Result<Json<ApiResponse<ResourceDoc>>, MentoraError> {
    let resource = load_resource(&state, id).await?;
    state.policy.enforce(
        &actor,
        Action::Update,
        ResourceKind::Resource,
        Some(Snapshot::Resource(&resource)),
    )?;

    let updated = state
        .store
        .update_resource(
            id,
            ResourceChanges {
                title: req.title,
                description: req.description,
                file_url: req.file_url,
                file_type: req.file_type,
                is_published: req.is_published,
            },
        )
        .await?
        .ok_or_else(|| MentoraError::not_found("Resource", id))?;

    Ok(Json(ApiResponse::success(updated)))
}

pub async fn delete_resource(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<serde_json::Value>>, MentoraError> {
    let resource = load_resource(&state, id).await?;
    state.policy.enforce(
        &actor,
        Action::Delete,
        ResourceKind::Resource,
        Some(Snapshot::Resource(&resource)),
    )?;

    state.store.delete_resource(id).await?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "id": id,
        "deleted": true
    }))))
}

/// Authorize, then bump the counter through the store's atomic
/// increment. The counter moves exactly once per successful download and
/// never through a read-then-write.
pub async fn download_resource(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<DownloadResponse>>, MentoraError> {
    let resource = load_resource(&state, id).await?;
    state.policy.enforce(
        &actor,
        Action::Download,
        ResourceKind::Resource,
        Some(Snapshot::Resource(&resource)),
    )?;

    let download_count = state
        .store
        .increment_download_count(id)
        .await?
        .ok_or_else(|| MentoraError::not_found("Resource", id))?;

    Ok(Json(ApiResponse::success(DownloadResponse {
        file_url: resource.file_url,
        download_count: Some(download_count),
    })))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Test results
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Deserialize)]
pub struct CreateTestResultRequest {
    pub user_id: i64,
    pub test_id: i64,
    pub score: Option<f64>,
    pub file_path: Option<String>,
    pub file_type: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
pub struct UpdateTestResultRequest {
    pub score: Option<f64>,
    pub file_path: Option<String>,
    pub file_type: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
}

async fn load_test_result(state: &AppState, id: i64) -> Result<TestResult, MentoraError> {
    state
        .store
        .get_test_result(id)
        .await?
        .ok_or_else(|| MentoraError::not_found("Test result", id))
}

/// Admins list every result; anyone else with a recognized role gets
/// their own.
pub async fn list_test_results(
    State(state): State<AppState>,
    actor: Actor,
) -> Result<Json<ApiResponse<Vec<TestResult>>>, MentoraError> {
    if actor.role.is_none() {
        return Err(MentoraError::forbidden(
            "You do not have permission to perform this action",
        ));
    }

    let results = if state
        .policy
        .can_view_any(&actor, ResourceKind::TestResult)
        .is_allowed()
    {
        state.store.list_test_results().await?
    } else {
        state.store.list_test_results_for_user(actor.id).await?
    };

    Ok(Json(ApiResponse::success(results)))
}

pub async fn create_test_result(
    State(state): State<AppState>,
    actor: Actor,
    Json(req): Json<CreateTestResultRequest>,
) -> Result<(StatusCode, Json<ApiResponse<TestResult>>), MentoraError> {
    state
        .policy
        .enforce(&actor, Action::Create, ResourceKind::TestResult, None)?;

    let result = state
        .store
        .insert_test_result(NewTestResult {
            user_id: UserId(req.user_id),
            test_id: req.test_id,
            score: req.score,
            file_path: req.file_path,
            file_type: req.file_type,
            completed_at: req.completed_at,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(result))))
}

pub async fn get_test_result(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<TestResult>>, MentoraError> {
    let result = load_test_result(&state, id).await?;
    state.policy.enforce(
        &actor,
        Action::View,
        ResourceKind::TestResult,
        Some(Snapshot::TestResult(&result)),
    )?;

    Ok(Json(ApiResponse::success(result)))
}

pub async fn update_test_result(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
    Json(req): Json<UpdateTestResultRequest>,
) -> Result<Json<ApiResponse<TestResult>>, MentoraError> {
    let result = load_test_result(&state, id).await?;
    state.policy.enforce(
        &actor,
        Action::Update,
        ResourceKind::TestResult,
        Some(Snapshot::TestResult(&result)),
    )?;

    let updated = state
        .store
        .update_test_result(
            id,
            TestResultChanges {
                score: req.score,
                file_path: req.file_path,
                file_type: req.file_type,
                completed_at: req.completed_at,
            },
        )
        .await?
        .ok_or_else(|| MentoraError::not_found("Test result", id))?;

    Ok(Json(ApiResponse::success(updated)))
}

pub async fn download_test_result(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<DownloadResponse>>, MentoraError> {
    let result = load_test_result(&state, id).await?;
    state.policy.enforce(
        &actor,
        Action::Download,
        ResourceKind::TestResult,
        Some(Snapshot::TestResult(&result)),
    )?;

    let file_url = result
        .file_path
        .ok_or_else(|| MentoraError::not_found("Test result file", id))?;

    Ok(Json(ApiResponse::success(DownloadResponse {
        file_url,
        download_count: None,
    })))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Users
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Deserialize)]
pub struct UpdateUserRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub verified: Option<bool>,
}

async fn load_user(state: &AppState, id: UserId) -> Result<UserAccount, MentoraError> {
    state
        .store
        .get_user(id)
        .await?
        .ok_or_else(|| MentoraError::not_found("User", id))
}

pub async fn list_users(
    State(state): State<AppState>,
    actor: Actor,
) -> Result<Json<ApiResponse<Vec<UserAccount>>>, MentoraError> {
    state
        .policy
        .enforce(&actor, Action::ViewAny, ResourceKind::User, None)?;

    let users = state.store.list_users().await?;
    Ok(Json(ApiResponse::success(users)))
}

pub async fn me(
    State(state): State<AppState>,
    actor: Actor,
) -> Result<Json<ApiResponse<UserAccount>>, MentoraError> {
    let account = load_user(&state, actor.id).await?;
    Ok(Json(ApiResponse::success(account)))
}

pub async fn get_user(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<UserAccount>>, MentoraError> {
    let account = load_user(&state, UserId(id)).await?;
    state.policy.enforce(
        &actor,
        Action::View,
        ResourceKind::User,
        Some(Snapshot::User(&account)),
    )?;

    Ok(Json(ApiResponse::success(account)))
}

pub async fn update_user(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<ApiResponse<UserAccount>>, MentoraError> {
    let account = load_user(&state, UserId(id)).await?;
    state.policy.enforce(
        &actor,
        Action::Update,
        ResourceKind::User,
        Some(Snapshot::User(&account)),
    )?;

    let mut changes = UserChanges {
        first_name: req.first_name,
        last_name: req.last_name,
        email: req.email,
        role: req.role,
        verified: req.verified,
    };
    // Role and verification flags are admin territory; self-updates keep
    // their profile fields only.
    if !actor.is_admin() && (changes.role.is_some() || changes.verified.is_some()) {
        debug!(actor_id = %actor.id, target = id, "dropping admin-only user fields");
        changes.role = None;
        changes.verified = None;
    }

    let updated = state
        .store
        .update_user(UserId(id), changes)
        .await?
        .ok_or_else(|| MentoraError::not_found("User", id))?;

    Ok(Json(ApiResponse::success(updated)))
}

pub async fn delete_user(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<serde_json::Value>>, MentoraError> {
    let account = load_user(&state, UserId(id)).await?;
    state.policy.enforce(
        &actor,
        Action::Delete,
        ResourceKind::User,
        Some(Snapshot::User(&account)),
    )?;

    state.store.delete_user(UserId(id)).await?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "id": id,
        "deleted": true
    }))))
}
