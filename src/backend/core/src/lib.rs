//! # Mentora Core
//!
//! Role-gated content management backend for mentorship programs.
//!
//! ## Architecture
//!
//! - **Policy Engine**: Pure, declarative per-resource authorization rules
//! - **Ownership Gate**: The shared owner/status predicate behind submission mutation
//! - **Statistics**: Pure aggregation over already-authorized collections
//! - **Store**: PostgreSQL (sqlx) and in-memory (DashMap) persistence behind one trait
//! - **API**: Axum handlers that check policy first, then touch data
//! - **Middleware**: Bearer-token authentication that parses the role claim once
//! - **Telemetry**: Structured JSON/pretty logging via tracing

pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod middleware;
pub mod policy;
pub mod stats;
pub mod store;
pub mod telemetry;

pub use error::{ErrorCode, MentoraError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::api::{build_router, ApiResponse, AppState};
    pub use crate::domain::{
        Actor, Question, QuestionKind, ResourceDoc, Role, Submission, SubmissionKind,
        SubmissionStatus, Test, TestKind, TestResult, UserAccount, UserId,
    };
    pub use crate::error::{ErrorCode, MentoraError, Result};
    pub use crate::middleware::{AuthLayer, Claims};
    pub use crate::policy::{
        can_owner_mutate, Action, Decision, DenyReason, PolicyEngine, PolicyError, ResourceKind,
        Snapshot, SubmissionUpdateScope,
    };
    pub use crate::stats::{resource_stats, submission_stats, ResourceStats, SubmissionStats};
    pub use crate::store::{MemStore, PgStore, Store};
}
