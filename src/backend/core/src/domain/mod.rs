//! Domain vocabulary: roles, lifecycle statuses, and entity models.
//!
//! Everything the policy engine and the statistics module reason about
//! lives here. All enumerations are closed; raw strings coming from the
//! wire or the database are parsed exactly once at the boundary and an
//! unrecognized value never makes it past that point.

pub mod models;
pub mod role;

pub use models::{
    Actor, Question, QuestionKind, ResourceDoc, Submission, SubmissionKind,
    SubmissionStatus, Test, TestKind, TestResult, UserAccount, UserId,
};
pub use role::{Role, UnknownRole};
