//! Actions and resource classes the policy engine rules over.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An operation an actor attempts on a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// List the whole collection.
    ViewAny,
    /// Read a single instance.
    View,
    Create,
    Update,
    Delete,
    /// Fetch the file behind an instance.
    Download,
}

impl Action {
    /// Instance-level actions need a snapshot; checking them without one
    /// fails closed in the engine.
    pub fn requires_snapshot(&self) -> bool {
        matches!(self, Self::View | Self::Update | Self::Delete | Self::Download)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ViewAny => "view_any",
            Self::View => "view",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Download => "download",
        }
    }

    pub fn all() -> [Action; 6] {
        [
            Self::ViewAny,
            Self::View,
            Self::Create,
            Self::Update,
            Self::Delete,
            Self::Download,
        ]
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The resource classes governed by the rule table.
///
/// Projects and reports share the [`crate::domain::Submission`] shape but
/// occupy distinct rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Project,
    Report,
    Test,
    Question,
    Resource,
    TestResult,
    User,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Report => "report",
            Self::Test => "test",
            Self::Question => "question",
            Self::Resource => "resource",
            Self::TestResult => "test_result",
            Self::User => "user",
        }
    }

    pub fn all() -> [ResourceKind; 7] {
        [
            Self::Project,
            Self::Report,
            Self::Test,
            Self::Question,
            Self::Resource,
            Self::TestResult,
            Self::User,
        ]
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
