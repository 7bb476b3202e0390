//! The declarative rule table.
//!
//! One [`Grant`] per `(resource, action)` cell. The engine interprets
//! grants; nothing here inspects an actor, which keeps the table a plain
//! data structure that tests can sweep exhaustively.

use crate::domain::Role;

use super::action::{Action, ResourceKind};

/// How a single cell of the rule table grants access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Grant {
    /// Any actor with a recognized role.
    AnyRole,
    /// The role must be in the listed set.
    Roles(&'static [Role]),
    /// Listed roles, or the actor owns the snapshot.
    RolesOrOwner(&'static [Role]),
    /// Listed roles, or the owner while the submission is still
    /// `Submitted` (the shared gate).
    RolesOrGatedOwner(&'static [Role]),
    /// Resolved by re-evaluating the `View` cell of the same resource.
    SameAsView,
    /// Never granted through the engine.
    Never,
}

const ADMIN: &[Role] = &[Role::Admin];
const ADMIN_MENTOR: &[Role] = &[Role::Admin, Role::Mentor];
const PARTICIPANT: &[Role] = &[Role::Participant];
const EVERY_ROLE: &[Role] = &[Role::Admin, Role::Mentor, Role::Participant];

/// Look up the grant for a rule-table cell.
pub(crate) const fn grant_for(kind: ResourceKind, action: Action) -> Grant {
    use Action::*;
    use ResourceKind::*;

    match (kind, action) {
        (Project, ViewAny) => Grant::Roles(ADMIN_MENTOR),
        (Project, View) => Grant::RolesOrOwner(ADMIN_MENTOR),
        (Project, Create) => Grant::Roles(ADMIN),
        (Project, Update) | (Project, Delete) => Grant::RolesOrGatedOwner(ADMIN),
        (Project, Download) => Grant::SameAsView,

        (Report, ViewAny) => Grant::Roles(ADMIN_MENTOR),
        // Broader than Project on purpose: every recognized role may read
        // a report. The redundant owner clause is kept verbatim.
        (Report, View) => Grant::RolesOrOwner(EVERY_ROLE),
        (Report, Create) => Grant::Roles(PARTICIPANT),
        (Report, Update) | (Report, Delete) => Grant::RolesOrGatedOwner(ADMIN),
        (Report, Download) => Grant::SameAsView,

        (Test, ViewAny) | (Test, View) | (Test, Download) => Grant::AnyRole,
        (Test, Create) | (Test, Update) | (Test, Delete) => Grant::Roles(ADMIN),

        (Question, ViewAny) | (Question, View) | (Question, Create) | (Question, Update) => {
            Grant::Roles(ADMIN_MENTOR)
        }
        (Question, Delete) => Grant::Roles(ADMIN),
        (Question, Download) => Grant::SameAsView,

        (Resource, ViewAny) => Grant::Roles(EVERY_ROLE),
        (Resource, View) => Grant::AnyRole,
        (Resource, Create) | (Resource, Update) | (Resource, Delete) => Grant::Roles(ADMIN),
        (Resource, Download) => Grant::SameAsView,

        (TestResult, ViewAny) => Grant::Roles(ADMIN),
        (TestResult, View) | (TestResult, Download) => Grant::RolesOrOwner(ADMIN),
        (TestResult, Create) | (TestResult, Update) | (TestResult, Delete) => Grant::Roles(ADMIN),

        // Account creation happens through registration, not the engine.
        (User, Create) | (User, Download) => Grant::Never,
        (User, ViewAny) | (User, Delete) => Grant::Roles(ADMIN),
        (User, View) | (User, Update) => Grant::RolesOrOwner(ADMIN),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_cell_is_defined() {
        // The match above is exhaustive by construction; this sweep
        // guards against a refactor swapping it for a lossy lookup.
        for kind in ResourceKind::all() {
            for action in Action::all() {
                let _ = grant_for(kind, action);
            }
        }
    }

    #[test]
    fn test_admin_present_in_every_mutation_cell() {
        for kind in ResourceKind::all() {
            for action in [Action::Update, Action::Delete] {
                match grant_for(kind, action) {
                    Grant::Roles(roles)
                    | Grant::RolesOrOwner(roles)
                    | Grant::RolesOrGatedOwner(roles) => {
                        assert!(
                            roles.contains(&Role::Admin),
                            "{kind}/{action} does not grant Admin"
                        );
                    }
                    other => panic!("{kind}/{action} unexpected grant {other:?}"),
                }
            }
        }
    }

    #[test]
    fn test_report_view_is_broader_than_project_view() {
        assert_eq!(grant_for(ResourceKind::Project, Action::View), Grant::RolesOrOwner(ADMIN_MENTOR));
        assert_eq!(grant_for(ResourceKind::Report, Action::View), Grant::RolesOrOwner(EVERY_ROLE));
    }

    #[test]
    fn test_downloads_delegate_to_view_where_expected() {
        for kind in [
            ResourceKind::Project,
            ResourceKind::Report,
            ResourceKind::Question,
            ResourceKind::Resource,
        ] {
            assert_eq!(grant_for(kind, Action::Download), Grant::SameAsView);
        }
        assert_eq!(grant_for(ResourceKind::Test, Action::Download), Grant::AnyRole);
        assert_eq!(
            grant_for(ResourceKind::TestResult, Action::Download),
            Grant::RolesOrOwner(ADMIN)
        );
    }
}
