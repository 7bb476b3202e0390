//! Authorization policy engine.
//!
//! Every request is checked here before any data operation runs. The
//! engine is a pure function of `(actor, action, resource)`: it holds no
//! state, touches no clock, and performs no I/O, so it can be shared
//! freely across request tasks.
//!
//! The authoritative rule table:
//!
//! | Resource   | ViewAny        | View                    | Create       | Update               | Delete               | Download       |
//! |------------|----------------|-------------------------|--------------|----------------------|----------------------|----------------|
//! | Project    | Admin, Mentor  | Admin, Mentor, owner    | Admin        | Admin; gated owner   | Admin; gated owner   | same as View   |
//! | Report     | Admin, Mentor  | any role, owner         | Participant  | Admin; gated owner   | Admin; gated owner   | same as View   |
//! | Test       | any role       | any role                | Admin        | Admin                | Admin                | any role       |
//! | Question   | Admin, Mentor  | Admin, Mentor           | Admin, Mentor| Admin, Mentor        | Admin                | same as View   |
//! | Resource   | any role       | any role                | Admin        | Admin                | Admin                | same as View   |
//! | TestResult | Admin          | Admin, owner            | Admin        | Admin                | Admin                | Admin, owner   |
//! | User       | Admin          | Admin, self             | none         | Admin, self          | Admin                | none           |
//!
//! "Gated owner" is the shared ownership/state predicate from [`gate`]:
//! the owner may mutate only while the submission status is `Submitted`.
//! "Any role" means any of the three recognized roles; an actor whose
//! role claim failed to parse is denied everything, as is an
//! instance-level check invoked without a snapshot. Denials are values,
//! never errors.
//!
//! The Project/Report differences in `view` and `create` are intentional
//! and must not be unified.

pub mod action;
pub mod decision;
pub mod engine;
pub mod fields;
pub mod gate;
pub(crate) mod rules;
pub mod snapshot;

pub use action::{Action, ResourceKind};
pub use decision::{Decision, DenyReason};
pub use engine::{PolicyEngine, PolicyError};
pub use fields::SubmissionUpdateScope;
pub use gate::can_owner_mutate;
pub use snapshot::Snapshot;
