//! Access policy for the helpdesk.
//!
//! Every route describes what it wants to do as an [`Operation`], together with
//! snapshots of the rows involved, and asks [`evaluate`] for a [`Decision`].
//! Allowed reads come back with a residual filter ([`Scope`]) that the store
//! applies verbatim; the store itself never makes authorization choices.
//!
//! Cross-organization access is always reported as [`DenyReason::NotFound`] so
//! callers cannot tell a foreign row from a missing one.

mod decision;
mod evaluator;
mod filter;
mod operation;
mod principal;

pub use decision::{Decision, DenyReason, Scope};
pub use evaluator::evaluate;
pub use filter::{
    CommentFilter, InvitationFilter, TicketFilter, TicketQuery, TicketSort, UserFilter,
    MAX_PAGE_SIZE,
};
pub use operation::{AssigneeCheck, Freshness, Operation, OperationKind, ParentRef, TicketSnapshot};
pub use principal::Principal;
