pub mod comment;
pub mod invitation;
pub mod organization;
pub mod ticket;
pub mod user;

pub use comment::{Comment, CommentPatch, CommentThread, NewComment};
pub use invitation::{Invitation, InvitationState, NewInvitation};
pub use organization::{NewOrganization, Organization, OrganizationSummary};
pub use ticket::{
    NewTicket, Ticket, TicketAssignee, TicketPatch, TicketPriority, TicketStatus, TicketView,
};
pub use user::{normalize_email, NewUser, Role, User, UserSummary};
