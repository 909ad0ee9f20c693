//! External collaborators driven alongside the relay: the issue tracker

pub mod bridge;
pub mod mantis;

pub use bridge::TicketBridge;
pub use mantis::{IssueTemplates, IssueTracker, MantisClient};
