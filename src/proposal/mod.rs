//! Proposal module
//!
//! Change proposals (moderation requests), the queue that stores them and
//! the search used by moderators to find them.

mod models;
mod search;
mod store;

pub use models::*;
pub use search::ProposalFilter;
pub use store::{InMemoryProposalStore, ProposalStore};
