//! Redmine source tracker for remaim.
//!
//! Reads projects, issues, journals and attachments through the Redmine
//! REST API, and resolves the ids found in journal details to names.

mod client;
mod types;

pub use client::{RedmineAuth, RedmineClient};
pub use types::*;
