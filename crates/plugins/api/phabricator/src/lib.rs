//! Phabricator destination tracker for remaim.
//!
//! Talks to the Conduit API to look up projects, users and statuses, to
//! upload files and to create or update Maniphest tasks.

mod client;
mod types;

pub use client::ConduitClient;
pub use types::*;
