//! Core traits, types, and error handling for remaim.
//!
//! This crate provides the foundational abstractions shared by the tracker
//! clients and the migration engine.

pub mod config;
pub mod error;
pub mod provider;
pub mod tree;
pub mod types;

pub use config::{Config, PhabricatorConfig, PriorityValue, RedmineConfig};
pub use error::{Error, Result};
pub use provider::{DestinationTracker, LabelResolver, SourceTracker};
pub use tree::build_project_tree;
pub use types::*;
