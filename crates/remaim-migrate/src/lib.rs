//! Migration engine for remaim.
//!
//! Turns source issues into destination tasks: duplicate detection,
//! transaction assembly, markup conversion, journal narration and the
//! interactive workflow around them. Trackers are only reached through the
//! traits in `remaim_core::provider`.

pub mod attachments;
pub mod finder;
pub mod journal;
pub mod markup;
pub mod prompt;
pub mod reconcile;
pub mod transactions;
pub mod users;
pub mod wizard;

#[cfg(test)]
mod testing;

pub use attachments::AttachmentMirror;
pub use finder::{ExistingRecordFinder, FindOutcome};
pub use journal::JournalFormatter;
pub use markup::to_remarkup;
pub use prompt::{Prompter, ScriptedPrompter, StdPrompter};
pub use reconcile::{EnumReconciler, ReconciliationState, Resolution};
pub use transactions::{AssemblyRequest, TransactionAssembler};
pub use users::UserDirectory;
pub use wizard::{MigratedIssue, MigrationReport, RunOutcome, Wizard};
