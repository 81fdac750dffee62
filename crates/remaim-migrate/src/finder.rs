//! Looking up tasks created by a previous migration of the same issue.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use remaim_core::{DestinationTracker, Issue, Result, Task};
use tracing::debug;

use crate::markup::to_remarkup;
use crate::prompt::Prompter;

static NON_ALPHANUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\p{L}\p{N}]+").expect("search key regex"));

/// Outcome of a duplicate search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FindOutcome {
    /// Update this task
    Existing(Task),
    /// Create a new task
    Absent,
    /// Leave the issue alone
    Skip,
}

pub struct ExistingRecordFinder {
    destination: Arc<dyn DestinationTracker>,
    resume: bool,
}

impl ExistingRecordFinder {
    pub fn new(destination: Arc<dyn DestinationTracker>, resume: bool) -> Self {
        Self {
            destination,
            resume,
        }
    }

    /// Full-text search key of an issue: the converted description, or the
    /// subject when there is none, with punctuation runs collapsed.
    pub fn search_key(issue: &Issue) -> String {
        let description = to_remarkup(issue.description.as_deref().unwrap_or_default());
        let text = if description.is_empty() {
            issue.subject.as_str()
        } else {
            description.as_str()
        };
        NON_ALPHANUMERIC.replace_all(text, " ").trim().to_string()
    }

    pub async fn find(
        &self,
        issue: &Issue,
        project_phid: &str,
        prompter: &mut dyn Prompter,
    ) -> Result<FindOutcome> {
        let key = Self::search_key(issue);
        if key.is_empty() {
            return Ok(FindOutcome::Absent);
        }

        let mut tasks = self.destination.search_tasks(project_phid, &key).await?;
        debug!(issue = issue.id, found = tasks.len(), "Searched for existing tasks");

        match tasks.len() {
            0 => Ok(FindOutcome::Absent),
            1 => Ok(FindOutcome::Existing(tasks.remove(0))),
            _ if self.resume => Ok(FindOutcome::Skip),
            _ => Self::choose(tasks, prompter),
        }
    }

    fn choose(mut tasks: Vec<Task>, prompter: &mut dyn Prompter) -> Result<FindOutcome> {
        prompter.say(
            "Oops, I found more than one already existing task in phabricator.\n\
             Please indicate which one to update.\n",
        );
        for (index, task) in tasks.iter().enumerate() {
            prompter.say(&format!(
                "[{}] =>\t[ID]: T{}\n\t[Status]: {}\n\t[Name]: {}\n\t[Description]: {}\n",
                index,
                task.id,
                task.status_name.as_deref().unwrap_or(&task.status),
                task.title,
                task.description
            ));
        }
        let skip = tasks.len();
        prompter.say(&format!("[{}] =>\tskip this issue\n", skip));

        let answer = prompter.select_index(
            "Enter the [index] of the task you would like to use",
            skip as u64,
            0,
            false,
        )?;

        match answer.parse::<usize>() {
            Ok(index) if index < skip => Ok(FindOutcome::Existing(tasks.swap_remove(index))),
            _ => Ok(FindOutcome::Skip),
        }
    }
}
