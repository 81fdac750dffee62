//! Mapping source enum labels (statuses, priorities) to destination values.
//!
//! Labels without a known mapping are put to the operator once; the answer
//! holds for the rest of the run.

use std::collections::{BTreeMap, BTreeSet};

use remaim_core::Result;
use tracing::info;

use crate::prompt::Prompter;

/// Outcome of resolving one label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Mapped(String),
    /// The operator chose to skip issues carrying this label
    Skip,
}

/// Label mapping for one enum.
#[derive(Debug, Clone)]
pub struct EnumReconciler {
    kind: &'static str,
    map: BTreeMap<String, String>,
    skipped: BTreeSet<String>,
}

impl EnumReconciler {
    /// `kind` names the enum in prompts ("status", "priority").
    pub fn new(kind: &'static str, map: BTreeMap<String, String>) -> Self {
        Self {
            kind,
            map,
            skipped: BTreeSet::new(),
        }
    }

    /// Mapped value of a label: exact match first, then ignoring case.
    pub fn lookup(&self, label: &str) -> Option<&str> {
        self.map
            .get(label)
            .or_else(|| {
                self.map
                    .iter()
                    .find(|(known, _)| known.eq_ignore_ascii_case(label))
                    .map(|(_, value)| value)
            })
            .map(String::as_str)
    }

    /// Distinct destination values, sorted.
    pub fn choices(&self) -> Vec<String> {
        self.map
            .values()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Value for `label`, asking the operator when it is unknown.
    ///
    /// With `allow_skip`, an empty answer skips the label for the rest of
    /// the run.
    pub fn resolve(
        &mut self,
        label: &str,
        prompter: &mut dyn Prompter,
        allow_skip: bool,
    ) -> Result<Resolution> {
        if let Some(value) = self.lookup(label) {
            return Ok(Resolution::Mapped(value.to_string()));
        }
        if self.skipped.contains(label) {
            return Ok(Resolution::Skip);
        }

        let choices = self.choices();
        prompter.say(&format!(
            "We could not find a matching {} for \"{}\"!\n",
            self.kind, label
        ));
        for (index, choice) in choices.iter().enumerate() {
            prompter.say(&format!("[{}] {}\n", index, choice));
        }

        let base = if choices.is_empty() {
            "Enter the value to use"
        } else {
            "Enter the [index] or one of the listed values to use"
        };
        let question = if allow_skip {
            format!("{}, or leave empty to skip the issue", base)
        } else {
            base.to_string()
        };

        let value = loop {
            let answer = prompter.ask(&question)?;

            if answer.is_empty() {
                if allow_skip {
                    info!(kind = self.kind, label = label, "Label skipped");
                    self.skipped.insert(label.to_string());
                    return Ok(Resolution::Skip);
                }
            } else if let Some(choice) = answer
                .parse::<usize>()
                .ok()
                .and_then(|index| choices.get(index))
            {
                break choice.clone();
            } else if choices.is_empty() || choices.contains(&answer) {
                break answer;
            }

            prompter.say(&format!(
                "\"{}\" is not a valid {}, please try again.\n",
                answer, self.kind
            ));
        };

        info!(kind = self.kind, label = label, value = %value, "Label mapped");
        self.map.insert(label.to_string(), value.clone());
        Ok(Resolution::Mapped(value))
    }
}

/// Enum mappings for one run.
#[derive(Debug, Clone)]
pub struct ReconciliationState {
    pub statuses: EnumReconciler,
    pub priorities: EnumReconciler,
    /// Resume mode: ambiguity skips instead of asking
    pub resume: bool,
}

impl ReconciliationState {
    /// `statuses` as `label -> key` from the destination, `priorities` from
    /// the configuration.
    pub fn new(
        statuses: BTreeMap<String, String>,
        priorities: BTreeMap<String, String>,
        resume: bool,
    ) -> Self {
        Self {
            statuses: EnumReconciler::new("status", statuses),
            priorities: EnumReconciler::new("priority", priorities),
            resume,
        }
    }

    pub fn resolve_status(
        &mut self,
        label: &str,
        prompter: &mut dyn Prompter,
    ) -> Result<Resolution> {
        self.statuses.resolve(label, prompter, self.resume)
    }

    pub fn resolve_priority(
        &mut self,
        label: &str,
        prompter: &mut dyn Prompter,
    ) -> Result<Resolution> {
        self.priorities.resolve(label, prompter, self.resume)
    }
}
