//! Narrating Redmine journal entries as Phabricator comments.
//!
//! Comments are all posted by the API token's owner, so every comment
//! names the original author and date, quotes the note, and recounts the
//! field changes recorded with it.

use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc};
use remaim_core::{ChangeDetail, ChangeKind, ChangeState, JournalEntry, LabelResolver, Result};
use tracing::warn;

use crate::markup::{quote, to_remarkup};

/// Which lookup turns a raw attribute value into a label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lookup {
    Verbatim,
    Status,
    Priority,
    Tracker,
    Category,
    Version,
    User,
}

/// Lookup used for an attribute, `None` for attributes without a narrative.
fn lookup_for(attribute: &str) -> Option<Lookup> {
    Some(match attribute {
        "status_id" => Lookup::Status,
        "priority_id" => Lookup::Priority,
        "tracker_id" => Lookup::Tracker,
        "category_id" => Lookup::Category,
        "fixed_version_id" => Lookup::Version,
        "assigned_to_id" => Lookup::User,
        "due_date" | "estimated_hours" | "done_ratio" => Lookup::Verbatim,
        _ => return None,
    })
}

/// Narrative for an attribute change, `None` when no template exists for
/// this attribute in this state.
fn render(
    attribute: &str,
    state: ChangeState,
    old: &str,
    new: &str,
    raised: bool,
) -> Option<String> {
    use ChangeState::{Changed, Removed, Set};

    let line = match (attribute, state) {
        ("status_id", Set) => format!("set task status to {}", new),
        ("status_id", Changed) => format!("changed task status from \"{}\" to \"{}\"", old, new),

        ("priority_id", Set) => format!("set the task's priority to {}", new),
        ("priority_id", Changed) => format!(
            "{} the task's priority from {} to {}",
            if raised { "Raised" } else { "Lowered" },
            old,
            new
        ),

        ("assigned_to_id", Set) => format!("assigned the task to {}", new),
        ("assigned_to_id", Changed) => format!("changed the assignee from {} to {}", old, new),
        ("assigned_to_id", Removed) => format!("unassigned {} from the task", old),

        ("due_date", Set) => format!("set the due date to {}", new),
        ("due_date", Changed) => format!("changed the due date from {} to {}", old, new),
        ("due_date", Removed) => format!("removed the due date {}", old),

        ("estimated_hours", Set) => format!("set estimated hours to {}", new),
        ("estimated_hours", Changed) => {
            format!("changed estimated hours from {} to {}", old, new)
        }
        ("estimated_hours", Removed) => format!("removed the estimate of {} hours", old),

        ("done_ratio", Set) => format!("set done to {}%", new),
        ("done_ratio", Changed) => format!("changed done from {}% to {}%", old, new),

        ("category_id", Set) => format!("set the category to \"{}\"", new),
        ("category_id", Changed) => {
            format!("changed the category from \"{}\" to \"{}\"", old, new)
        }
        ("category_id", Removed) => format!("removed the category \"{}\"", old),

        ("fixed_version_id", Set) => format!("set target version to \"{}\"", new),
        ("fixed_version_id", Changed) => {
            format!("changed target version from \"{}\" to \"{}\"", old, new)
        }
        ("fixed_version_id", Removed) => format!("removed target version \"{}\"", old),

        ("tracker_id", Changed) => {
            format!("changed the task type from \"{}\" to \"{}\"", old, new)
        }

        _ => return None,
    };

    Some(format!(" - {}", line))
}

/// Redmine's `Monday, April 27th 2015 15:55:47`, in UTC.
///
/// Unparsable timestamps are shown as they came.
pub fn format_timestamp(created_on: &str) -> String {
    let Ok(parsed) = DateTime::parse_from_rfc3339(created_on) else {
        return created_on.to_string();
    };
    let utc = parsed.with_timezone(&Utc);
    let day = utc.day();
    let suffix = match (day % 10, day % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };

    format!(
        "{} {}{} {}",
        utc.format("%A, %B"),
        day,
        suffix,
        utc.format("%Y %H:%M:%S")
    )
}

/// Line used for change records nothing else knows how to narrate.
fn unknown_change(detail: &ChangeDetail) -> String {
    let dump = detail.dump();
    warn!(detail = %dump, "Encountered an unknown journal entry");
    format!(" - changed another property I don't know about: {}", dump)
}

/// Whether a priority change goes up. Redmine priority ids grow with
/// urgency.
fn is_raise(old: Option<&str>, new: Option<&str>) -> bool {
    let parse = |v: Option<&str>| v.and_then(|v| v.trim().parse::<f64>().ok());
    match (parse(old), parse(new)) {
        (Some(old), Some(new)) => new > old,
        _ => false,
    }
}

/// Turns journal entries into comment text.
pub struct JournalFormatter {
    labels: Arc<dyn LabelResolver>,
}

impl JournalFormatter {
    pub fn new(labels: Arc<dyn LabelResolver>) -> Self {
        Self { labels }
    }

    /// Comment for one journal entry, `None` when it carries neither a note
    /// nor any change.
    pub async fn format(&self, entry: &JournalEntry, project_id: u64) -> Result<Option<String>> {
        let note = entry.note();
        if note.is_none() && entry.details.is_empty() {
            return Ok(None);
        }

        let mut comment = format!(
            "On {}, {} wrote:\n{}",
            format_timestamp(&entry.created_on),
            entry.user.name,
            quote(&to_remarkup(note.unwrap_or_default()))
        );

        if !entry.details.is_empty() {
            let lines = self.recount(&entry.details, project_id).await?;
            comment.push_str("\nand:\n");
            comment.push_str(&lines.join("\n"));
        }

        Ok(Some(comment))
    }

    /// One narrative line per change record.
    pub async fn recount(&self, details: &[ChangeDetail], project_id: u64) -> Result<Vec<String>> {
        let mut lines = Vec::with_capacity(details.len());
        for detail in details {
            lines.push(self.narrate(detail, project_id).await?);
        }
        Ok(lines)
    }

    async fn narrate(&self, detail: &ChangeDetail, project_id: u64) -> Result<String> {
        match detail.kind() {
            ChangeKind::CustomField => self.narrate_custom_field(detail).await,
            ChangeKind::Attribute => self.narrate_attribute(detail, project_id).await,
            ChangeKind::Other => Ok(unknown_change(detail)),
        }
    }

    async fn narrate_custom_field(&self, detail: &ChangeDetail) -> Result<String> {
        let label = self
            .labels
            .custom_field_name(&detail.name)
            .await?
            .unwrap_or_else(|| detail.name.clone());
        let new = detail.new_text().unwrap_or_default();

        Ok(match detail.old_text() {
            Some(old) => format!(" - changed \"{}\" from \"{}\" to \"{}\"", label, old, new),
            None => format!(" - set \"{}\" to \"{}\"", label, new),
        })
    }

    async fn narrate_attribute(&self, detail: &ChangeDetail, project_id: u64) -> Result<String> {
        let old = detail.old_text();
        let new = detail.new_text();

        match detail.name.as_str() {
            "description" => return Ok(" - changed the description".to_string()),
            "subject" => {
                return Ok(format!(
                    " - changed the subject from \"{}\" to \"{}\"",
                    old.unwrap_or_default(),
                    new.unwrap_or_default()
                ))
            }
            _ => {}
        }

        let Some(lookup) = lookup_for(&detail.name) else {
            return Ok(unknown_change(detail));
        };
        // Unset to null reads like an initial set with an empty value
        let state = match detail.state() {
            ChangeState::Unset => ChangeState::Set,
            state => state,
        };

        let raised = is_raise(old.as_deref(), new.as_deref());
        let old = self.label(lookup, old, project_id).await?;
        let new = self.label(lookup, new, project_id).await?;

        Ok(render(&detail.name, state, &old, &new, raised)
            .unwrap_or_else(|| unknown_change(detail)))
    }

    /// Resolve a raw value; unknown ids are shown as they are.
    async fn label(&self, lookup: Lookup, raw: Option<String>, project_id: u64) -> Result<String> {
        let Some(raw) = raw else {
            return Ok(String::new());
        };

        let resolved = match lookup {
            Lookup::Verbatim => None,
            Lookup::Status => self.labels.status_name(&raw).await?,
            Lookup::Priority => self.labels.priority_name(&raw).await?,
            Lookup::Tracker => self.labels.tracker_name(&raw).await?,
            Lookup::Category => self.labels.category_name(project_id, &raw).await?,
            Lookup::Version => self.labels.version_name(project_id, &raw).await?,
            Lookup::User => self.labels.user_name(&raw).await?,
        };

        Ok(resolved.unwrap_or(raw))
    }
}
