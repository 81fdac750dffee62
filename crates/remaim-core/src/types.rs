//! Common types shared by the trackers and the migration engine.

use serde::{Deserialize, Deserializer, Serialize};

// =============================================================================
// Source side (Redmine)
// =============================================================================

/// An `{id, name}` reference as used all over the Redmine API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedRef {
    pub id: u64,
    #[serde(default)]
    pub name: String,
}

impl NamedRef {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// A file attached to a source issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: u64,
    pub filename: String,
    pub content_url: String,
}

/// Entry of a project's issue listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueSummary {
    pub id: u64,
    pub subject: String,
}

/// Full snapshot of a source issue.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Issue {
    pub id: u64,
    pub project: NamedRef,
    pub subject: String,
    #[serde(default)]
    pub description: Option<String>,
    pub status: NamedRef,
    #[serde(default)]
    pub priority: Option<NamedRef>,
    #[serde(default)]
    pub assigned_to: Option<NamedRef>,
    #[serde(default)]
    pub watchers: Vec<NamedRef>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub journals: Vec<JournalEntry>,
}

/// One audit event in an issue's history.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: u64,
    pub user: NamedRef,
    pub created_on: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub details: Vec<ChangeDetail>,
}

impl JournalEntry {
    /// The note, if it carries any text.
    pub fn note(&self) -> Option<&str> {
        self.notes.as_deref().filter(|n| !n.trim().is_empty())
    }
}

/// Kind of a change record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// A named issue attribute (`status_id`, `done_ratio`, ...)
    Attribute,
    /// A custom field identified by its numeric id
    CustomField,
    /// Anything else Redmine may record (relations, attachments, ...)
    Other,
}

/// The four mutually exclusive shapes of a change record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeState {
    /// No previous value, a new value
    Set,
    /// Both values present
    Changed,
    /// Previous value present, new value empty or absent
    Removed,
    /// Neither a previous nor a usable new value
    Unset,
}

/// A field-level change inside a journal entry.
///
/// Values are kept as raw JSON so that `null` and a missing key stay
/// distinguishable, and unknown fields are preserved in `extra` for the
/// fallback narrative.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeDetail {
    #[serde(default)]
    pub property: String,
    #[serde(default)]
    pub name: String,
    #[serde(
        default,
        deserialize_with = "present_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub old_value: Option<serde_json::Value>,
    #[serde(
        default,
        deserialize_with = "present_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub new_value: Option<serde_json::Value>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Keeps an explicit `null` as `Some(Value::Null)`; a missing key stays `None`.
fn present_value<'de, D>(deserializer: D) -> std::result::Result<Option<serde_json::Value>, D::Error>
where
    D: Deserializer<'de>,
{
    serde_json::Value::deserialize(deserializer).map(Some)
}

fn value_text(value: &Option<serde_json::Value>) -> Option<String> {
    let text = match value.as_ref()? {
        serde_json::Value::Null => return None,
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    (!text.is_empty()).then_some(text)
}

impl ChangeDetail {
    pub fn attribute(
        name: impl Into<String>,
        old_value: Option<&str>,
        new_value: Option<&str>,
    ) -> Self {
        Self {
            property: "attr".to_string(),
            name: name.into(),
            old_value: old_value.map(|v| serde_json::Value::String(v.to_string())),
            new_value: new_value.map(|v| serde_json::Value::String(v.to_string())),
            extra: serde_json::Map::new(),
        }
    }

    pub fn custom_field(
        id: impl Into<String>,
        old_value: Option<&str>,
        new_value: Option<&str>,
    ) -> Self {
        Self {
            property: "cf".to_string(),
            ..Self::attribute(id, old_value, new_value)
        }
    }

    pub fn kind(&self) -> ChangeKind {
        match self.property.as_str() {
            "attr" => ChangeKind::Attribute,
            "cf" => ChangeKind::CustomField,
            _ => ChangeKind::Other,
        }
    }

    /// Previous value as text, `None` when absent, null or empty.
    pub fn old_text(&self) -> Option<String> {
        value_text(&self.old_value)
    }

    /// New value as text, `None` when absent, null or empty.
    pub fn new_text(&self) -> Option<String> {
        value_text(&self.new_value)
    }

    pub fn state(&self) -> ChangeState {
        match (self.old_text(), self.new_text()) {
            (None, Some(_)) => ChangeState::Set,
            (Some(_), Some(_)) => ChangeState::Changed,
            (Some(_), None) => ChangeState::Removed,
            (None, None) => ChangeState::Unset,
        }
    }

    /// JSON dump of the raw record, used when no narrative applies.
    pub fn dump(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{:?}", self))
    }
}

/// A project of the source tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceProject {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub identifier: Option<String>,
    /// Parent project id, `None` for top-level projects
    #[serde(default)]
    pub parent_id: Option<u64>,
}

/// A project together with its sub-projects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectNode {
    pub project: SourceProject,
    pub children: Vec<ProjectNode>,
}

/// Source project listing, arranged as a tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectListing {
    pub total_count: u64,
    pub lowest_id: u64,
    pub highest_id: u64,
    pub projects: Vec<ProjectNode>,
}

impl ProjectListing {
    /// Whether a project with this id appears anywhere in the tree.
    pub fn contains(&self, id: u64) -> bool {
        fn walk(nodes: &[ProjectNode], id: u64) -> bool {
            nodes
                .iter()
                .any(|n| n.project.id == id || walk(&n.children, id))
        }
        walk(&self.projects, id)
    }
}

// =============================================================================
// Destination side (Phabricator)
// =============================================================================

/// A Phabricator project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationProject {
    pub id: u64,
    pub phid: String,
    pub name: String,
}

/// One page of a cursor-paginated project search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectPage {
    pub data: Vec<DestinationProject>,
    /// Cursor for the next page, `None` once exhausted
    pub after: Option<String>,
}

/// How to look a destination project up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectLookup {
    Ids(Vec<u64>),
    Slugs(Vec<String>),
}

/// Parameters for creating a destination project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProject {
    pub name: String,
    pub members: Vec<String>,
    pub policies: Policies,
}

/// Identifiers of an object created or edited through an `*.edit` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditResult {
    pub id: u64,
    pub phid: String,
}

/// A destination user found by real name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationUser {
    pub real_name: String,
    pub phid: String,
}

/// Metadata of an uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub phid: String,
    /// Monogram such as `F123`
    pub object_name: String,
}

/// A destination task (Maniphest).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub phid: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub status_name: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
}

/// View and edit policy applied to everything created in a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policies {
    pub view: String,
    pub edit: String,
}

impl Policies {
    /// Same PHID for both policies.
    pub fn uniform(phid: impl Into<String>) -> Self {
        let phid = phid.into();
        Self {
            view: phid.clone(),
            edit: phid,
        }
    }
}

// =============================================================================
// Transactions
// =============================================================================

/// Transaction type understood by `maniphest.edit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionKind {
    #[serde(rename = "projects.set")]
    ProjectsSet,
    #[serde(rename = "title")]
    Title,
    #[serde(rename = "description")]
    Description,
    #[serde(rename = "status")]
    Status,
    #[serde(rename = "subscribers.set")]
    SubscribersSet,
    #[serde(rename = "priority")]
    Priority,
    #[serde(rename = "owner")]
    Owner,
    #[serde(rename = "comment")]
    Comment,
    #[serde(rename = "view")]
    View,
    #[serde(rename = "edit")]
    Edit,
}

impl TransactionKind {
    /// Kinds that are always submitted, even with an empty value.
    pub fn is_invariant(self) -> bool {
        matches!(
            self,
            TransactionKind::ProjectsSet
                | TransactionKind::Status
                | TransactionKind::View
                | TransactionKind::Edit
        )
    }
}

/// Value of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TransactionValue {
    Text(String),
    List(Vec<String>),
}

impl TransactionValue {
    pub fn is_empty(&self) -> bool {
        match self {
            TransactionValue::Text(s) => s.is_empty(),
            TransactionValue::List(l) => l.is_empty(),
        }
    }
}

/// One `{type, value}` field change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub value: TransactionValue,
}

impl Transaction {
    pub fn text(kind: TransactionKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: TransactionValue::Text(value.into()),
        }
    }

    pub fn list(kind: TransactionKind, value: Vec<String>) -> Self {
        Self {
            kind,
            value: TransactionValue::List(value),
        }
    }
}

/// Request for `maniphest.edit`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskEdit {
    /// PHID of the task to update, `None` to create one
    pub object_identifier: Option<String>,
    pub transactions: Vec<Transaction>,
}
