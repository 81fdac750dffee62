//! Redmine API response types.
//!
//! These types represent the raw JSON responses from the Redmine REST API.
//! They are deserialized and then mapped to the core types.

use remaim_core::ChangeDetail;
use serde::{Deserialize, Serialize};

/// The ubiquitous `{id, name}` pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedmineRef {
    pub id: u64,
    #[serde(default)]
    pub name: String,
}

// =============================================================================
// Projects
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedmineProject {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub identifier: Option<String>,
    #[serde(default)]
    pub parent: Option<RedmineRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedmineProjectList {
    pub projects: Vec<RedmineProject>,
    #[serde(default)]
    pub total_count: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedmineProjectResponse {
    pub project: RedmineProject,
}

/// A project membership; group memberships carry no user.
#[derive(Debug, Clone, Deserialize)]
pub struct RedmineMembership {
    #[serde(default)]
    pub user: Option<RedmineRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedmineMembershipList {
    pub memberships: Vec<RedmineMembership>,
    #[serde(default)]
    pub total_count: u64,
}

// =============================================================================
// Issues
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct RedmineIssueSummary {
    pub id: u64,
    #[serde(default)]
    pub subject: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedmineIssueList {
    pub issues: Vec<RedmineIssueSummary>,
    #[serde(default)]
    pub total_count: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedmineAttachment {
    pub id: u64,
    pub filename: String,
    pub content_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedmineJournal {
    pub id: u64,
    pub user: RedmineRef,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_on: String,
    #[serde(default)]
    pub details: Vec<ChangeDetail>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedmineIssue {
    pub id: u64,
    pub project: RedmineRef,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub description: Option<String>,
    pub status: RedmineRef,
    #[serde(default)]
    pub priority: Option<RedmineRef>,
    #[serde(default)]
    pub assigned_to: Option<RedmineRef>,
    #[serde(default)]
    pub watchers: Vec<RedmineRef>,
    #[serde(default)]
    pub attachments: Vec<RedmineAttachment>,
    #[serde(default)]
    pub journals: Vec<RedmineJournal>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedmineIssueResponse {
    pub issue: RedmineIssue,
}

// =============================================================================
// Lookup tables
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct RedmineStatusList {
    pub issue_statuses: Vec<RedmineRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedminePriorityList {
    pub issue_priorities: Vec<RedmineRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedmineTrackerList {
    pub trackers: Vec<RedmineRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedmineCustomFieldList {
    pub custom_fields: Vec<RedmineRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedmineCategoryList {
    pub issue_categories: Vec<RedmineRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedmineVersionList {
    pub versions: Vec<RedmineRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedmineUser {
    pub id: u64,
    #[serde(default)]
    pub login: Option<String>,
    #[serde(default)]
    pub firstname: String,
    #[serde(default)]
    pub lastname: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedmineUserResponse {
    pub user: RedmineUser,
}
