//! Collaborator traits for the two trackers.
//!
//! The migration engine only talks to trackers through these traits, so
//! every component can be exercised against fakes.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{
    DestinationProject, DestinationUser, EditResult, FileInfo, Issue, IssueSummary, NewProject,
    ProjectListing, ProjectLookup, ProjectPage, SourceProject, Task, TaskEdit,
};

/// Read access to the tracker issues are migrated from.
#[async_trait]
pub trait SourceTracker: Send + Sync {
    /// Fail unless the tracker answers with a non-empty project list.
    async fn assert_reachable(&self) -> Result<()>;

    /// All projects, arranged as a tree.
    async fn list_projects(&self) -> Result<ProjectListing>;

    /// Details of one project. Memoized for the lifetime of the client.
    async fn project_details(&self, id: u64) -> Result<SourceProject>;

    /// Names of the users that are members of a project.
    async fn project_members(&self, id: u64) -> Result<Vec<String>>;

    /// Every issue of a project, `Error::NoIssuesFound` when there is none.
    async fn issues_for_project(&self, id: u64) -> Result<Vec<IssueSummary>>;

    /// Full issue including watchers, attachments and journals.
    async fn issue(&self, id: u64) -> Result<Issue>;

    /// Raw content of an attachment.
    async fn download_attachment(&self, content_url: &str) -> Result<Vec<u8>>;
}

/// Id to display-name lookups used when narrating journal history.
///
/// `Ok(None)` means the tracker does not know the id.
#[async_trait]
pub trait LabelResolver: Send + Sync {
    async fn status_name(&self, id: &str) -> Result<Option<String>>;

    async fn priority_name(&self, id: &str) -> Result<Option<String>>;

    async fn tracker_name(&self, id: &str) -> Result<Option<String>>;

    async fn custom_field_name(&self, id: &str) -> Result<Option<String>>;

    async fn category_name(&self, project_id: u64, id: &str) -> Result<Option<String>>;

    async fn version_name(&self, project_id: u64, id: &str) -> Result<Option<String>>;

    async fn user_name(&self, id: &str) -> Result<Option<String>>;
}

/// Query and write access to the tracker issues are migrated to.
#[async_trait]
pub trait DestinationTracker: Send + Sync {
    /// Known task statuses as `label -> key`.
    async fn query_statuses(&self) -> Result<BTreeMap<String, String>>;

    /// Projects with the "group" icon, used as policy holders.
    async fn search_group_projects(&self) -> Result<Vec<DestinationProject>>;

    /// One page of all projects, starting after the given cursor.
    async fn search_all_projects(&self, after: Option<String>) -> Result<ProjectPage>;

    async fn find_project(&self, lookup: ProjectLookup) -> Result<Option<DestinationProject>>;

    async fn create_project(&self, project: NewProject) -> Result<EditResult>;

    /// Users whose real name is one of `names`. Unknown names are omitted.
    async fn query_users_by_real_name(&self, names: Vec<String>) -> Result<Vec<DestinationUser>>;

    /// Upload a base64-encoded file, returning its PHID.
    async fn upload_file(&self, name: &str, data_base64: &str, view_policy: &str)
        -> Result<String>;

    async fn file_info(&self, phid: &str) -> Result<FileInfo>;

    /// Full-text search for tasks within a project.
    async fn search_tasks(&self, project_phid: &str, text: &str) -> Result<Vec<Task>>;

    /// Create (no identifier) or update a task.
    async fn edit_task(&self, edit: TaskEdit) -> Result<EditResult>;
}
