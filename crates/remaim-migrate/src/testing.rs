//! mockall doubles for the tracker traits.

use std::collections::BTreeMap;

use async_trait::async_trait;
use mockall::mock;
use remaim_core::{
    DestinationProject, DestinationTracker, DestinationUser, EditResult, FileInfo, Issue,
    IssueSummary, LabelResolver, NewProject, ProjectListing, ProjectLookup, ProjectPage, Result,
    SourceProject, SourceTracker, Task, TaskEdit,
};

mock! {
    pub Source {}

    #[async_trait]
    impl SourceTracker for Source {
        async fn assert_reachable(&self) -> Result<()>;
        async fn list_projects(&self) -> Result<ProjectListing>;
        async fn project_details(&self, id: u64) -> Result<SourceProject>;
        async fn project_members(&self, id: u64) -> Result<Vec<String>>;
        async fn issues_for_project(&self, id: u64) -> Result<Vec<IssueSummary>>;
        async fn issue(&self, id: u64) -> Result<Issue>;
        async fn download_attachment(&self, content_url: &str) -> Result<Vec<u8>>;
    }
}

mock! {
    pub Labels {}

    #[async_trait]
    impl LabelResolver for Labels {
        async fn status_name(&self, id: &str) -> Result<Option<String>>;
        async fn priority_name(&self, id: &str) -> Result<Option<String>>;
        async fn tracker_name(&self, id: &str) -> Result<Option<String>>;
        async fn custom_field_name(&self, id: &str) -> Result<Option<String>>;
        async fn category_name(&self, project_id: u64, id: &str) -> Result<Option<String>>;
        async fn version_name(&self, project_id: u64, id: &str) -> Result<Option<String>>;
        async fn user_name(&self, id: &str) -> Result<Option<String>>;
    }
}

mock! {
    pub Destination {}

    #[async_trait]
    impl DestinationTracker for Destination {
        async fn query_statuses(&self) -> Result<BTreeMap<String, String>>;
        async fn search_group_projects(&self) -> Result<Vec<DestinationProject>>;
        async fn search_all_projects(&self, after: Option<String>) -> Result<ProjectPage>;
        async fn find_project(&self, lookup: ProjectLookup) -> Result<Option<DestinationProject>>;
        async fn create_project(&self, project: NewProject) -> Result<EditResult>;
        async fn query_users_by_real_name(&self, names: Vec<String>) -> Result<Vec<DestinationUser>>;
        async fn upload_file(&self, name: &str, data_base64: &str, view_policy: &str) -> Result<String>;
        async fn file_info(&self, phid: &str) -> Result<FileInfo>;
        async fn search_tasks(&self, project_phid: &str, text: &str) -> Result<Vec<Task>>;
        async fn edit_task(&self, edit: TaskEdit) -> Result<EditResult>;
    }
}

/// A user as returned by the destination.
pub fn user(name: &str, phid: &str) -> DestinationUser {
    DestinationUser {
        real_name: name.to_string(),
        phid: phid.to_string(),
    }
}
