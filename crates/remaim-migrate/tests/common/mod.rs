//! In-memory trackers shared by the integration tests.
//!
//! The fakes hold canned data and record every write so tests can assert
//! on what would have been sent.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use remaim_core::{
    DestinationProject, DestinationTracker, DestinationUser, EditResult, Error, FileInfo, Issue,
    IssueSummary, LabelResolver, NamedRef, NewProject, ProjectListing, ProjectLookup, ProjectPage,
    Result, SourceProject, SourceTracker, Task, TaskEdit,
};

// =============================================================================
// Source
// =============================================================================

#[derive(Default)]
pub struct FakeSource {
    pub projects: Vec<SourceProject>,
    pub members: HashMap<u64, Vec<String>>,
    pub issues: BTreeMap<u64, Issue>,
    pub files: HashMap<String, Vec<u8>>,
    pub downloads: Mutex<Vec<String>>,
}

impl FakeSource {
    pub fn with_issues(project: SourceProject, issues: Vec<Issue>) -> Self {
        Self {
            projects: vec![project],
            issues: issues.into_iter().map(|i| (i.id, i)).collect(),
            ..Default::default()
        }
    }
}

#[async_trait]
impl SourceTracker for FakeSource {
    async fn assert_reachable(&self) -> Result<()> {
        Ok(())
    }

    async fn list_projects(&self) -> Result<ProjectListing> {
        Ok(ProjectListing::from_projects(
            self.projects.len() as u64,
            self.projects.clone(),
        ))
    }

    async fn project_details(&self, id: u64) -> Result<SourceProject> {
        self.projects
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("project {}", id)))
    }

    async fn project_members(&self, id: u64) -> Result<Vec<String>> {
        Ok(self.members.get(&id).cloned().unwrap_or_default())
    }

    async fn issues_for_project(&self, id: u64) -> Result<Vec<IssueSummary>> {
        let issues: Vec<IssueSummary> = self
            .issues
            .values()
            .filter(|i| i.project.id == id)
            .map(|i| IssueSummary {
                id: i.id,
                subject: i.subject.clone(),
            })
            .collect();
        if issues.is_empty() {
            return Err(Error::NoIssuesFound { project_id: id });
        }
        Ok(issues)
    }

    async fn issue(&self, id: u64) -> Result<Issue> {
        self.issues
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("issue {}", id)))
    }

    async fn download_attachment(&self, content_url: &str) -> Result<Vec<u8>> {
        self.downloads.lock().unwrap().push(content_url.to_string());
        self.files
            .get(content_url)
            .cloned()
            .ok_or_else(|| Error::NotFound(content_url.to_string()))
    }
}

// =============================================================================
// Labels
// =============================================================================

#[derive(Default)]
pub struct FakeLabels {
    pub statuses: HashMap<String, String>,
    pub priorities: HashMap<String, String>,
    pub users: HashMap<String, String>,
}

#[async_trait]
impl LabelResolver for FakeLabels {
    async fn status_name(&self, id: &str) -> Result<Option<String>> {
        Ok(self.statuses.get(id).cloned())
    }

    async fn priority_name(&self, id: &str) -> Result<Option<String>> {
        Ok(self.priorities.get(id).cloned())
    }

    async fn tracker_name(&self, _id: &str) -> Result<Option<String>> {
        Ok(None)
    }

    async fn custom_field_name(&self, _id: &str) -> Result<Option<String>> {
        Ok(None)
    }

    async fn category_name(&self, _project_id: u64, _id: &str) -> Result<Option<String>> {
        Ok(None)
    }

    async fn version_name(&self, _project_id: u64, _id: &str) -> Result<Option<String>> {
        Ok(None)
    }

    async fn user_name(&self, id: &str) -> Result<Option<String>> {
        Ok(self.users.get(id).cloned())
    }
}

// =============================================================================
// Destination
// =============================================================================

pub struct FakeDestination {
    pub statuses: BTreeMap<String, String>,
    pub groups: Vec<DestinationProject>,
    pub projects: Mutex<Vec<DestinationProject>>,
    pub users: Vec<DestinationUser>,
    /// Search results by full-text key
    pub tasks: HashMap<String, Vec<Task>>,
    pub edits: Mutex<Vec<TaskEdit>>,
    pub created_projects: Mutex<Vec<NewProject>>,
    pub uploads: Mutex<Vec<(String, String, String)>>,
    pub user_queries: Mutex<Vec<Vec<String>>>,
    /// Edits accepted before every further edit fails
    pub edit_limit: Option<usize>,
}

impl Default for FakeDestination {
    fn default() -> Self {
        Self {
            statuses: [("Open", "open"), ("Resolved", "resolved"), ("Wontfix", "wontfix")]
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            groups: vec![DestinationProject {
                id: 7,
                phid: "PHID-PROJ-staff".to_string(),
                name: "Staff".to_string(),
            }],
            projects: Mutex::new(vec![DestinationProject {
                id: 12,
                phid: "PHID-PROJ-web".to_string(),
                name: "Website".to_string(),
            }]),
            users: Vec::new(),
            tasks: HashMap::new(),
            edits: Mutex::new(Vec::new()),
            created_projects: Mutex::new(Vec::new()),
            uploads: Mutex::new(Vec::new()),
            user_queries: Mutex::new(Vec::new()),
            edit_limit: None,
        }
    }
}

impl FakeDestination {
    pub fn edits(&self) -> Vec<TaskEdit> {
        self.edits.lock().unwrap().clone()
    }
}

#[async_trait]
impl DestinationTracker for FakeDestination {
    async fn query_statuses(&self) -> Result<BTreeMap<String, String>> {
        Ok(self.statuses.clone())
    }

    async fn search_group_projects(&self) -> Result<Vec<DestinationProject>> {
        Ok(self.groups.clone())
    }

    async fn search_all_projects(&self, after: Option<String>) -> Result<ProjectPage> {
        // One project per page
        let projects = self.projects.lock().unwrap();
        let start: usize = after.as_deref().map_or(0, |a| a.parse().unwrap_or(0));
        let data: Vec<DestinationProject> = projects.iter().skip(start).take(1).cloned().collect();
        let after = (start + 1 < projects.len()).then(|| (start + 1).to_string());
        Ok(ProjectPage { data, after })
    }

    async fn find_project(&self, lookup: ProjectLookup) -> Result<Option<DestinationProject>> {
        let projects = self.projects.lock().unwrap();
        Ok(match lookup {
            ProjectLookup::Ids(ids) => projects.iter().find(|p| ids.contains(&p.id)).cloned(),
            ProjectLookup::Slugs(slugs) => projects
                .iter()
                .find(|p| slugs.contains(&p.name.to_lowercase()))
                .cloned(),
        })
    }

    async fn create_project(&self, project: NewProject) -> Result<EditResult> {
        let mut projects = self.projects.lock().unwrap();
        let id = projects.iter().map(|p| p.id).max().unwrap_or(0) + 1;
        let phid = format!("PHID-PROJ-new{}", id);
        projects.push(DestinationProject {
            id,
            phid: phid.clone(),
            name: project.name.clone(),
        });
        self.created_projects.lock().unwrap().push(project);
        Ok(EditResult { id, phid })
    }

    async fn query_users_by_real_name(&self, names: Vec<String>) -> Result<Vec<DestinationUser>> {
        let found = self
            .users
            .iter()
            .filter(|u| names.contains(&u.real_name))
            .cloned()
            .collect();
        self.user_queries.lock().unwrap().push(names);
        Ok(found)
    }

    async fn upload_file(&self, name: &str, data_base64: &str, view_policy: &str) -> Result<String> {
        let mut uploads = self.uploads.lock().unwrap();
        uploads.push((
            name.to_string(),
            data_base64.to_string(),
            view_policy.to_string(),
        ));
        Ok(format!("PHID-FILE-{}", uploads.len()))
    }

    async fn file_info(&self, phid: &str) -> Result<FileInfo> {
        // First upload becomes F123456
        let number: u64 = phid
            .trim_start_matches("PHID-FILE-")
            .parse()
            .map_err(|_| Error::NotFound(phid.to_string()))?;
        Ok(FileInfo {
            phid: phid.to_string(),
            object_name: format!("F{}", 123455 + number),
        })
    }

    async fn search_tasks(&self, _project_phid: &str, text: &str) -> Result<Vec<Task>> {
        Ok(self.tasks.get(text).cloned().unwrap_or_default())
    }

    async fn edit_task(&self, edit: TaskEdit) -> Result<EditResult> {
        let mut edits = self.edits.lock().unwrap();
        if self.edit_limit.is_some_and(|limit| edits.len() >= limit) {
            return Err(Error::Api {
                status: 500,
                message: "maniphest.edit failed".to_string(),
            });
        }
        edits.push(edit);
        let id = 100 + edits.len() as u64;
        Ok(EditResult {
            id,
            phid: format!("PHID-TASK-{}", id),
        })
    }
}

// =============================================================================
// Builders
// =============================================================================

pub fn source_project(id: u64, name: &str) -> SourceProject {
    SourceProject {
        id,
        name: name.to_string(),
        identifier: Some(name.to_lowercase()),
        parent_id: None,
    }
}

/// Issue "Test Subject" with a plain description, status "Resolved".
pub fn test_issue(id: u64, project: u64) -> Issue {
    Issue {
        id,
        project: NamedRef::new(project, "Website"),
        subject: "Test Subject".to_string(),
        description: Some("A random description of a task".to_string()),
        status: NamedRef::new(3, "Resolved"),
        ..Default::default()
    }
}

pub fn user(name: &str, phid: &str) -> DestinationUser {
    DestinationUser {
        real_name: name.to_string(),
        phid: phid.to_string(),
    }
}
