//! Redmine API client implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use remaim_core::{
    Attachment, Error, Issue, IssueSummary, JournalEntry, LabelResolver, NamedRef,
    ProjectListing, RedmineConfig, Result, SourceProject, SourceTracker,
};
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, warn};

use crate::types::{
    RedmineCategoryList, RedmineCustomFieldList, RedmineIssue, RedmineIssueList,
    RedmineIssueResponse, RedmineMembershipList, RedminePriorityList, RedmineProject,
    RedmineProjectList, RedmineProjectResponse, RedmineRef, RedmineStatusList,
    RedmineTrackerList, RedmineUserResponse, RedmineVersionList,
};

/// Maximum page size the Redmine API accepts.
const PAGE_SIZE: u64 = 100;

/// Associations requested with every issue.
const ISSUE_INCLUDES: &str = "children,attachments,relations,watchers,journals";

/// id -> name table.
type LabelTable = HashMap<String, String>;

/// How requests are authenticated.
#[derive(Debug, Clone)]
pub enum RedmineAuth {
    /// `X-Redmine-API-Key` header
    ApiKey(String),
    /// HTTP basic auth
    Basic { user: String, password: String },
}

/// Redmine API client.
///
/// Lookup tables used to narrate journal history are fetched once and kept
/// for the lifetime of the client.
pub struct RedmineClient {
    base_url: String,
    auth: RedmineAuth,
    client: reqwest::Client,
    statuses: OnceCell<LabelTable>,
    priorities: OnceCell<LabelTable>,
    trackers: OnceCell<LabelTable>,
    custom_fields: OnceCell<LabelTable>,
    categories: Mutex<HashMap<u64, LabelTable>>,
    versions: Mutex<HashMap<u64, LabelTable>>,
    users: Mutex<HashMap<String, Option<String>>>,
    projects: Mutex<HashMap<u64, SourceProject>>,
}

impl RedmineClient {
    /// Create a new Redmine client.
    pub fn new(base_url: impl Into<String>, auth: RedmineAuth) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("remaim")
            .build()
            .map_err(|e| Error::Http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth,
            client,
            statuses: OnceCell::new(),
            priorities: OnceCell::new(),
            trackers: OnceCell::new(),
            custom_fields: OnceCell::new(),
            categories: Mutex::new(HashMap::new()),
            versions: Mutex::new(HashMap::new()),
            users: Mutex::new(HashMap::new()),
            projects: Mutex::new(HashMap::new()),
        })
    }

    /// Create a client from the `[redmine]` config section.
    pub fn from_config(config: &RedmineConfig) -> Result<Self> {
        let auth = match (&config.api_key, &config.user, &config.password) {
            (Some(key), _, _) if !key.is_empty() => RedmineAuth::ApiKey(key.clone()),
            (_, Some(user), Some(password)) => RedmineAuth::Basic {
                user: user.clone(),
                password: password.clone(),
            },
            _ => {
                return Err(Error::Config(
                    "Redmine needs an api_key or a user and password".to_string(),
                ))
            }
        };
        Self::new(&config.url, auth)
    }

    /// Base URL without trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build request with authentication.
    fn request(&self, url: &str) -> reqwest::RequestBuilder {
        let builder = self.client.get(url).header("Accept", "application/json");
        match &self.auth {
            RedmineAuth::ApiKey(key) => builder.header("X-Redmine-API-Key", key),
            RedmineAuth::Basic { user, password } => builder.basic_auth(user, Some(password)),
        }
    }

    /// Send an authenticated GET request and check the status.
    async fn send(&self, url: &str) -> Result<reqwest::Response> {
        debug!(url = url, "Redmine GET request");

        let response = self
            .request(url)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let status_code = status.as_u16();
            let message = response.text().await.unwrap_or_default();
            warn!(
                status = status_code,
                message = message,
                "Redmine API error response"
            );
            return Err(Error::from_status(status_code, message));
        }

        Ok(response)
    }

    /// Make an authenticated GET request and decode the JSON body.
    async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        self.send(&url)
            .await?
            .json()
            .await
            .map_err(|e| Error::InvalidData(format!("Failed to parse response: {}", e)))
    }

    /// Fetch every page of an offset-paginated listing.
    ///
    /// `unpack` returns the page's items and the reported total.
    async fn get_all<P, T, F>(&self, path: &str, unpack: F) -> Result<Vec<T>>
    where
        P: serde::de::DeserializeOwned,
        F: Fn(P) -> (Vec<T>, u64),
    {
        let separator = if path.contains('?') { '&' } else { '?' };
        let mut items = Vec::new();
        let mut offset = 0;

        loop {
            let page: P = self
                .get(&format!(
                    "{}{}limit={}&offset={}",
                    path, separator, PAGE_SIZE, offset
                ))
                .await?;
            let (batch, total) = unpack(page);
            let received = batch.len() as u64;
            items.extend(batch);
            offset += received;

            if received == 0 || offset >= total {
                break;
            }
        }

        Ok(items)
    }

    async fn label_table<'a, P, F>(
        &'a self,
        cell: &'a OnceCell<LabelTable>,
        path: &str,
        unpack: F,
    ) -> Result<&'a LabelTable>
    where
        P: serde::de::DeserializeOwned,
        F: FnOnce(P) -> Vec<RedmineRef>,
    {
        cell.get_or_try_init(|| async move {
            let list: P = self.get(path).await?;
            Ok::<_, Error>(to_table(unpack(list)))
        })
        .await
    }

    async fn project_table<P, F>(
        &self,
        cache: &Mutex<HashMap<u64, LabelTable>>,
        project_id: u64,
        path: String,
        unpack: F,
    ) -> Result<LabelTable>
    where
        P: serde::de::DeserializeOwned,
        F: FnOnce(P) -> Vec<RedmineRef>,
    {
        let mut cache = cache.lock().await;
        if let Some(table) = cache.get(&project_id) {
            return Ok(table.clone());
        }
        let list: P = self.get(&path).await?;
        let table = to_table(unpack(list));
        cache.insert(project_id, table.clone());
        Ok(table)
    }
}

// =============================================================================
// Mapping functions: Redmine types -> core types
// =============================================================================

fn to_table(refs: Vec<RedmineRef>) -> LabelTable {
    refs.into_iter().map(|r| (r.id.to_string(), r.name)).collect()
}

fn map_ref(r: RedmineRef) -> NamedRef {
    NamedRef::new(r.id, r.name)
}

fn map_project(project: RedmineProject) -> SourceProject {
    SourceProject {
        id: project.id,
        name: project.name,
        identifier: project.identifier,
        parent_id: project.parent.map(|p| p.id),
    }
}

fn map_issue(issue: RedmineIssue) -> Issue {
    Issue {
        id: issue.id,
        project: map_ref(issue.project),
        subject: issue.subject,
        description: issue.description,
        status: map_ref(issue.status),
        priority: issue.priority.map(map_ref),
        assigned_to: issue.assigned_to.map(map_ref),
        watchers: issue.watchers.into_iter().map(map_ref).collect(),
        attachments: issue
            .attachments
            .into_iter()
            .map(|a| Attachment {
                id: a.id,
                filename: a.filename,
                content_url: a.content_url,
            })
            .collect(),
        journals: issue
            .journals
            .into_iter()
            .map(|j| JournalEntry {
                id: j.id,
                user: map_ref(j.user),
                created_on: j.created_on,
                notes: j.notes,
                details: j.details,
            })
            .collect(),
    }
}

// =============================================================================
// Trait implementations
// =============================================================================

#[async_trait]
impl SourceTracker for RedmineClient {
    async fn assert_reachable(&self) -> Result<()> {
        let unreachable = |reason: String| Error::Unreachable {
            host: self.base_url.clone(),
            reason,
        };

        let list: RedmineProjectList = match self.get("/projects.json?limit=1").await {
            Ok(list) => list,
            Err(Error::Http(reason)) => return Err(unreachable(reason)),
            Err(e) => return Err(e),
        };

        if list.projects.is_empty() {
            return Err(unreachable(
                "the project list is empty, please verify your credentials".to_string(),
            ));
        }
        Ok(())
    }

    async fn list_projects(&self) -> Result<ProjectListing> {
        let projects = self
            .get_all("/projects.json", |page: RedmineProjectList| {
                (page.projects, page.total_count)
            })
            .await?;

        let projects: Vec<SourceProject> = projects.into_iter().map(map_project).collect();

        let mut cache = self.projects.lock().await;
        for project in &projects {
            cache.entry(project.id).or_insert_with(|| project.clone());
        }

        Ok(ProjectListing::from_projects(
            projects.len() as u64,
            projects,
        ))
    }

    async fn project_details(&self, id: u64) -> Result<SourceProject> {
        let mut cache = self.projects.lock().await;
        if let Some(project) = cache.get(&id) {
            return Ok(project.clone());
        }

        let response: RedmineProjectResponse = self.get(&format!("/projects/{}.json", id)).await?;
        let project = map_project(response.project);
        cache.insert(id, project.clone());
        Ok(project)
    }

    async fn project_members(&self, id: u64) -> Result<Vec<String>> {
        let memberships = self
            .get_all(
                &format!("/projects/{}/memberships.json", id),
                |page: RedmineMembershipList| (page.memberships, page.total_count),
            )
            .await?;

        Ok(memberships
            .into_iter()
            .filter_map(|m| m.user.map(|u| u.name))
            .collect())
    }

    async fn issues_for_project(&self, id: u64) -> Result<Vec<IssueSummary>> {
        let issues = self
            .get_all(
                &format!("/issues.json?project_id={}&status_id=*&sort=id", id),
                |page: RedmineIssueList| (page.issues, page.total_count),
            )
            .await?;

        if issues.is_empty() {
            return Err(Error::NoIssuesFound { project_id: id });
        }

        Ok(issues
            .into_iter()
            .map(|i| IssueSummary {
                id: i.id,
                subject: i.subject,
            })
            .collect())
    }

    async fn issue(&self, id: u64) -> Result<Issue> {
        let response: RedmineIssueResponse = self
            .get(&format!("/issues/{}.json?include={}", id, ISSUE_INCLUDES))
            .await?;
        Ok(map_issue(response.issue))
    }

    async fn download_attachment(&self, content_url: &str) -> Result<Vec<u8>> {
        let bytes = self
            .send(content_url)
            .await?
            .bytes()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl LabelResolver for RedmineClient {
    async fn status_name(&self, id: &str) -> Result<Option<String>> {
        let table = self
            .label_table(&self.statuses, "/issue_statuses.json", |l: RedmineStatusList| {
                l.issue_statuses
            })
            .await?;
        Ok(table.get(id).cloned())
    }

    async fn priority_name(&self, id: &str) -> Result<Option<String>> {
        let table = self
            .label_table(
                &self.priorities,
                "/enumerations/issue_priorities.json",
                |l: RedminePriorityList| l.issue_priorities,
            )
            .await?;
        Ok(table.get(id).cloned())
    }

    async fn tracker_name(&self, id: &str) -> Result<Option<String>> {
        let table = self
            .label_table(&self.trackers, "/trackers.json", |l: RedmineTrackerList| {
                l.trackers
            })
            .await?;
        Ok(table.get(id).cloned())
    }

    async fn custom_field_name(&self, id: &str) -> Result<Option<String>> {
        let table = self
            .label_table(
                &self.custom_fields,
                "/custom_fields.json",
                |l: RedmineCustomFieldList| l.custom_fields,
            )
            .await?;
        Ok(table.get(id).cloned())
    }

    async fn category_name(&self, project_id: u64, id: &str) -> Result<Option<String>> {
        let table = self
            .project_table(
                &self.categories,
                project_id,
                format!("/projects/{}/issue_categories.json", project_id),
                |l: RedmineCategoryList| l.issue_categories,
            )
            .await?;
        Ok(table.get(id).cloned())
    }

    async fn version_name(&self, project_id: u64, id: &str) -> Result<Option<String>> {
        let table = self
            .project_table(
                &self.versions,
                project_id,
                format!("/projects/{}/versions.json", project_id),
                |l: RedmineVersionList| l.versions,
            )
            .await?;
        Ok(table.get(id).cloned())
    }

    async fn user_name(&self, id: &str) -> Result<Option<String>> {
        let mut users = self.users.lock().await;
        if let Some(name) = users.get(id) {
            return Ok(name.clone());
        }

        let name = match self
            .get::<RedmineUserResponse>(&format!("/users/{}.json", id))
            .await
        {
            Ok(response) => {
                let user = response.user;
                let full = format!("{} {}", user.firstname, user.lastname);
                let full = full.trim();
                Some(if full.is_empty() {
                    user.login.unwrap_or_else(|| user.id.to_string())
                } else {
                    full.to_string()
                })
            }
            // Deleted or locked users are gone from the API
            Err(Error::NotFound(_)) => None,
            Err(e) => return Err(e),
        };

        users.insert(id.to_string(), name.clone());
        Ok(name)
    }
}

// =============================================================================
// Tests
// =============================================================================
