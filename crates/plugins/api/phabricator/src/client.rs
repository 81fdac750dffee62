//! Conduit API client implementation.

use std::collections::BTreeMap;

use async_trait::async_trait;
use remaim_core::{
    DestinationProject, DestinationTracker, DestinationUser, EditResult, Error, FileInfo,
    NewProject, PhabricatorConfig, ProjectLookup, ProjectPage, Result, Task, TaskEdit,
};
use serde_json::json;
use tracing::{debug, warn};

use crate::types::{
    entries, ConduitEnvelope, ConduitFileInfo, ConduitUser, EditResponse, ManiphestTask,
    ProjectQueryParams, ProjectQueryResult, ProjectSearchResult, QueriedProject, SearchProject,
    StatusesResult,
};

/// Project icon marking user groups.
const GROUP_ICON: &str = "group";

/// Conduit API client.
pub struct ConduitClient {
    base_url: String,
    token: String,
    client: reqwest::Client,
}

impl ConduitClient {
    /// Create a new Conduit client.
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("remaim")
            .build()
            .map_err(|e| Error::Http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            client,
        })
    }

    /// Create a client from the `[phabricator]` config section.
    pub fn from_config(config: &PhabricatorConfig) -> Result<Self> {
        Self::new(&config.url, &config.token)
    }

    /// Base URL without trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Call a Conduit method and decode its `result`.
    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        mut params: serde_json::Value,
    ) -> Result<T> {
        let url = format!("{}/api/{}", self.base_url, method);
        debug!(url = url, method = method, "Conduit POST request");

        if let Some(object) = params.as_object_mut() {
            object.insert("__conduit__".to_string(), json!({ "token": self.token }));
        }
        let form = [
            ("params", serde_json::to_string(&params)?),
            ("output", "json".to_string()),
        ];

        let response = self
            .client
            .post(&url)
            .form(&form)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let envelope: ConduitEnvelope = self.handle_response(response).await?;

        if let Some(code) = envelope.error_code {
            let info = envelope.error_info.unwrap_or_default();
            warn!(method = method, code = %code, info = %info, "Conduit error response");
            return Err(Error::Conduit { code, info });
        }

        serde_json::from_value(envelope.result).map_err(|e| {
            Error::InvalidData(format!("Failed to parse {} result: {}", method, e))
        })
    }

    /// Handle response and map errors.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let status_code = status.as_u16();
            let message = response.text().await.unwrap_or_default();
            warn!(
                status = status_code,
                message = message,
                "Conduit HTTP error response"
            );
            return Err(Error::from_status(status_code, message));
        }

        response
            .json()
            .await
            .map_err(|e| Error::InvalidData(format!("Failed to parse response: {}", e)))
    }

    /// Apply transactions through one of the `*.edit` methods.
    async fn edit(
        &self,
        method: &str,
        object: Option<String>,
        transactions: serde_json::Value,
    ) -> Result<EditResult> {
        let mut params = json!({ "transactions": transactions });
        if let Some(object) = object {
            params["objectIdentifier"] = json!(object);
        }

        let response: EditResponse = self.call(method, params).await?;

        Ok(EditResult {
            id: response.object.id,
            phid: response.object.phid,
        })
    }
}

// =============================================================================
// Mapping functions: Conduit types -> core types
// =============================================================================

fn map_search_project(project: SearchProject) -> DestinationProject {
    DestinationProject {
        id: project.id,
        phid: project.phid,
        name: project.fields.name,
    }
}

fn map_task(task: ManiphestTask) -> Task {
    Task {
        id: task.id,
        phid: task.phid,
        title: task.title,
        description: task.description.unwrap_or_default(),
        status: task.status.unwrap_or_default(),
        status_name: task.status_name,
        priority: task.priority,
    }
}

// =============================================================================
// Trait implementation
// =============================================================================

#[async_trait]
impl DestinationTracker for ConduitClient {
    async fn query_statuses(&self) -> Result<BTreeMap<String, String>> {
        let result: StatusesResult = self.call("maniphest.querystatuses", json!({})).await?;
        Ok(result
            .status_map
            .into_iter()
            .map(|(key, label)| (label, key))
            .collect())
    }

    async fn search_group_projects(&self) -> Result<Vec<DestinationProject>> {
        let result: ProjectSearchResult = self
            .call(
                "project.search",
                json!({ "constraints": { "icons": [GROUP_ICON] } }),
            )
            .await?;
        Ok(result.data.into_iter().map(map_search_project).collect())
    }

    async fn search_all_projects(&self, after: Option<String>) -> Result<ProjectPage> {
        let mut params = json!({ "queryKey": "all" });
        if let Some(after) = after {
            params["after"] = json!(after);
        }

        let result: ProjectSearchResult = self.call("project.search", params).await?;
        Ok(ProjectPage {
            data: result.data.into_iter().map(map_search_project).collect(),
            after: result.cursor.after,
        })
    }

    async fn find_project(&self, lookup: ProjectLookup) -> Result<Option<DestinationProject>> {
        let params = match lookup {
            ProjectLookup::Ids(ids) => ProjectQueryParams {
                ids: Some(ids),
                ..Default::default()
            },
            ProjectLookup::Slugs(slugs) => ProjectQueryParams {
                slugs: Some(slugs),
                ..Default::default()
            },
        };

        let result: ProjectQueryResult = self
            .call("project.query", serde_json::to_value(params)?)
            .await?;
        let found: Vec<QueriedProject> = entries(result.data)?;

        Ok(found.into_iter().last().map(|p| DestinationProject {
            id: p.id,
            phid: p.phid,
            name: p.name,
        }))
    }

    async fn create_project(&self, project: NewProject) -> Result<EditResult> {
        let transactions = json!([
            { "type": "name", "value": project.name },
            { "type": "members.add", "value": project.members },
            { "type": "view", "value": project.policies.view },
            { "type": "edit", "value": project.policies.edit },
            { "type": "join", "value": project.policies.view },
        ]);
        self.edit("project.edit", None, transactions).await
    }

    async fn query_users_by_real_name(&self, names: Vec<String>) -> Result<Vec<DestinationUser>> {
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let result: serde_json::Value = self
            .call("user.query", json!({ "realnames": names }))
            .await?;
        let users: Vec<ConduitUser> = entries(result)?;

        Ok(users
            .into_iter()
            .map(|u| DestinationUser {
                real_name: u.real_name,
                phid: u.phid,
            })
            .collect())
    }

    async fn upload_file(
        &self,
        name: &str,
        data_base64: &str,
        view_policy: &str,
    ) -> Result<String> {
        self.call(
            "file.upload",
            json!({
                "name": name,
                "data_base64": data_base64,
                "viewPolicy": view_policy,
            }),
        )
        .await
    }

    async fn file_info(&self, phid: &str) -> Result<FileInfo> {
        let info: ConduitFileInfo = self.call("file.info", json!({ "phid": phid })).await?;
        Ok(FileInfo {
            phid: info.phid,
            object_name: info.object_name,
        })
    }

    async fn search_tasks(&self, project_phid: &str, text: &str) -> Result<Vec<Task>> {
        let result: serde_json::Value = self
            .call(
                "maniphest.query",
                json!({
                    "projectPHIDs": [project_phid],
                    "fullText": text,
                }),
            )
            .await?;
        let tasks: Vec<ManiphestTask> = entries(result)?;
        Ok(tasks.into_iter().map(map_task).collect())
    }

    async fn edit_task(&self, edit: TaskEdit) -> Result<EditResult> {
        let transactions = serde_json::to_value(&edit.transactions)?;
        self.edit("maniphest.edit", edit.object_identifier, transactions)
            .await
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use remaim_core::{Policies, Transaction, TransactionKind};

    #[test]
    fn test_base_url_trailing_slash() {
        let client = ConduitClient::new("https://phab.example.com/", "api-token").unwrap();
        assert_eq!(client.base_url(), "https://phab.example.com");
    }

    #[test]
    fn test_map_task_defaults() {
        let task: ManiphestTask = serde_json::from_value(json!({
            "id": "3", "phid": "PHID-TASK-3", "title": "Broken", "statusName": "Open"
        }))
        .unwrap();
        let task = map_task(task);
        assert_eq!(task.description, "");
        assert_eq!(task.status_name.as_deref(), Some("Open"));
    }

    // =========================================================================
    // Integration tests with httpmock
    // =========================================================================

    mod integration {
        use super::*;
        use httpmock::prelude::*;

        fn create_test_client(server: &MockServer) -> ConduitClient {
            ConduitClient::new(server.base_url(), "api-token").unwrap()
        }

        #[tokio::test]
        async fn test_query_statuses_flipped() {
            let server = MockServer::start();
            let mock = server.mock(|when, then| {
                when.method(POST)
                    .path("/api/maniphest.querystatuses")
                    .body_includes("output=json")
                    .body_includes("api-token");
                then.status(200).json_body(json!({
                    "result": {
                        "defaultStatus": "open",
                        "statusMap": {"open": "Open", "resolved": "Resolved"}
                    },
                    "error_code": null,
                    "error_info": null
                }));
            });

            let client = create_test_client(&server);
            let statuses = client.query_statuses().await.unwrap();

            mock.assert();
            assert_eq!(statuses.get("Open").map(String::as_str), Some("open"));
            assert_eq!(statuses.get("Resolved").map(String::as_str), Some("resolved"));
        }

        #[tokio::test]
        async fn test_conduit_error_envelope() {
            let server = MockServer::start();
            server.mock(|when, then| {
                when.method(POST).path("/api/maniphest.querystatuses");
                then.status(200).json_body(json!({
                    "result": null,
                    "error_code": "ERR-INVALID-AUTH",
                    "error_info": "API token is invalid."
                }));
            });

            let client = create_test_client(&server);
            let result = client.query_statuses().await;
            assert!(matches!(
                result,
                Err(Error::Conduit { code, .. }) if code == "ERR-INVALID-AUTH"
            ));
        }

        #[tokio::test]
        async fn test_http_error() {
            let server = MockServer::start();
            server.mock(|when, then| {
                when.method(POST).path("/api/maniphest.querystatuses");
                then.status(500).body("boom");
            });

            let client = create_test_client(&server);
            let result = client.query_statuses().await;
            assert!(matches!(result, Err(Error::Api { status: 500, .. })));
        }

        #[tokio::test]
        async fn test_search_all_projects_cursor() {
            let server = MockServer::start();
            server.mock(|when, then| {
                when.method(POST)
                    .path("/api/project.search")
                    .body_includes("queryKey");
                then.status(200).json_body(json!({
                    "result": {
                        "data": [
                            {"id": 1, "type": "PROJ", "phid": "PHID-PROJ-1", "fields": {"name": "Website"}}
                        ],
                        "cursor": {"limit": 100, "after": "1", "before": null}
                    },
                    "error_code": null,
                    "error_info": null
                }));
            });

            let client = create_test_client(&server);
            let page = client.search_all_projects(None).await.unwrap();
            assert_eq!(page.data[0].name, "Website");
            assert_eq!(page.after.as_deref(), Some("1"));
        }

        #[tokio::test]
        async fn test_search_group_projects() {
            let server = MockServer::start();
            let mock = server.mock(|when, then| {
                when.method(POST)
                    .path("/api/project.search")
                    .body_includes("icons");
                then.status(200).json_body(json!({
                    "result": {
                        "data": [
                            {"id": 4, "phid": "PHID-PROJ-4", "fields": {"name": "Staff"}}
                        ],
                        "cursor": {"after": null}
                    },
                    "error_code": null,
                    "error_info": null
                }));
            });

            let client = create_test_client(&server);
            let groups = client.search_group_projects().await.unwrap();
            mock.assert();
            assert_eq!(groups[0].phid, "PHID-PROJ-4");
        }

        #[tokio::test]
        async fn test_find_project_not_found() {
            let server = MockServer::start();
            server.mock(|when, then| {
                when.method(POST).path("/api/project.query");
                then.status(200).json_body(json!({
                    "result": {"data": [], "slugMap": [], "cursor": {}},
                    "error_code": null,
                    "error_info": null
                }));
            });

            let client = create_test_client(&server);
            let found = client
                .find_project(ProjectLookup::Slugs(vec!["missing".into()]))
                .await
                .unwrap();
            assert!(found.is_none());
        }

        #[tokio::test]
        async fn test_find_project_by_id() {
            let server = MockServer::start();
            server.mock(|when, then| {
                when.method(POST)
                    .path("/api/project.query")
                    .body_includes("ids");
                then.status(200).json_body(json!({
                    "result": {
                        "data": {
                            "PHID-PROJ-9": {"id": "9", "phid": "PHID-PROJ-9", "name": "Website"}
                        }
                    },
                    "error_code": null,
                    "error_info": null
                }));
            });

            let client = create_test_client(&server);
            let found = client
                .find_project(ProjectLookup::Ids(vec![9]))
                .await
                .unwrap()
                .unwrap();
            assert_eq!(found.id, 9);
            assert_eq!(found.name, "Website");
        }

        #[tokio::test]
        async fn test_create_project() {
            let server = MockServer::start();
            let mock = server.mock(|when, then| {
                when.method(POST)
                    .path("/api/project.edit")
                    .body_includes("members.add")
                    .body_includes("PHID-USER-1");
                then.status(200).json_body(json!({
                    "result": {"object": {"id": 12, "phid": "PHID-PROJ-12"}, "transactions": []},
                    "error_code": null,
                    "error_info": null
                }));
            });

            let client = create_test_client(&server);
            let created = client
                .create_project(NewProject {
                    name: "Website".into(),
                    members: vec!["PHID-USER-1".into()],
                    policies: Policies::uniform("PHID-PROJ-4"),
                })
                .await
                .unwrap();

            mock.assert();
            assert_eq!(created.id, 12);
            assert_eq!(created.phid, "PHID-PROJ-12");
        }

        #[tokio::test]
        async fn test_query_users_skips_empty_request() {
            let server = MockServer::start();
            let mock = server.mock(|when, then| {
                when.method(POST).path("/api/user.query");
                then.status(200)
                    .json_body(json!({"result": [], "error_code": null, "error_info": null}));
            });

            let client = create_test_client(&server);
            let users = client.query_users_by_real_name(vec![]).await.unwrap();
            assert!(users.is_empty());
            mock.assert_hits(0);
        }

        #[tokio::test]
        async fn test_query_users() {
            let server = MockServer::start();
            server.mock(|when, then| {
                when.method(POST)
                    .path("/api/user.query")
                    .body_includes("realnames");
                then.status(200).json_body(json!({
                    "result": [
                        {"phid": "PHID-USER-1", "userName": "marie", "realName": "Marie Curie"}
                    ],
                    "error_code": null,
                    "error_info": null
                }));
            });

            let client = create_test_client(&server);
            let users = client
                .query_users_by_real_name(vec!["Marie Curie".into(), "Nobody".into()])
                .await
                .unwrap();
            assert_eq!(
                users,
                vec![DestinationUser {
                    real_name: "Marie Curie".into(),
                    phid: "PHID-USER-1".into()
                }]
            );
        }

        #[tokio::test]
        async fn test_upload_file_and_info() {
            let server = MockServer::start();
            server.mock(|when, then| {
                when.method(POST)
                    .path("/api/file.upload")
                    .body_includes("viewPolicy");
                then.status(200).json_body(json!({
                    "result": "PHID-FILE-1",
                    "error_code": null,
                    "error_info": null
                }));
            });
            server.mock(|when, then| {
                when.method(POST).path("/api/file.info");
                then.status(200).json_body(json!({
                    "result": {"id": "1", "phid": "PHID-FILE-1", "objectName": "F1", "name": "trace.log"},
                    "error_code": null,
                    "error_info": null
                }));
            });

            let client = create_test_client(&server);
            let phid = client
                .upload_file("trace.log", "bG9n", "PHID-PROJ-4")
                .await
                .unwrap();
            let info = client.file_info(&phid).await.unwrap();
            assert_eq!(info.object_name, "F1");
        }

        #[tokio::test]
        async fn test_search_tasks_empty_array() {
            let server = MockServer::start();
            server.mock(|when, then| {
                when.method(POST)
                    .path("/api/maniphest.query")
                    .body_includes("fullText");
                then.status(200)
                    .json_body(json!({"result": [], "error_code": null, "error_info": null}));
            });

            let client = create_test_client(&server);
            let tasks = client.search_tasks("PHID-PROJ-1", "login").await.unwrap();
            assert!(tasks.is_empty());
        }

        #[tokio::test]
        async fn test_search_tasks_map() {
            let server = MockServer::start();
            server.mock(|when, then| {
                when.method(POST).path("/api/maniphest.query");
                then.status(200).json_body(json!({
                    "result": {
                        "PHID-TASK-5": {
                            "id": "5", "phid": "PHID-TASK-5", "title": "Fix the login",
                            "description": "Log in", "status": "open", "statusName": "Open",
                            "priority": "Normal"
                        }
                    },
                    "error_code": null,
                    "error_info": null
                }));
            });

            let client = create_test_client(&server);
            let tasks = client.search_tasks("PHID-PROJ-1", "Log in").await.unwrap();
            assert_eq!(tasks.len(), 1);
            assert_eq!(tasks[0].id, "5");
            assert_eq!(tasks[0].description, "Log in");
        }

        #[tokio::test]
        async fn test_edit_task() {
            let server = MockServer::start();
            let mock = server.mock(|when, then| {
                when.method(POST)
                    .path("/api/maniphest.edit")
                    .body_includes("objectIdentifier")
                    .body_includes("PHID-TASK-5")
                    .body_includes("projects.set");
                then.status(200).json_body(json!({
                    "result": {"object": {"id": 5, "phid": "PHID-TASK-5"}, "transactions": []},
                    "error_code": null,
                    "error_info": null
                }));
            });

            let client = create_test_client(&server);
            let result = client
                .edit_task(TaskEdit {
                    object_identifier: Some("PHID-TASK-5".into()),
                    transactions: vec![Transaction::list(
                        TransactionKind::ProjectsSet,
                        vec!["PHID-PROJ-1".into()],
                    )],
                })
                .await
                .unwrap();

            mock.assert();
            assert_eq!(result.phid, "PHID-TASK-5");
        }
    }
}
