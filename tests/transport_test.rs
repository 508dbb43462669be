//! HTTP transport tests against a local mock server.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

use resim::domain::models::requests::{MetricsConfigUpdate, TemplateUpload};
use resim::domain::ports::{MetricsConfigApi, PlatformError, ProjectsApi};
use resim::infrastructure::api::{build_http_client, ApiClient, ApiClientConfig, HttpPlatform, RetryPolicy};
use resim::infrastructure::auth::{AuthError, TokenProvider};

/// Hands out "stale" until asked to refresh, then "fresh".
#[derive(Default)]
struct RotatingTokens {
    refreshes: AtomicUsize,
}

#[async_trait]
impl TokenProvider for RotatingTokens {
    async fn token(&self) -> Result<String, AuthError> {
        Ok(if self.refreshes.load(Ordering::SeqCst) == 0 {
            "stale".to_string()
        } else {
            "fresh".to_string()
        })
    }

    async fn refresh(&self) -> Result<String, AuthError> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        Ok("fresh".to_string())
    }
}

fn platform(server: &MockServer, tokens: Arc<RotatingTokens>) -> HttpPlatform {
    let http = build_http_client(Duration::from_secs(5)).unwrap();
    let client = ApiClient::new(
        http,
        ApiClientConfig {
            base_url: format!("{}/v1", server.uri()),
            retry: RetryPolicy::new(
                3,
                Duration::from_millis(1),
                Duration::from_millis(10),
                Duration::from_secs(5),
            ),
        },
        tokens,
    )
    .unwrap();
    HttpPlatform::new(client)
}

fn project_json(id: Uuid, name: &str) -> serde_json::Value {
    json!({ "projectID": id, "name": name, "description": "d" })
}

#[tokio::test]
async fn test_list_follows_page_tokens() {
    let server = MockServer::start().await;
    let (first, second) = (Uuid::new_v4(), Uuid::new_v4());
    Mock::given(method("GET"))
        .and(path("/v1/projects"))
        .and(query_param_is_missing("pageToken"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [project_json(first, "alpha")],
            "nextPageToken": "page-2",
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/projects"))
        .and(query_param("pageToken", "page-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [project_json(second, "beta")],
            "nextPageToken": "",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let projects = platform(&server, Arc::default())
        .list_projects(None)
        .await
        .unwrap();
    let ids: Vec<Uuid> = projects.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![first, second]);
}

#[tokio::test]
async fn test_name_filter_sent_as_query() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();
    Mock::given(method("GET"))
        .and(path("/v1/projects"))
        .and(query_param("name", "alpha"))
        .and(query_param("pageSize", "100"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "items": [project_json(id, "alpha")] })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let projects = platform(&server, Arc::default())
        .list_projects(Some("alpha"))
        .await
        .unwrap();
    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0].name, "alpha");
}

#[tokio::test]
async fn test_unauthorized_refreshes_token_once() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();
    Mock::given(method("GET"))
        .and(path(format!("/v1/projects/{id}")))
        .and(header("authorization", "Bearer stale"))
        .respond_with(ResponseTemplate::new(401).set_body_string("token expired"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/v1/projects/{id}")))
        .and(header("authorization", "Bearer fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(project_json(id, "alpha")))
        .expect(1)
        .mount(&server)
        .await;

    let tokens = Arc::new(RotatingTokens::default());
    let project = platform(&server, tokens.clone())
        .get_project(id)
        .await
        .unwrap();
    assert_eq!(project.id, id);
    assert_eq!(tokens.refreshes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_repeated_unauthorized_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad credentials"))
        .expect(2)
        .mount(&server)
        .await;

    let err = platform(&server, Arc::default())
        .get_project(Uuid::new_v4())
        .await
        .unwrap_err();
    assert_eq!(err, PlatformError::Unauthorized("bad credentials".to_string()));
}

#[tokio::test]
async fn test_server_errors_are_retried() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();
    Mock::given(method("GET"))
        .and(path(format!("/v1/projects/{id}")))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/v1/projects/{id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(project_json(id, "alpha")))
        .expect(1)
        .mount(&server)
        .await;

    let project = platform(&server, Arc::default())
        .get_project(id)
        .await
        .unwrap();
    assert_eq!(project.name, "alpha");
}

#[tokio::test]
async fn test_retries_stop_at_attempt_cap() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(3)
        .mount(&server)
        .await;

    let err = platform(&server, Arc::default())
        .get_project(Uuid::new_v4())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        PlatformError::Server {
            status: 500,
            body: "boom".to_string()
        }
    );
}

#[tokio::test]
async fn test_client_errors_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/projects"))
        .respond_with(ResponseTemplate::new(400).set_body_string("name is required"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such project"))
        .expect(1)
        .mount(&server)
        .await;

    let platform = platform(&server, Arc::default());
    let err = platform
        .create_project(&resim::domain::models::requests::NewProject {
            name: String::new(),
            description: "d".into(),
        })
        .await
        .unwrap_err();
    assert_eq!(
        err,
        PlatformError::Rejected {
            status: 400,
            body: "name is required".to_string()
        }
    );

    let err = platform.get_project(Uuid::new_v4()).await.unwrap_err();
    assert_eq!(err, PlatformError::NotFound("no such project".to_string()));
}

#[tokio::test]
async fn test_metrics_config_uses_graphql() {
    let server = MockServer::start().await;
    let project = Uuid::new_v4();
    Mock::given(method("POST"))
        .and(path("/v1/graphql"))
        .and(body_partial_json(json!({
            "variables": {
                "projectID": project,
                "config": "version: 1\n",
                "templateNames": ["summary.liquid"],
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "updateMetricsConfig": {
                    "templateUploads": [
                        { "name": "summary.liquid", "uploadUrl": format!("{}/upload/summary", server.uri()) }
                    ]
                }
            }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/upload/summary"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let platform = platform(&server, Arc::default());
    let uploads = platform
        .sync_metrics_config(
            project,
            &MetricsConfigUpdate {
                config: "version: 1\n".into(),
                template_names: vec!["summary.liquid".into()],
                branch: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(
        uploads,
        vec![TemplateUpload {
            name: "summary.liquid".into(),
            upload_url: format!("{}/upload/summary", server.uri()),
        }]
    );
    platform
        .upload_template(&uploads[0], b"{{ value }}".to_vec())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_graphql_errors_are_rejections() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/graphql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": null,
            "errors": [{ "message": "unknown template" }],
        })))
        .mount(&server)
        .await;

    let err = platform(&server, Arc::default())
        .sync_metrics_config(
            Uuid::new_v4(),
            &MetricsConfigUpdate {
                config: "version: 1\n".into(),
                template_names: vec![],
                branch: None,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(
        err,
        PlatformError::Rejected {
            status: 400,
            body: "unknown template".to_string()
        }
    );
}

#[tokio::test]
async fn test_replay_after_refresh_shares_attempt_budget() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();
    Mock::given(method("GET"))
        .and(path(format!("/v1/projects/{id}")))
        .and(header("authorization", "Bearer stale"))
        .respond_with(ResponseTemplate::new(401).set_body_string("token expired"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/v1/projects/{id}")))
        .and(header("authorization", "Bearer fresh"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(2)
        .mount(&server)
        .await;

    let err = platform(&server, Arc::default())
        .get_project(id)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        PlatformError::Server {
            status: 500,
            body: "boom".to_string()
        }
    );
}
