//! Instatus REST API client.
//!
//! A thin async wrapper over `reqwest` that authenticates every request with a
//! bearer token, encodes and decodes JSON payloads, and turns non-2xx responses
//! into [`ApiError::Status`] carrying the status code and raw body.
//!
//! The API names the group relationship differently depending on the call:
//! create requests send it as `group`, update requests send it as `groupId`,
//! and reads return `groupId` plus a nested `group` object. The request types
//! below encode that asymmetry so callers cannot mix them up.

use std::time::Duration;

use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Default Instatus API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.instatus.com";

/// Default timeout applied to every request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors returned by [`InstatusClient`].
#[derive(Debug, Error)]
pub enum ApiError {
    /// The underlying HTTP client could not be constructed.
    #[error("error creating HTTP client: {0}")]
    Build(#[source] reqwest::Error),

    /// The request body could not be serialized.
    #[error("error marshaling request body: {0}")]
    Encode(#[source] serde_json::Error),

    /// The request could not be sent or the response body could not be read.
    #[error("error making request: {0}")]
    Request(#[source] reqwest::Error),

    /// The API answered with a non-2xx status.
    #[error("API request failed with status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// The response body did not match the expected shape.
    #[error("error unmarshaling response: {0}")]
    Decode(#[source] serde_json::Error),
}

impl ApiError {
    /// The HTTP status code, if the API answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Component status values accepted by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum ComponentStatus {
    /// Everything works.
    #[default]
    Operational,
    /// Planned maintenance is in progress.
    UnderMaintenance,
    /// Working, but slower than usual.
    DegradedPerformance,
    /// Some functionality is unavailable.
    PartialOutage,
    /// The component is down.
    MajorOutage,
}

impl ComponentStatus {
    /// Every status, in severity order.
    pub const ALL: [ComponentStatus; 5] = [
        Self::Operational,
        Self::UnderMaintenance,
        Self::DegradedPerformance,
        Self::PartialOutage,
        Self::MajorOutage,
    ];

    /// The wire name of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Operational => "OPERATIONAL",
            Self::UnderMaintenance => "UNDERMAINTENANCE",
            Self::DegradedPerformance => "DEGRADEDPERFORMANCE",
            Self::PartialOutage => "PARTIALOUTAGE",
            Self::MajorOutage => "MAJOROUTAGE",
        }
    }

    /// Parse a wire name. Matching is exact.
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == value)
    }
}

impl std::fmt::Display for ComponentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of `POST /v1/{page}/components`.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CreateComponentRequest {
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub status: String,
    pub show_uptime: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    pub grouped: bool,
    /// Parent group ID, sent as `group` on create.
    #[serde(rename = "group", skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    pub archived: bool,
}

/// Body of `PUT /v2/{page}/components/{id}`.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateComponentRequest {
    pub name: String,
    /// Omitted when empty; an update cannot clear the description.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub status: String,
    pub show_uptime: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    pub grouped: bool,
    /// Parent group ID, sent as `groupId` on update.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    pub archived: bool,
}

/// Component as returned by the API.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentResponse {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub show_uptime: Option<bool>,
    #[serde(default)]
    pub order: Option<i64>,
    #[serde(default)]
    pub group_id: Option<String>,
    #[serde(default)]
    pub archived: Option<bool>,
    #[serde(default)]
    pub unique_email: Option<String>,
    #[serde(default)]
    pub group: Option<GroupRef>,
}

/// The nested group object on read responses.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GroupRef {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// A component with nullable API fields resolved.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    pub id: String,
    pub name: String,
    pub description: String,
    pub status: String,
    pub show_uptime: bool,
    pub order: i64,
    pub group_id: Option<String>,
    pub group_name: Option<String>,
    pub archived: bool,
    pub unique_email: Option<String>,
}

impl From<ComponentResponse> for Component {
    fn from(resp: ComponentResponse) -> Self {
        Self {
            id: resp.id,
            name: resp.name,
            description: resp.description.unwrap_or_default(),
            status: resp.status,
            show_uptime: resp.show_uptime.unwrap_or_default(),
            order: resp.order.unwrap_or_default(),
            group_id: resp.group_id.filter(|id| !id.is_empty()),
            group_name: resp.group.and_then(|g| g.name).filter(|n| !n.is_empty()),
            archived: resp.archived.unwrap_or_default(),
            unique_email: resp.unique_email.filter(|e| !e.is_empty()),
        }
    }
}

/// Connection settings for [`InstatusClient`].
#[derive(Clone)]
pub struct ClientConfig {
    /// Bearer token sent with every request.
    pub api_key: String,
    /// Status page whose components are managed.
    pub page_id: String,
    /// API base URL, without a trailing path.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl ClientConfig {
    /// Settings for the public API with the default timeout.
    pub fn new(api_key: impl Into<String>, page_id: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            page_id: page_id.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Point the client at a different API host.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Override the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

// The API key must never end up in logs.
impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &"<redacted>")
            .field("page_id", &self.page_id)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Client for the Instatus components API of a single status page.
#[derive(Debug, Clone)]
pub struct InstatusClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl InstatusClient {
    /// Build a client from the given settings.
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let user_agent = format!("hemmer-provider-instatus/{}", env!("CARGO_PKG_VERSION"));
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(user_agent)
            .build()
            .map_err(ApiError::Build)?;

        Ok(Self { http, config })
    }

    /// The status page this client manages.
    pub fn page_id(&self) -> &str {
        &self.config.page_id
    }

    /// Create a component. The returned component carries the server-assigned ID.
    pub async fn create_component(
        &self,
        component: &CreateComponentRequest,
    ) -> Result<Component, ApiError> {
        let path = format!("/v1/{}/components", self.config.page_id);
        let resp: ComponentResponse = self.send(Method::POST, &path, Some(component)).await?;
        Ok(resp.into())
    }

    /// Fetch a component by ID.
    pub async fn get_component(&self, component_id: &str) -> Result<Component, ApiError> {
        let path = format!("/v2/{}/components/{}", self.config.page_id, component_id);
        let resp: ComponentResponse = self.send(Method::GET, &path, None::<&()>).await?;
        Ok(resp.into())
    }

    /// Update a component in place.
    ///
    /// The response body is not decoded; callers read the component back.
    pub async fn update_component(
        &self,
        component_id: &str,
        component: &UpdateComponentRequest,
    ) -> Result<(), ApiError> {
        let path = format!("/v2/{}/components/{}", self.config.page_id, component_id);
        self.execute(Method::PUT, &path, Some(component)).await?;
        Ok(())
    }

    /// Delete a component.
    pub async fn delete_component(&self, component_id: &str) -> Result<(), ApiError> {
        let path = format!("/v1/{}/components/{}", self.config.page_id, component_id);
        self.execute(Method::DELETE, &path, None::<&()>).await?;
        Ok(())
    }

    async fn send<B, T>(&self, method: Method, path: &str, body: Option<&B>) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let bytes = self.execute(method, path, body).await?;
        serde_json::from_slice(&bytes).map_err(ApiError::Decode)
    }

    /// Perform one authenticated round trip and return the raw 2xx body.
    async fn execute<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Vec<u8>, ApiError>
    where
        B: Serialize + ?Sized,
    {
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), path);
        debug!(method = %method, path = %path, "Sending Instatus API request");

        let mut request = self
            .http
            .request(method.clone(), &url)
            .bearer_auth(&self.config.api_key)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(body) = body {
            let encoded = serde_json::to_vec(body).map_err(ApiError::Encode)?;
            request = request.body(encoded);
        }

        let response = request.send().await.map_err(ApiError::Request)?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(ApiError::Request)?;

        debug!(method = %method, path = %path, status = status.as_u16(), "Instatus API responded");

        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }

        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> InstatusClient {
        InstatusClient::new(ClientConfig::new("test-key", "page-1").with_base_url(server.uri()))
            .unwrap()
    }

    fn component_json(id: &str) -> serde_json::Value {
        json!({
            "id": id,
            "name": "API",
            "description": "Public API",
            "status": "OPERATIONAL",
            "showUptime": true,
            "order": 3,
            "groupId": null,
            "archived": false,
            "uniqueEmail": "api-123@instatus.com"
        })
    }

    #[test]
    fn test_status_wire_names() {
        assert_eq!(ComponentStatus::UnderMaintenance.as_str(), "UNDERMAINTENANCE");
        assert_eq!(
            serde_json::to_value(ComponentStatus::DegradedPerformance).unwrap(),
            json!("DEGRADEDPERFORMANCE")
        );
        assert_eq!(ComponentStatus::parse("MAJOROUTAGE"), Some(ComponentStatus::MajorOutage));
        assert_eq!(ComponentStatus::parse("operational"), None);
        assert_eq!(ComponentStatus::default(), ComponentStatus::Operational);
    }

    #[test]
    fn test_create_request_uses_group_field() {
        let req = CreateComponentRequest {
            name: "API".to_string(),
            status: "OPERATIONAL".to_string(),
            show_uptime: true,
            grouped: true,
            group_id: Some("grp-1".to_string()),
            ..Default::default()
        };

        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["group"], "grp-1");
        assert!(value.get("groupId").is_none());
        assert!(value.get("order").is_none());
        assert!(value.get("description").is_none());
        assert_eq!(value["showUptime"], true);
    }

    #[test]
    fn test_update_request_uses_group_id_field() {
        let req = UpdateComponentRequest {
            name: "API".to_string(),
            status: "OPERATIONAL".to_string(),
            grouped: true,
            group_id: Some("grp-1".to_string()),
            order: Some(4),
            ..Default::default()
        };

        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["groupId"], "grp-1");
        assert!(value.get("group").is_none());
        assert_eq!(value["order"], 4);
    }

    #[test]
    fn test_response_extracts_group_name() {
        let resp: ComponentResponse = serde_json::from_value(json!({
            "id": "cmp-1",
            "name": "Database",
            "description": null,
            "status": "PARTIALOUTAGE",
            "showUptime": false,
            "order": 2,
            "groupId": "grp-1",
            "archived": false,
            "group": {"id": "grp-1", "name": "Backend"}
        }))
        .unwrap();

        let component = Component::from(resp);
        assert_eq!(component.group_id.as_deref(), Some("grp-1"));
        assert_eq!(component.group_name.as_deref(), Some("Backend"));
        assert_eq!(component.description, "");
        assert_eq!(component.unique_email, None);
    }

    #[test]
    fn test_config_debug_redacts_key() {
        let config = ClientConfig::new("secret-key", "page-1");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("secret-key"));
        assert!(debug.contains("page-1"));
    }

    #[tokio::test]
    async fn test_create_component_sends_auth_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/page-1/components"))
            .and(header("authorization", "Bearer test-key"))
            .and(header("content-type", "application/json"))
            .and(body_json(json!({
                "name": "API",
                "status": "OPERATIONAL",
                "showUptime": true,
                "grouped": false,
                "archived": false
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(component_json("cmp-1")))
            .expect(1)
            .mount(&server)
            .await;

        let created = client_for(&server)
            .create_component(&CreateComponentRequest {
                name: "API".to_string(),
                status: "OPERATIONAL".to_string(),
                show_uptime: true,
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(created.id, "cmp-1");
        assert_eq!(created.order, 3);
    }

    #[tokio::test]
    async fn test_get_component_uses_v2_path() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/page-1/components/cmp-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(component_json("cmp-1")))
            .mount(&server)
            .await;

        let component = client_for(&server).get_component("cmp-1").await.unwrap();
        assert_eq!(component.name, "API");
        assert_eq!(component.unique_email.as_deref(), Some("api-123@instatus.com"));
    }

    #[tokio::test]
    async fn test_not_found_carries_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/page-1/components/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Component not found"))
            .mount(&server)
            .await;

        let err = client_for(&server).get_component("missing").await.unwrap_err();
        assert_eq!(err.status(), Some(404));
        assert_eq!(
            err.to_string(),
            "API request failed with status 404: Component not found"
        );
    }

    #[tokio::test]
    async fn test_invalid_json_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/page-1/components/cmp-1"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = client_for(&server).get_component("cmp-1").await.unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[test]
    fn test_response_tolerates_missing_fields() {
        let resp: ComponentResponse =
            serde_json::from_value(json!({"id": "cmp-1", "status": "MAJOROUTAGE"})).unwrap();
        assert_eq!(resp.name, "");
        assert_eq!(resp.status, "MAJOROUTAGE");
    }

    #[tokio::test]
    async fn test_update_component_ignores_response_body() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/v2/page-1/components/cmp-1"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server)
            .update_component(
                "cmp-1",
                &UpdateComponentRequest {
                    name: "API".to_string(),
                    status: "MAJOROUTAGE".to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_delete_component_uses_v1_path() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/v1/page-1/components/cmp-1"))
            .respond_with(ResponseTemplate::new(200).set_body_string(""))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server).delete_component("cmp-1").await.unwrap();
    }

    #[tokio::test]
    async fn test_unreachable_host_is_request_error() {
        let client = InstatusClient::new(
            ClientConfig::new("test-key", "page-1").with_base_url("http://127.0.0.1:1"),
        )
        .unwrap();

        let err = client.get_component("cmp-1").await.unwrap_err();
        assert!(matches!(err, ApiError::Request(_)));
        assert_eq!(err.status(), None);
    }

    #[tokio::test]
    async fn test_slow_response_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/page-1/components/cmp-1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"id": "cmp-1", "name": "API", "status": "OPERATIONAL"}))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let client = InstatusClient::new(
            ClientConfig::new("test-key", "page-1")
                .with_base_url(server.uri())
                .with_timeout(Duration::from_millis(100)),
        )
        .unwrap();
        assert_eq!(client.page_id(), "page-1");

        let err = client.get_component("cmp-1").await.unwrap_err();
        match err {
            ApiError::Request(source) => assert!(source.is_timeout()),
            other => panic!("expected a timeout, got {:?}", other),
        }
    }
}
