//! End-to-end resource lifecycle against a mocked Instatus API.

use hemmer_provider_instatus::component::RESOURCE_TYPE;
use hemmer_provider_instatus::testing::{assert_plan_changes_attribute, ProviderTester, TestError};
use hemmer_provider_instatus::{InstatusProvider, ProviderError};
use serde_json::{json, Value};
use tokio_test::{assert_err, assert_ok};
use wiremock::matchers::{any, body_partial_json, header, method, path};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

const PAGE: &str = "page-1";

/// Matches JSON bodies that do not contain `key` at the top level.
struct BodyLacks(&'static str);

impl Match for BodyLacks {
    fn matches(&self, request: &Request) -> bool {
        serde_json::from_slice::<Value>(&request.body)
            .map(|body| body.get(self.0).is_none())
            .unwrap_or(false)
    }
}

fn component_body(id: &str, status: &str) -> Value {
    json!({
        "id": id,
        "name": "API",
        "description": "Public API",
        "status": status,
        "showUptime": true,
        "order": 2,
        "groupId": null,
        "archived": false,
        "uniqueEmail": format!("{}@instatus.com", id),
        "group": null
    })
}

fn grouped_body(id: &str) -> Value {
    let mut body = component_body(id, "OPERATIONAL");
    body["groupId"] = json!("grp-1");
    body["group"] = json!({"id": "grp-1", "name": "Backend"});
    body
}

async fn configured(server: &MockServer) -> ProviderTester<InstatusProvider> {
    let tester = ProviderTester::new(InstatusProvider::with_env(|_| None));
    assert_ok!(
        tester
            .configure(json!({
                "api_key": "test-key",
                "page_id": PAGE,
                "endpoint": server.uri()
            }))
            .await
    );
    tester
}

async fn mount_get(server: &MockServer, id: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(format!("/v2/{}/components/{}", PAGE, id)))
        .and(header("authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

fn prior_state(id: &str) -> Value {
    json!({
        "id": id,
        "name": "API",
        "description": "Public API",
        "status": "OPERATIONAL",
        "show_uptime": true,
        "order": 2,
        "grouped": false,
        "group_id": null,
        "group_name": null,
        "archived": false,
        "unique_email": format!("{}@instatus.com", id)
    })
}

#[tokio::test]
async fn create_assigns_server_id_and_reads_back() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("/v1/{}/components", PAGE)))
        .and(header("authorization", "Bearer test-key"))
        .and(header("content-type", "application/json"))
        .and(body_partial_json(json!({
            "name": "API",
            "status": "OPERATIONAL",
            "showUptime": true,
            "grouped": false,
            "archived": false
        })))
        .and(BodyLacks("order"))
        .respond_with(ResponseTemplate::new(200).set_body_json(component_body("cmp-1", "OPERATIONAL")))
        .expect(1)
        .mount(&server)
        .await;
    mount_get(&server, "cmp-1", component_body("cmp-1", "OPERATIONAL")).await;

    let tester = configured(&server).await;
    let state = assert_ok!(
        tester
            .lifecycle_create(RESOURCE_TYPE, json!({"name": "API"}))
            .await
    );

    assert_eq!(state["id"], "cmp-1");
    assert_eq!(state["name"], "API");
    assert_eq!(state["status"], "OPERATIONAL");
    assert_eq!(state["show_uptime"], true);
    assert_eq!(state["order"], 2);
    assert_eq!(state["unique_email"], "cmp-1@instatus.com");
}

#[tokio::test]
async fn update_status_is_reflected_on_read() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path(format!("/v2/{}/components/cmp-1", PAGE)))
        .and(body_partial_json(json!({"status": "MAJOROUTAGE", "grouped": false})))
        .and(BodyLacks("order"))
        .and(BodyLacks("groupId"))
        .respond_with(ResponseTemplate::new(200).set_body_json(component_body("cmp-1", "MAJOROUTAGE")))
        .expect(1)
        .mount(&server)
        .await;
    mount_get(&server, "cmp-1", component_body("cmp-1", "MAJOROUTAGE")).await;

    let tester = configured(&server).await;
    let prior = prior_state("cmp-1");
    let mut proposed = prior.clone();
    proposed["status"] = json!("MAJOROUTAGE");

    let plan = assert_ok!(tester.plan_update(RESOURCE_TYPE, prior.clone(), proposed.clone()).await);
    assert_plan_changes_attribute(&plan, "status");

    let state = assert_ok!(tester.lifecycle_update(RESOURCE_TYPE, prior, proposed).await);
    assert_eq!(state["status"], "MAJOROUTAGE");
    assert_eq!(state["id"], "cmp-1");
}

#[tokio::test]
async fn changed_order_is_sent_on_update() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path(format!("/v2/{}/components/cmp-1", PAGE)))
        .and(body_partial_json(json!({"order": 5})))
        .respond_with(ResponseTemplate::new(200).set_body_json(component_body("cmp-1", "OPERATIONAL")))
        .expect(1)
        .mount(&server)
        .await;
    mount_get(&server, "cmp-1", component_body("cmp-1", "OPERATIONAL")).await;

    let tester = configured(&server).await;
    let prior = prior_state("cmp-1");
    let mut planned = prior.clone();
    planned["order"] = json!(5);

    assert_ok!(tester.update(RESOURCE_TYPE, prior, planned).await);
}

#[tokio::test]
async fn partial_update_response_still_refreshes() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path(format!("/v2/{}/components/cmp-1", PAGE)))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"id": "cmp-1", "status": "MAJOROUTAGE"})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/v2/{}/components/cmp-1", PAGE)))
        .respond_with(ResponseTemplate::new(200).set_body_json(component_body("cmp-1", "MAJOROUTAGE")))
        .expect(1)
        .mount(&server)
        .await;

    let tester = configured(&server).await;
    let prior = prior_state("cmp-1");
    let mut planned = prior.clone();
    planned["status"] = json!("MAJOROUTAGE");

    let state = assert_ok!(tester.update(RESOURCE_TYPE, prior, planned).await);
    assert_eq!(state["status"], "MAJOROUTAGE");
    assert_eq!(state["name"], "API");
    assert_eq!(state["description"], "Public API");
}

// An empty description is left out of the request, so the API keeps the old one.
#[tokio::test]
async fn cleared_description_is_not_sent() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path(format!("/v2/{}/components/cmp-1", PAGE)))
        .and(body_partial_json(json!({"name": "API"})))
        .and(BodyLacks("description"))
        .respond_with(ResponseTemplate::new(200).set_body_json(component_body("cmp-1", "OPERATIONAL")))
        .expect(1)
        .mount(&server)
        .await;
    mount_get(&server, "cmp-1", component_body("cmp-1", "OPERATIONAL")).await;

    let tester = configured(&server).await;
    let prior = prior_state("cmp-1");
    let mut proposed = prior.clone();
    proposed["description"] = json!("");

    let plan = assert_ok!(tester.plan_update(RESOURCE_TYPE, prior.clone(), proposed.clone()).await);
    assert_plan_changes_attribute(&plan, "description");

    let state = assert_ok!(tester.update(RESOURCE_TYPE, prior, plan.planned_state).await);
    assert_eq!(state["description"], "Public API");
}

#[tokio::test]
async fn delete_then_read_fails() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path(format!("/v1/{}/components/cmp-1", PAGE)))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/v2/{}/components/cmp-1", PAGE)))
        .respond_with(ResponseTemplate::new(404).set_body_string("Component not found"))
        .mount(&server)
        .await;

    let tester = configured(&server).await;
    assert_ok!(
        tester
            .lifecycle_delete(RESOURCE_TYPE, prior_state("cmp-1"))
            .await
    );

    let err = assert_err!(tester.read(RESOURCE_TYPE, prior_state("cmp-1")).await);
    assert!(matches!(err, ProviderError::NotFound(_)));
    assert_eq!(
        err.message(),
        "error reading component: API request failed with status 404: Component not found"
    );
}

#[tokio::test]
async fn api_errors_keep_status_and_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("/v1/{}/components", PAGE)))
        .respond_with(ResponseTemplate::new(401).set_body_string(r#"{"error":"Invalid API key"}"#))
        .mount(&server)
        .await;

    let tester = configured(&server).await;
    let err = assert_err!(tester.create(RESOURCE_TYPE, json!({"name": "API"})).await);

    assert!(matches!(err, ProviderError::PermissionDenied(_)));
    let text = err.to_string();
    assert!(text.contains("error creating component"));
    assert!(text.contains("401"));
    assert!(text.contains("Invalid API key"));
}

#[tokio::test]
async fn missing_credentials_make_no_requests() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let tester = ProviderTester::new(InstatusProvider::with_env(|_| None));
    let err = assert_err!(tester.configure(json!({"endpoint": server.uri()})).await);
    match err {
        TestError::Diagnostics(diags) => {
            let summaries: Vec<_> = diags.iter().map(|d| d.summary.as_str()).collect();
            assert_eq!(summaries, vec!["Missing API Key", "Missing Page ID"]);
        },
        other => panic!("expected diagnostics, got {}", other),
    }

    let err = assert_err!(tester.create(RESOURCE_TYPE, json!({"name": "API"})).await);
    assert!(matches!(err, ProviderError::Configuration(_)));
}

#[tokio::test]
async fn credentials_fall_back_to_environment() {
    let server = MockServer::start().await;
    mount_get(&server, "cmp-1", component_body("cmp-1", "OPERATIONAL")).await;

    let tester = ProviderTester::new(InstatusProvider::with_env(|var| match var {
        "INSTATUS_API_KEY" => Some("test-key".to_string()),
        "INSTATUS_PAGE_ID" => Some(PAGE.to_string()),
        _ => None,
    }));
    assert_ok!(tester.configure(json!({"endpoint": server.uri()})).await);

    let state = assert_ok!(tester.read(RESOURCE_TYPE, prior_state("cmp-1")).await);
    assert_eq!(state["name"], "API");
}

#[tokio::test]
async fn group_field_naming_differs_between_create_and_update() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("/v1/{}/components", PAGE)))
        .and(body_partial_json(json!({"group": "grp-1", "grouped": true})))
        .and(BodyLacks("groupId"))
        .respond_with(ResponseTemplate::new(200).set_body_json(grouped_body("cmp-2")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(format!("/v2/{}/components/cmp-2", PAGE)))
        .and(body_partial_json(json!({"groupId": "grp-1", "grouped": true})))
        .and(BodyLacks("group"))
        .respond_with(ResponseTemplate::new(200).set_body_json(grouped_body("cmp-2")))
        .expect(1)
        .mount(&server)
        .await;
    mount_get(&server, "cmp-2", grouped_body("cmp-2")).await;

    let tester = configured(&server).await;
    let created = assert_ok!(
        tester
            .create(
                RESOURCE_TYPE,
                json!({"name": "API", "grouped": true, "group_id": "grp-1"}),
            )
            .await
    );
    assert_eq!(created["group_id"], "grp-1");
    assert_eq!(created["group_name"], "Backend");
    assert_eq!(created["grouped"], true);

    // grouped is derived from group_id on update, whatever the config says.
    let mut planned = created.clone();
    planned["grouped"] = json!(false);
    planned["description"] = json!("Renamed");
    let updated = assert_ok!(tester.update(RESOURCE_TYPE, created, planned).await);
    assert_eq!(updated["grouped"], true);
}

#[tokio::test]
async fn import_reads_component_by_id() {
    let server = MockServer::start().await;
    mount_get(&server, "cmp-3", grouped_body("cmp-3")).await;

    let tester = configured(&server).await;
    let imported = assert_ok!(tester.import_resource(RESOURCE_TYPE, "cmp-3").await);

    assert_eq!(imported.len(), 1);
    assert_eq!(imported[0].resource_type, RESOURCE_TYPE);
    assert_eq!(imported[0].state["id"], "cmp-3");
    assert_eq!(imported[0].state["grouped"], true);
    assert_eq!(imported[0].state["group_name"], "Backend");
}

#[tokio::test]
async fn invalid_response_body_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/v2/{}/components/cmp-1", PAGE)))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let tester = configured(&server).await;
    let err = assert_err!(tester.read(RESOURCE_TYPE, prior_state("cmp-1")).await);

    assert!(matches!(err, ProviderError::Sdk(_)));
    assert!(err.message().starts_with("error reading component: error unmarshaling response"));
}
