use std::sync::Arc;

use notebook_agent::store::{DeviceCodeAuth, DestinationStore, GraphStore, StaticToken, TokenProvider};
use notebook_agent::{AgentError, GraphConfig};
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_inventory(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/me/onenote/notebooks"))
        .and(header("Authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [
                {"id": "nb-1", "displayName": "Work"},
                {"id": "nb-2", "displayName": "Personal"}
            ]
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/me/onenote/notebooks/nb-1/sections"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [
                {"id": "sec-1", "displayName": "Meetings"},
                {"id": "sec-2", "displayName": "Projects"}
            ]
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/me/onenote/notebooks/nb-2/sections"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [{"id": "sec-3", "displayName": "Tasks"}]
        })))
        .mount(server)
        .await;
}

fn store(server: &MockServer) -> GraphStore {
    GraphStore::new(reqwest::Client::new(), Arc::new(StaticToken::new("test-token")))
        .with_base_url(server.uri())
}

#[tokio::test]
async fn test_list_destinations_keeps_order() {
    let server = MockServer::start().await;
    mount_inventory(&server).await;

    let inventory = store(&server).list_destinations().await.unwrap();
    let names: Vec<&str> = inventory.iter().map(|nb| nb.name.as_str()).collect();
    assert_eq!(names, vec!["Work", "Personal"]);
    assert!(inventory.contains("Work", "Projects"));
    assert!(inventory.contains("Personal", "Tasks"));
}

#[tokio::test]
async fn test_create_entry_posts_html() {
    let server = MockServer::start().await;
    mount_inventory(&server).await;
    Mock::given(method("POST"))
        .and(path("/me/onenote/sections/sec-2/pages"))
        .and(header("Content-Type", "text/html"))
        .and(body_string_contains("<title>AI Summary - "))
        .and(body_string_contains("<div>- a &amp; b<br>- c</div>"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "page-9",
            "links": {"oneNoteWebUrl": {"href": "https://onenote.example/page-9"}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let receipt = store(&server)
        .create_entry("- a & b\n- c", "Work", "Projects")
        .await
        .unwrap();
    assert_eq!(receipt.id, "page-9");
    assert_eq!(receipt.web_url.as_deref(), Some("https://onenote.example/page-9"));
}

#[tokio::test]
async fn test_create_entry_unknown_section() {
    let server = MockServer::start().await;
    mount_inventory(&server).await;

    let err = store(&server)
        .create_entry("x", "Work", "Archive")
        .await
        .unwrap_err();
    assert!(matches!(err, AgentError::DestinationNotFound(_)));
    assert_eq!(err.to_string(), "Section 'Archive' not found in notebook 'Work'");
}

#[tokio::test]
async fn test_unauthorized_carries_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/me/onenote/notebooks"))
        .respond_with(ResponseTemplate::new(401).set_body_string(r#"{"error":{"code":"40001"}}"#))
        .mount(&server)
        .await;

    let err = store(&server).list_destinations().await.unwrap_err();
    match err {
        AgentError::Unauthorized { operation, body } => {
            assert_eq!(operation, "listing notebooks");
            assert!(body.contains("40001"));
        }
        other => panic!("expected Unauthorized, got {other:?}"),
    }
}

#[tokio::test]
async fn test_other_status_is_remote_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/me/onenote/notebooks"))
        .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
        .mount(&server)
        .await;

    let err = store(&server).list_destinations().await.unwrap_err();
    assert!(matches!(err, AgentError::RemoteError { status: 503, ref body } if body == "busy"));
}

#[tokio::test]
async fn test_device_flow_polls_then_caches() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth2/v2.0/devicecode"))
        .and(body_string_contains("client_id=app-id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "device_code": "dev-code",
            "user_code": "ABCD-1234",
            "verification_uri": "https://microsoft.com/devicelogin",
            "expires_in": 60,
            "interval": 0,
            "message": "Go to https://microsoft.com/devicelogin and enter ABCD-1234"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/oauth2/v2.0/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "authorization_pending"})))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/oauth2/v2.0/token"))
        .and(body_string_contains("device_code=dev-code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "fresh-token",
            "expires_in": 3600,
            "refresh_token": "refresh"
        })))
        .mount(&server)
        .await;

    let config = GraphConfig {
        client_id: Some("app-id".into()),
        ..GraphConfig::default()
    };
    let auth = DeviceCodeAuth::new(reqwest::Client::new(), &config)
        .unwrap()
        .with_authority(server.uri());

    assert_eq!(auth.access_token().await.unwrap(), "fresh-token");
    assert_eq!(auth.access_token().await.unwrap(), "fresh-token");
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_device_flow_denied() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth2/v2.0/devicecode"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "device_code": "dev-code",
            "user_code": "ABCD-1234",
            "verification_uri": "https://microsoft.com/devicelogin",
            "expires_in": 60,
            "interval": 0
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/oauth2/v2.0/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "authorization_declined",
            "error_description": "The user declined"
        })))
        .mount(&server)
        .await;

    let config = GraphConfig {
        client_id: Some("app-id".into()),
        ..GraphConfig::default()
    };
    let auth = DeviceCodeAuth::new(reqwest::Client::new(), &config)
        .unwrap()
        .with_authority(server.uri());

    let err = auth.access_token().await.unwrap_err();
    assert!(matches!(err, AgentError::Auth(ref m) if m == "The user declined"));
}
