use super::*;
use crate::config::ClientConfig;
use crate::utils::storage::{KeyValueStore, MemoryStore, TOKEN_KEY};
use httpmock::prelude::*;
use serde_json::json;
use std::sync::Arc;

fn token_json(access: &str, refresh: &str) -> serde_json::Value {
    json!({
        "access_token": access,
        "refresh_token": refresh,
        "token_type": "Bearer",
        "expires_in": 3600
    })
}

fn setting_json(name: &str, value: Option<&str>) -> serde_json::Value {
    json!({
        "name": name,
        "value": value,
        "displayName": name,
        "description": null,
        "defaultValue": "default"
    })
}

fn client_for(server: &MockServer) -> ApiClient {
    ApiClient::new(ClientConfig {
        api_base_url: server.base_url(),
        client_id: "admin-ui".into(),
        client_secret: "secret".into(),
        ..ClientConfig::default()
    })
}

fn authenticated_client(server: &MockServer, bearer: &str) -> ApiClient {
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::with_entries([(TOKEN_KEY, bearer)]));
    client_for(server).with_token_store(store)
}

#[tokio::test]
async fn login_posts_password_grant() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/connect/token")
                .body_contains("grant_type=password")
                .body_contains("username=admin")
                .body_contains("client_id=admin-ui");
            then.status(200).json_body(token_json("abc", "r1"));
        })
        .await;

    let client = client_for(&server);
    let token = client
        .login(&UserLoginData {
            user_name: "admin".into(),
            password: "1q2w3E*".into(),
        })
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(token.bearer(), "Bearer abc");
    assert_eq!(token.refresh_token, "r1");
}

#[tokio::test]
async fn login_with_phone_posts_phone_verify_grant() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/connect/token")
                .body_contains("grant_type=phone_verify")
                .body_contains("phone_number=13800000000")
                .body_contains("phone_verify_code=123456");
            then.status(200).json_body(token_json("phone", "r-phone"));
        })
        .await;

    let client = client_for(&server);
    let token = client
        .login_with_phone(&UserLoginPhoneData {
            phone_number: "13800000000".into(),
            verify_code: "123456".into(),
        })
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(token.access_token, "phone");
}

#[tokio::test]
async fn login_maps_oauth_error_body() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/connect/token");
            then.status(400).json_body(json!({
                "error": "invalid_grant",
                "error_description": "Invalid username or password!"
            }));
        })
        .await;

    let err = client_for(&server)
        .login(&UserLoginData {
            user_name: "admin".into(),
            password: "wrong".into(),
        })
        .await
        .unwrap_err();

    assert_eq!(err.code, "invalid_grant");
    assert_eq!(err.error, "Invalid username or password!");
}

#[tokio::test]
async fn refresh_token_sends_refresh_grant_with_current_bearer() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/connect/token")
                .header("Authorization", "Bearer abc")
                .body_contains("grant_type=refresh_token")
                .body_contains("refresh_token=r1");
            then.status(200).json_body(token_json("xyz", "r2"));
        })
        .await;

    let token = client_for(&server)
        .refresh_token("Bearer abc", "r1")
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(token.bearer(), "Bearer xyz");
    assert_eq!(token.refresh_token, "r2");
}

#[tokio::test]
async fn logout_revokes_refresh_token() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/connect/revocation")
                .body_contains("token=r1")
                .body_contains("token_type_hint=refresh_token");
            then.status(200);
        })
        .await;

    client_for(&server).logout("r1").await.unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn logout_without_error_body_reports_status() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/connect/revocation");
            then.status(503).body("unavailable");
        })
        .await;

    let err = client_for(&server).logout("r1").await.unwrap_err();
    assert_eq!(err.code, "REQUEST_FAILED");
    assert!(err.error.contains("503"));
}

#[tokio::test]
async fn auth_server_can_live_on_separate_host() {
    let api = MockServer::start_async().await;
    let auth = MockServer::start_async().await;
    let mock = auth
        .mock_async(|when, then| {
            when.method(POST).path("/connect/token");
            then.status(200).json_body(token_json("abc", "r1"));
        })
        .await;

    let client = ApiClient::new(ClientConfig {
        api_base_url: api.base_url(),
        auth_base_url: Some(format!("{}/", auth.base_url())),
        ..ClientConfig::default()
    });
    client
        .login(&UserLoginData {
            user_name: "admin".into(),
            password: "pw".into(),
        })
        .await
        .unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn load_configuration_sends_stored_bearer_and_tenant() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/abp/application-configuration")
                .header("Authorization", "Bearer abc")
                .header("__tenant", "acme");
            then.status(200).json_body(json!({
                "currentUser": {
                    "isAuthenticated": true,
                    "id": "u1",
                    "userName": "admin",
                    "name": "Admin",
                    "email": "admin@abp.io",
                    "roles": ["admin"]
                }
            }));
        })
        .await;

    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::with_entries([(TOKEN_KEY, "Bearer abc")]));
    let client = ApiClient::new(ClientConfig {
        api_base_url: server.base_url(),
        tenant: Some("acme".into()),
        ..ClientConfig::default()
    })
    .with_token_store(store);

    let configuration = client.load().await.unwrap();
    mock.assert_async().await;
    assert_eq!(configuration.current_user.id.as_deref(), Some("u1"));
    assert_eq!(configuration.current_user.email.as_deref(), Some("admin@abp.io"));
}

#[tokio::test]
async fn load_configuration_maps_abp_error_envelope() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/abp/application-configuration");
            then.status(500).json_body(json!({
                "error": { "code": null, "message": "An internal error occurred", "details": null }
            }));
        })
        .await;

    let err = client_for(&server).load().await.unwrap_err();
    assert_eq!(err.code, "REMOTE_ERROR");
    assert_eq!(err.error, "An internal error occurred");
}

#[tokio::test]
async fn get_settings_passes_provider_query() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/settings")
                .query_param("providerName", "T")
                .query_param("providerKey", "tenant 1")
                .header("Authorization", "Bearer abc");
            then.status(200).json_body(json!({
                "items": [setting_json("App.Theme", Some("dark"))]
            }));
        })
        .await;

    let settings = authenticated_client(&server, "Bearer abc")
        .get_settings("T", "tenant 1")
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(settings.items.len(), 1);
    assert_eq!(settings.items[0].name, "App.Theme");
    assert_eq!(settings.items[0].get_value(), Some(json!("dark")));
}

#[tokio::test]
async fn scoped_settings_endpoints_hit_their_paths() {
    let server = MockServer::start_async().await;
    let global = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/settings/by-global");
            then.status(200)
                .json_body(json!({ "items": [setting_json("Global", None)] }));
        })
        .await;
    let tenant = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/settings/by-current-tenant");
            then.status(200).json_body(json!({ "items": [] }));
        })
        .await;
    let me = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/settings/by-current-user");
            then.status(200).json_body(json!({ "items": [] }));
        })
        .await;
    let user = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/settings/by-user")
                .query_param("userId", "u1");
            then.status(200).json_body(json!({ "items": [] }));
        })
        .await;

    let client = authenticated_client(&server, "Bearer abc");
    let globals = client.get_global_settings().await.unwrap();
    assert_eq!(globals.items[0].get_value(), Some(json!("default")));
    client.get_current_tenant_settings().await.unwrap();
    client.get_current_user_settings().await.unwrap();
    client.get_user_settings("u1").await.unwrap();

    global.assert_async().await;
    tenant.assert_async().await;
    me.assert_async().await;
    user.assert_async().await;
}

#[tokio::test]
async fn set_settings_puts_update_payload() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(PUT)
                .path("/api/settings")
                .query_param("providerName", "U")
                .query_param("providerKey", "u1")
                .json_body(json!({
                    "settings": [
                        { "name": "App.Theme", "value": "dark" },
                        { "name": "App.PageSize", "value": 20 }
                    ]
                }));
            then.status(204);
        })
        .await;

    let mut update = SettingsUpdate::new();
    update.push("App.Theme", "dark").push("App.PageSize", 20);

    authenticated_client(&server, "Bearer abc")
        .set_settings("U", "u1", &update)
        .await
        .unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn set_settings_rejects_empty_update_without_request() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(PUT).path("/api/settings");
            then.status(204);
        })
        .await;

    let err = client_for(&server)
        .set_settings("G", "", &SettingsUpdate::new())
        .await
        .unwrap_err();

    assert_eq!(err.code, "VALIDATION_ERROR");
    assert_eq!(mock.hits_async().await, 0);
}
