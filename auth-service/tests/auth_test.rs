//! Account and token flows against the in-memory store.

use std::sync::Arc;

use serde_json::{json, Value};

use auth_service::api::AuthApi;
use auth_service::config::TokenConfig;
use auth_service::services::{AuthManager, TokenService};
use auth_service::store::MemoryUserStore;
use service_core::bus::{BusModule, Dispatcher, MemoryBus, RpcBus};
use service_core::permissions::{school_field_policies, school_policy};
use service_core::pipeline::{ApiRequest, AuthPipeline, Verb};

fn token_config() -> TokenConfig {
    TokenConfig {
        long_secret: "test-long-secret".to_string(),
        short_secret: "test-short-secret".to_string(),
        long_expiry_days: 1095,
        short_expiry_days: 365,
    }
}

struct Harness {
    api: AuthApi,
    manager: Arc<AuthManager>,
    bus: Arc<MemoryBus>,
}

fn harness() -> Harness {
    let tokens = Arc::new(TokenService::new(&token_config()));
    let manager = Arc::new(AuthManager::new(
        Arc::new(MemoryUserStore::new()),
        tokens.clone(),
    ));

    let bus = Arc::new(MemoryBus::new());
    let mut dispatcher = Dispatcher::new();
    dispatcher.register(manager.clone());
    bus.attach("test", Arc::new(dispatcher));

    let pipeline = Arc::new(
        AuthPipeline::new(
            bus.clone(),
            "test",
            Arc::new(school_policy()),
            school_field_policies(),
        )
        .with_local_verifier(tokens.clone()),
    );

    Harness {
        api: AuthApi::new(manager.clone(), tokens, pipeline),
        manager,
        bus,
    }
}

fn create_user_req(username: &str, role: &str) -> ApiRequest {
    ApiRequest::new("auth", "create_user", Verb::Post).with_body(json!({
        "username": username,
        "password": "p@ssW0rD",
        "role": role,
    }))
}

async fn short_token(h: &Harness, username: &str, role: &str) -> String {
    let created = h.api.handle(create_user_req(username, role)).await;
    assert!(created.ok, "create_user failed: {:?}", created.errors);
    let long_token = created.data["long_token"].as_str().unwrap().to_string();

    let minted = h
        .api
        .handle(
            ApiRequest::new("auth", "create_short_token", Verb::Post)
                .with_token(&long_token)
                .with_device("laptop"),
        )
        .await;
    assert!(minted.ok, "create_short_token failed: {:?}", minted.errors);
    minted.data.as_str().unwrap().to_string()
}

#[tokio::test]
async fn create_user_returns_long_token_and_hides_password() {
    let h = harness();
    let resp = h.api.handle(create_user_req("head_admin", "SuperAdmin")).await;

    assert!(resp.ok);
    assert_eq!(resp.data["username"], "head_admin");
    assert_eq!(resp.data["role"], "SuperAdmin");
    assert!(resp.data["long_token"].is_string());
    assert!(resp.data.get("password").is_none());
    assert!(resp.data.get("password_hash").is_none());
}

#[tokio::test]
async fn duplicate_username_is_rejected() {
    let h = harness();
    assert!(h.api.handle(create_user_req("head_admin", "SuperAdmin")).await.ok);

    let resp = h.api.handle(create_user_req("head_admin", "SchoolAdmin")).await;
    assert!(!resp.ok);
    assert!(resp.errors[0].contains("Username already exists"));
}

#[tokio::test]
async fn invalid_payload_fails_validation() {
    let h = harness();
    let resp = h.api.handle(create_user_req("Head Admin", "SuperAdmin")).await;
    assert!(!resp.ok);
    assert!(!resp.errors.is_empty());
}

#[tokio::test]
async fn login_returns_fresh_long_token() {
    let h = harness();
    assert!(h.api.handle(create_user_req("head_admin", "SuperAdmin")).await.ok);

    let resp = h
        .api
        .handle(
            ApiRequest::new("auth", "login", Verb::Post).with_body(json!({
                "username": "head_admin",
                "password": "p@ssW0rD",
            })),
        )
        .await;
    assert!(resp.ok);
    assert!(resp.data["long_token"].is_string());
}

#[tokio::test]
async fn login_with_wrong_password_collapses_to_invalid_credentials() {
    let h = harness();
    assert!(h.api.handle(create_user_req("head_admin", "SuperAdmin")).await.ok);

    for (username, password) in [("head_admin", "Wr0ng!pw"), ("ghost_admin", "p@ssW0rD")] {
        let resp = h
            .api
            .handle(
                ApiRequest::new("auth", "login", Verb::Post).with_body(json!({
                    "username": username,
                    "password": password,
                })),
            )
            .await;
        assert!(!resp.ok);
        assert!(resp.errors[0].contains("Invalid credentials"));
    }
}

#[tokio::test]
async fn guarded_operations_require_a_short_token() {
    let h = harness();
    let resp = h
        .api
        .handle(ApiRequest::new("auth", "get_users", Verb::Get))
        .await;
    assert!(!resp.ok);
    assert_eq!(resp.errors, vec!["unauthorized".to_string()]);
}

#[tokio::test]
async fn long_token_does_not_pass_the_short_token_stage() {
    let h = harness();
    let created = h.api.handle(create_user_req("head_admin", "SuperAdmin")).await;
    let long_token = created.data["long_token"].as_str().unwrap().to_string();

    let resp = h
        .api
        .handle(ApiRequest::new("auth", "get_users", Verb::Get).with_token(&long_token))
        .await;
    assert!(!resp.ok);
    assert_eq!(resp.errors, vec!["unauthorized".to_string()]);
}

#[tokio::test]
async fn short_token_grants_access_to_user_listing() {
    let h = harness();
    let token = short_token(&h, "head_admin", "SuperAdmin").await;

    let resp = h
        .api
        .handle(ApiRequest::new("auth", "get_users", Verb::Get).with_token(&token))
        .await;
    assert!(resp.ok);
    assert_eq!(resp.data.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn delete_user_round_trip() {
    let h = harness();
    let token = short_token(&h, "head_admin", "SuperAdmin").await;

    let listing = h
        .api
        .handle(ApiRequest::new("auth", "get_users", Verb::Get).with_token(&token))
        .await;
    let user_id = listing.data[0]["id"].as_str().unwrap().to_string();

    let resp = h
        .api
        .handle(
            ApiRequest::new("auth", "delete_user", Verb::Delete)
                .with_token(&token)
                .with_param("id", &user_id),
        )
        .await;
    assert!(resp.ok);
    assert_eq!(resp.data["message"], "User deleted successfully");

    let resp = h
        .api
        .handle(
            ApiRequest::new("auth", "delete_user", Verb::Delete)
                .with_token(&token)
                .with_param("id", &user_id),
        )
        .await;
    assert!(!resp.ok);
}

#[tokio::test]
async fn verify_short_token_event_answers_over_the_bus() {
    let h = harness();
    let token = short_token(&h, "head_admin", "SuperAdmin").await;

    let reply = h
        .bus
        .call("test", "auth.verifyShortTokenEvent", json!({ "token": &token }))
        .await
        .unwrap();
    assert!(reply["userId"].is_string());
    assert!(reply["sessionId"].is_string());
    assert!(reply["deviceId"].is_string());

    let reply = h
        .bus
        .call("test", "auth.verifyShortTokenEvent", json!({ "token": "garbage" }))
        .await
        .unwrap();
    assert!(reply.is_null());
}

#[tokio::test]
async fn find_user_by_id_event_returns_sanitized_user() {
    let h = harness();
    let token = short_token(&h, "head_admin", "SuperAdmin").await;

    let claims = h
        .bus
        .call("test", "auth.verifyShortTokenEvent", json!({ "token": &token }))
        .await
        .unwrap();
    let user_id = claims["userId"].as_str().unwrap();

    let reply = h
        .bus
        .call("test", "auth.findUserByIdEvent", json!({ "id": user_id }))
        .await
        .unwrap();
    assert_eq!(reply["role"], "SuperAdmin");
    assert!(reply.get("password_hash").is_none());

    let reply = h
        .bus
        .call("test", "auth.findUserByIdEvent", json!({ "id": "missing" }))
        .await
        .unwrap();
    assert!(reply.is_null());
}

#[tokio::test]
async fn bus_rejects_functions_off_the_allow_list() {
    let h = harness();
    let reply = h.manager.intercept("create_user", Value::Null).await;
    assert_eq!(reply["error"], "create_user is not executable");
}
