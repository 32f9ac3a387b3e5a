//! Authorization pipeline behavior across services: role gating and
//! fail-closed degradation when auth is unreachable.

use serde_json::json;

use service_core::pipeline::{ApiRequest, Verb};
use workflow_tests::WorkflowTestContext;

#[tokio::test]
async fn requests_without_a_token_are_unauthorized() {
    let ctx = WorkflowTestContext::new();

    let resp = ctx
        .students
        .handle(ApiRequest::new("student", "get_students", Verb::Get))
        .await;
    assert!(!resp.ok);
    assert_eq!(resp.errors, vec!["unauthorized".to_string()]);

    let resp = ctx
        .classrooms
        .handle(ApiRequest::new("classroom", "get_classrooms", Verb::Get))
        .await;
    assert!(!resp.ok);
    assert_eq!(resp.errors, vec!["unauthorized".to_string()]);

    let resp = ctx
        .schools
        .handle(ApiRequest::new("school", "get_schools", Verb::Get))
        .await;
    assert!(!resp.ok);
    assert_eq!(resp.errors, vec!["unauthorized".to_string()]);
}

#[tokio::test]
async fn garbage_tokens_are_unauthorized() {
    let ctx = WorkflowTestContext::new();
    let resp = ctx
        .students
        .handle(
            ApiRequest::new("student", "get_students", Verb::Get).with_token("not-a-token"),
        )
        .await;
    assert!(!resp.ok);
    assert_eq!(resp.errors, vec!["unauthorized".to_string()]);
}

#[tokio::test]
async fn super_admin_cannot_touch_student_or_classroom_modules() {
    let ctx = WorkflowTestContext::new();
    let super_admin = ctx.super_admin().await;

    let read = ctx
        .students
        .handle(ApiRequest::new("student", "get_students", Verb::Get).with_token(&super_admin))
        .await;
    assert!(!read.ok);
    assert_eq!(read.errors, vec!["Forbidden".to_string()]);

    let write = ctx
        .classrooms
        .handle(
            ApiRequest::new("classroom", "create_classroom", Verb::Post)
                .with_token(&super_admin)
                .with_body(json!({ "name": "Fifth Grade", "students": [] })),
        )
        .await;
    assert!(!write.ok);
    assert_eq!(write.errors, vec!["Forbidden".to_string()]);
}

#[tokio::test]
async fn school_admin_cannot_touch_the_school_module() {
    let ctx = WorkflowTestContext::new();
    let school_admin = ctx.school_admin().await;

    let read = ctx
        .schools
        .handle(ApiRequest::new("school", "get_schools", Verb::Get).with_token(&school_admin))
        .await;
    assert!(!read.ok);
    assert_eq!(read.errors, vec!["Forbidden".to_string()]);

    let write = ctx
        .schools
        .handle(
            ApiRequest::new("school", "create_school", Verb::Post)
                .with_token(&school_admin)
                .with_body(json!({ "name": "North High", "classrooms": [] })),
        )
        .await;
    assert!(!write.ok);
    assert_eq!(write.errors, vec!["Forbidden".to_string()]);
}

#[tokio::test]
async fn delete_gates_on_the_create_action() {
    let ctx = WorkflowTestContext::new();
    let school_admin = ctx.school_admin().await;
    let super_admin = ctx.super_admin().await;

    let student = ctx.create_student(&school_admin, "Hamada", &[]).await;

    // SuperAdmin has no grant on the student layer at all.
    let resp = ctx
        .students
        .handle(
            ApiRequest::new("student", "delete_student", Verb::Delete)
                .with_token(&super_admin)
                .with_param("id", &student),
        )
        .await;
    assert!(!resp.ok);
    assert_eq!(resp.errors, vec!["Forbidden".to_string()]);

    // SchoolAdmin's create ceiling covers the DELETE verb's mapped action.
    let resp = ctx
        .students
        .handle(
            ApiRequest::new("student", "delete_student", Verb::Delete)
                .with_token(&school_admin)
                .with_param("id", &student),
        )
        .await;
    assert!(resp.ok);
}

#[tokio::test]
async fn every_guarded_operation_fails_closed_without_auth() {
    let ctx = WorkflowTestContext::without_auth();

    // A perfectly valid short token, but nobody to verify it against.
    let token = ctx.tokens.mint_short_token("user-1", "laptop").unwrap();

    let resp = ctx
        .students
        .handle(ApiRequest::new("student", "get_students", Verb::Get).with_token(&token))
        .await;
    assert!(!resp.ok);
    assert_eq!(resp.errors, vec!["unauthorized".to_string()]);

    let resp = ctx
        .schools
        .handle(
            ApiRequest::new("school", "create_school", Verb::Post)
                .with_token(&token)
                .with_body(json!({ "name": "North High", "classrooms": [] })),
        )
        .await;
    assert!(!resp.ok);
    assert_eq!(resp.errors, vec!["unauthorized".to_string()]);
}

#[tokio::test]
async fn permission_stage_fails_closed_when_the_caller_vanished() {
    let ctx = WorkflowTestContext::new();
    let token = ctx.school_admin().await;

    // Delete the account behind the still-valid token.
    let users = ctx
        .auth
        .handle(ApiRequest::new("auth", "get_users", Verb::Get).with_token(&token))
        .await;
    let user_id = users.data[0]["id"].as_str().unwrap().to_string();
    let deleted = ctx
        .auth
        .handle(
            ApiRequest::new("auth", "delete_user", Verb::Delete)
                .with_token(&token)
                .with_param("id", &user_id),
        )
        .await;
    assert!(deleted.ok);

    // The token still verifies, but the role lookup comes back empty.
    let resp = ctx
        .students
        .handle(ApiRequest::new("student", "get_students", Verb::Get).with_token(&token))
        .await;
    assert!(!resp.ok);
    assert_eq!(resp.errors, vec!["Forbidden".to_string()]);
}
