//! Exclusive school↔classroom assignment across service boundaries.

use serde_json::json;

use service_core::pipeline::{ApiRequest, Verb};
use workflow_tests::{ok_data, WorkflowTestContext};

#[tokio::test]
async fn claiming_a_classroom_pulls_it_from_the_previous_school() {
    let ctx = WorkflowTestContext::new();
    let school_admin = ctx.school_admin().await;
    let super_admin = ctx.super_admin().await;

    let classroom = ctx.create_classroom(&school_admin, "Fifth Grade", &[]).await;

    let school_x = ctx.create_school(&super_admin, "North High", &[classroom.as_str()]).await;
    ctx.settle().await;

    let held = ok_data(
        ctx.classrooms
            .handle(
                ApiRequest::new("classroom", "get_classroom_by_id", Verb::Get)
                    .with_token(&school_admin)
                    .with_param("id", &classroom),
            )
            .await,
    );
    assert_eq!(held["school"], json!(&school_x));

    // A second school claims the same classroom.
    let school_y = ctx.create_school(&super_admin, "South High", &[classroom.as_str()]).await;
    ctx.settle().await;

    let x = ok_data(
        ctx.schools
            .handle(
                ApiRequest::new("school", "get_school_by_id", Verb::Get)
                    .with_token(&super_admin)
                    .with_param("id", &school_x),
            )
            .await,
    );
    assert_eq!(x["classrooms"], json!([]));

    let y = ok_data(
        ctx.schools
            .handle(
                ApiRequest::new("school", "get_school_by_id", Verb::Get)
                    .with_token(&super_admin)
                    .with_param("id", &school_y),
            )
            .await,
    );
    assert_eq!(y["classrooms"], json!([&classroom]));

    let held = ok_data(
        ctx.classrooms
            .handle(
                ApiRequest::new("classroom", "get_classroom_by_id", Verb::Get)
                    .with_token(&school_admin)
                    .with_param("id", &classroom),
            )
            .await,
    );
    assert_eq!(held["school"], json!(&school_y));

    ctx.assert_school_exclusivity().await;
}

#[tokio::test]
async fn update_reassignment_keeps_exactly_one_holder() {
    let ctx = WorkflowTestContext::new();
    let school_admin = ctx.school_admin().await;
    let super_admin = ctx.super_admin().await;

    let c1 = ctx.create_classroom(&school_admin, "Fifth Grade", &[]).await;
    let c2 = ctx.create_classroom(&school_admin, "Chess Club", &[]).await;

    let school_x = ctx.create_school(&super_admin, "North High", &[c1.as_str()]).await;
    let school_y = ctx.create_school(&super_admin, "South High", &[c2.as_str()]).await;
    ctx.settle().await;

    // Y takes over c1 while keeping c2.
    let resp = ctx
        .schools
        .handle(
            ApiRequest::new("school", "update_school", Verb::Put)
                .with_token(&super_admin)
                .with_param("id", &school_y)
                .with_body(json!({ "name": "South High", "classrooms": [&c1, &c2] })),
        )
        .await;
    assert!(resp.ok, "update_school failed: {:?}", resp.errors);
    ctx.settle().await;

    let x = ok_data(
        ctx.schools
            .handle(
                ApiRequest::new("school", "get_school_by_id", Verb::Get)
                    .with_token(&super_admin)
                    .with_param("id", &school_x),
            )
            .await,
    );
    assert_eq!(x["classrooms"], json!([]));

    ctx.assert_school_exclusivity().await;
}

#[tokio::test]
async fn dropping_a_classroom_on_update_clears_its_link() {
    let ctx = WorkflowTestContext::new();
    let school_admin = ctx.school_admin().await;
    let super_admin = ctx.super_admin().await;

    let classroom = ctx.create_classroom(&school_admin, "Fifth Grade", &[]).await;
    let school = ctx.create_school(&super_admin, "North High", &[classroom.as_str()]).await;
    ctx.settle().await;

    let resp = ctx
        .schools
        .handle(
            ApiRequest::new("school", "update_school", Verb::Put)
                .with_token(&super_admin)
                .with_param("id", &school)
                .with_body(json!({ "name": "North High", "classrooms": [] })),
        )
        .await;
    assert!(resp.ok);
    ctx.settle().await;

    let held = ok_data(
        ctx.classrooms
            .handle(
                ApiRequest::new("classroom", "get_classroom_by_id", Verb::Get)
                    .with_token(&school_admin)
                    .with_param("id", &classroom),
            )
            .await,
    );
    assert!(held.get("school").is_none() || held["school"].is_null());

    ctx.assert_school_exclusivity().await;
}

#[tokio::test]
async fn school_delete_clears_classroom_links() {
    let ctx = WorkflowTestContext::new();
    let school_admin = ctx.school_admin().await;
    let super_admin = ctx.super_admin().await;

    let classroom = ctx.create_classroom(&school_admin, "Fifth Grade", &[]).await;
    let school = ctx.create_school(&super_admin, "North High", &[classroom.as_str()]).await;
    ctx.settle().await;

    let resp = ctx
        .schools
        .handle(
            ApiRequest::new("school", "delete_school", Verb::Delete)
                .with_token(&super_admin)
                .with_param("id", &school),
        )
        .await;
    assert!(resp.ok);
    ctx.settle().await;

    let held = ok_data(
        ctx.classrooms
            .handle(
                ApiRequest::new("classroom", "get_classroom_by_id", Verb::Get)
                    .with_token(&school_admin)
                    .with_param("id", &classroom),
            )
            .await,
    );
    assert!(held.get("school").is_none() || held["school"].is_null());

    ctx.assert_school_exclusivity().await;
}

#[tokio::test]
async fn classroom_delete_scrubs_the_school_set() {
    let ctx = WorkflowTestContext::new();
    let school_admin = ctx.school_admin().await;
    let super_admin = ctx.super_admin().await;

    let classroom = ctx.create_classroom(&school_admin, "Fifth Grade", &[]).await;
    let school = ctx.create_school(&super_admin, "North High", &[classroom.as_str()]).await;
    ctx.settle().await;

    let resp = ctx
        .classrooms
        .handle(
            ApiRequest::new("classroom", "delete_classroom", Verb::Delete)
                .with_token(&school_admin)
                .with_param("id", &classroom),
        )
        .await;
    assert!(resp.ok);
    ctx.settle().await;

    let held = ok_data(
        ctx.schools
            .handle(
                ApiRequest::new("school", "get_school_by_id", Verb::Get)
                    .with_token(&super_admin)
                    .with_param("id", &school),
            )
            .await,
    );
    assert_eq!(held["classrooms"], json!([]));

    ctx.assert_school_exclusivity().await;
}

#[tokio::test]
async fn school_create_with_missing_classroom_aborts() {
    let ctx = WorkflowTestContext::new();
    let super_admin = ctx.super_admin().await;
    let ghost = service_core::ids::new_id();

    let resp = ctx
        .schools
        .handle(
            ApiRequest::new("school", "create_school", Verb::Post)
                .with_token(&super_admin)
                .with_body(json!({ "name": "North High", "classrooms": [&ghost] })),
        )
        .await;
    assert!(!resp.ok);
    assert!(resp.errors[0].contains(&ghost));
}
