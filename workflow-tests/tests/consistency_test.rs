//! Student↔classroom referential consistency across service boundaries.

use serde_json::json;

use service_core::pipeline::{ApiRequest, Verb};
use workflow_tests::{ok_data, WorkflowTestContext};

#[tokio::test]
async fn classroom_create_adds_back_references_to_both_students() {
    let ctx = WorkflowTestContext::new();
    let token = ctx.school_admin().await;

    let s1 = ctx.create_student(&token, "Hamada", &[]).await;
    let s2 = ctx.create_student(&token, "Aly", &[]).await;
    let classroom = ctx.create_classroom(&token, "Fifth Grade", &[s1.as_str(), s2.as_str()]).await;
    ctx.settle().await;

    for id in [&s1, &s2] {
        let student = ok_data(
            ctx.students
                .handle(
                    ApiRequest::new("student", "get_student_by_id", Verb::Get)
                        .with_token(&token)
                        .with_param("id", id),
                )
                .await,
        );
        assert_eq!(student["classrooms"], json!([&classroom]));
    }
    ctx.assert_symmetry().await;
}

#[tokio::test]
async fn classroom_create_with_missing_student_aborts_entirely() {
    let ctx = WorkflowTestContext::new();
    let token = ctx.school_admin().await;

    let s1 = ctx.create_student(&token, "Hamada", &[]).await;
    let ghost = service_core::ids::new_id();

    let resp = ctx
        .classrooms
        .handle(
            ApiRequest::new("classroom", "create_classroom", Verb::Post)
                .with_token(&token)
                .with_body(json!({ "name": "Fifth Grade", "students": [&s1, &ghost] })),
        )
        .await;
    ctx.settle().await;

    assert!(!resp.ok);
    assert!(resp.errors[0].contains(&ghost), "error should name the missing id");

    // Nothing persisted, nothing notified.
    let listing = ok_data(
        ctx.classrooms
            .handle(
                ApiRequest::new("classroom", "get_classrooms", Verb::Get).with_token(&token),
            )
            .await,
    );
    assert_eq!(listing.as_array().unwrap().len(), 0);

    let student = ok_data(
        ctx.students
            .handle(
                ApiRequest::new("student", "get_student_by_id", Verb::Get)
                    .with_token(&token)
                    .with_param("id", &s1),
            )
            .await,
    );
    assert_eq!(student["classrooms"], json!([]));
}

#[tokio::test]
async fn classroom_update_moves_back_references_with_the_diff() {
    let ctx = WorkflowTestContext::new();
    let token = ctx.school_admin().await;

    let s1 = ctx.create_student(&token, "Hamada", &[]).await;
    let s2 = ctx.create_student(&token, "Aly", &[]).await;
    let s3 = ctx.create_student(&token, "Mona", &[]).await;
    let classroom = ctx.create_classroom(&token, "Fifth Grade", &[s1.as_str(), s2.as_str()]).await;
    ctx.settle().await;

    let resp = ctx
        .update_classroom(&token, &classroom, "Fifth Grade", &[s2.as_str(), s3.as_str()])
        .await;
    assert!(resp.ok);
    ctx.settle().await;

    let expectations = [(&s1, json!([])), (&s2, json!([&classroom])), (&s3, json!([&classroom]))];
    for (id, expected) in expectations {
        let student = ok_data(
            ctx.students
                .handle(
                    ApiRequest::new("student", "get_student_by_id", Verb::Get)
                        .with_token(&token)
                        .with_param("id", id),
                )
                .await,
        );
        assert_eq!(student["classrooms"], expected, "student {id}");
    }
    ctx.assert_symmetry().await;
}

#[tokio::test]
async fn classroom_delete_scrubs_student_back_references() {
    let ctx = WorkflowTestContext::new();
    let token = ctx.school_admin().await;

    let s1 = ctx.create_student(&token, "Hamada", &[]).await;
    let classroom = ctx.create_classroom(&token, "Fifth Grade", &[s1.as_str()]).await;
    ctx.settle().await;

    let resp = ctx
        .classrooms
        .handle(
            ApiRequest::new("classroom", "delete_classroom", Verb::Delete)
                .with_token(&token)
                .with_param("id", &classroom),
        )
        .await;
    assert!(resp.ok);
    ctx.settle().await;

    let student = ok_data(
        ctx.students
            .handle(
                ApiRequest::new("student", "get_student_by_id", Verb::Get)
                    .with_token(&token)
                    .with_param("id", &s1),
            )
            .await,
    );
    assert_eq!(student["classrooms"], json!([]));
    ctx.assert_symmetry().await;
}

#[tokio::test]
async fn student_side_operations_mirror_into_classrooms() {
    let ctx = WorkflowTestContext::new();
    let token = ctx.school_admin().await;

    let classroom = ctx.create_classroom(&token, "Fifth Grade", &[]).await;

    // Creating a student that references the classroom adds the inverse side.
    let s1 = ctx.create_student(&token, "Hamada", &[classroom.as_str()]).await;
    ctx.settle().await;

    let held = ok_data(
        ctx.classrooms
            .handle(
                ApiRequest::new("classroom", "get_classroom_by_id", Verb::Get)
                    .with_token(&token)
                    .with_param("id", &classroom),
            )
            .await,
    );
    assert_eq!(held["students"], json!([&s1]));

    // Updating the student away removes it again.
    let resp = ctx
        .students
        .handle(
            ApiRequest::new("student", "update_student", Verb::Put)
                .with_token(&token)
                .with_param("id", &s1)
                .with_body(json!({ "name": "Hamada", "classrooms": [] })),
        )
        .await;
    assert!(resp.ok);
    ctx.settle().await;

    let held = ok_data(
        ctx.classrooms
            .handle(
                ApiRequest::new("classroom", "get_classroom_by_id", Verb::Get)
                    .with_token(&token)
                    .with_param("id", &classroom),
            )
            .await,
    );
    assert_eq!(held["students"], json!([]));
    ctx.assert_symmetry().await;
}

#[tokio::test]
async fn student_delete_scrubs_classroom_back_references() {
    let ctx = WorkflowTestContext::new();
    let token = ctx.school_admin().await;

    let classroom = ctx.create_classroom(&token, "Fifth Grade", &[]).await;
    let s1 = ctx.create_student(&token, "Hamada", &[classroom.as_str()]).await;
    ctx.settle().await;

    let resp = ctx
        .students
        .handle(
            ApiRequest::new("student", "delete_student", Verb::Delete)
                .with_token(&token)
                .with_param("id", &s1),
        )
        .await;
    assert!(resp.ok);
    ctx.settle().await;

    let held = ok_data(
        ctx.classrooms
            .handle(
                ApiRequest::new("classroom", "get_classroom_by_id", Verb::Get)
                    .with_token(&token)
                    .with_param("id", &classroom),
            )
            .await,
    );
    assert_eq!(held["students"], json!([]));
    ctx.assert_symmetry().await;
}

#[tokio::test]
async fn symmetry_holds_after_a_mixed_operation_sequence() {
    let ctx = WorkflowTestContext::new();
    let token = ctx.school_admin().await;

    let s1 = ctx.create_student(&token, "Hamada", &[]).await;
    let s2 = ctx.create_student(&token, "Aly", &[]).await;
    let c1 = ctx.create_classroom(&token, "Fifth Grade", &[s1.as_str()]).await;
    let c2 = ctx.create_classroom(&token, "Chess Club", &[s1.as_str(), s2.as_str()]).await;
    ctx.settle().await;

    let s3 = ctx.create_student(&token, "Mona", &[c1.as_str(), c2.as_str()]).await;
    ctx.settle().await;

    ctx.update_classroom(&token, &c1, "Fifth Grade", &[s2.as_str(), s3.as_str()])
        .await;
    ctx.settle().await;

    ctx.students
        .handle(
            ApiRequest::new("student", "delete_student", Verb::Delete)
                .with_token(&token)
                .with_param("id", &s1),
        )
        .await;
    ctx.settle().await;

    ctx.assert_symmetry().await;
}
