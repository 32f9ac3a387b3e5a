//! Cross-service workflow integration tests library.
//!
//! Wires all four services over an in-process bus, one dispatcher per
//! "process", exactly as the redis deployment wires them: every manager is
//! reachable only through its module's allow-list, and every facade runs the
//! full authorization pipeline against the real auth module.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};

use auth_service::api::AuthApi;
use auth_service::config::TokenConfig;
use auth_service::services::{AuthManager, TokenService};
use auth_service::store::MemoryUserStore;
use classroom_service::api::ClassroomApi;
use classroom_service::services::ClassroomManager;
use classroom_service::store::{ClassroomStore, MemoryClassroomStore};
use school_service::api::SchoolApi;
use school_service::services::SchoolManager;
use school_service::store::{MemorySchoolStore, SchoolStore};
use service_core::bus::{Dispatcher, MemoryBus, RpcBus};
use service_core::envelope::ApiResponse;
use service_core::permissions::{school_field_policies, school_policy, FieldPolicy};
use service_core::pipeline::{ApiRequest, AuthPipeline, Verb};
use student_service::api::StudentApi;
use student_service::services::StudentManager;
use student_service::store::{MemoryStudentStore, StudentStore};

pub const NODE_TYPE: &str = "school";

pub struct WorkflowTestContext {
    pub bus: Arc<MemoryBus>,
    pub tokens: Arc<TokenService>,

    pub auth: AuthApi,
    pub students: StudentApi,
    pub classrooms: ClassroomApi,
    pub schools: SchoolApi,

    pub student_store: Arc<MemoryStudentStore>,
    pub classroom_store: Arc<MemoryClassroomStore>,
    pub school_store: Arc<MemorySchoolStore>,
}

impl WorkflowTestContext {
    /// Full deployment: all four services attached to the bus.
    pub fn new() -> Self {
        Self::build(true)
    }

    /// Deployment with a dead auth service, for fail-closed scenarios.
    pub fn without_auth() -> Self {
        Self::build(false)
    }

    fn build(with_auth: bool) -> Self {
        let bus = Arc::new(MemoryBus::new());

        let tokens = Arc::new(TokenService::new(&TokenConfig {
            long_secret: "workflow-long-secret".to_string(),
            short_secret: "workflow-short-secret".to_string(),
            long_expiry_days: 1095,
            short_expiry_days: 365,
        }));

        let pipeline = |policies: HashMap<String, FieldPolicy>| {
            AuthPipeline::new(
                bus.clone() as Arc<dyn RpcBus>,
                NODE_TYPE,
                Arc::new(school_policy()),
                policies,
            )
        };

        // auth process
        let auth_manager = Arc::new(AuthManager::new(
            Arc::new(MemoryUserStore::new()),
            tokens.clone(),
        ));
        if with_auth {
            let mut dispatcher = Dispatcher::new();
            dispatcher.register(auth_manager.clone());
            bus.attach(NODE_TYPE, Arc::new(dispatcher));
        }
        let auth = AuthApi::new(
            auth_manager,
            tokens.clone(),
            Arc::new(
                pipeline(school_field_policies()).with_local_verifier(tokens.clone()),
            ),
        );

        // student process
        let student_store = Arc::new(MemoryStudentStore::new());
        let student_manager = Arc::new(StudentManager::new(
            student_store.clone(),
            bus.clone(),
            NODE_TYPE,
        ));
        let mut dispatcher = Dispatcher::new();
        dispatcher.register(student_manager.clone());
        bus.attach(NODE_TYPE, Arc::new(dispatcher));
        let students = StudentApi::new(
            student_manager,
            Arc::new(pipeline(school_field_policies())),
        );

        // classroom process
        let classroom_store = Arc::new(MemoryClassroomStore::new());
        let classroom_manager = Arc::new(ClassroomManager::new(
            classroom_store.clone(),
            bus.clone(),
            NODE_TYPE,
        ));
        let mut dispatcher = Dispatcher::new();
        dispatcher.register(classroom_manager.clone());
        bus.attach(NODE_TYPE, Arc::new(dispatcher));
        let classrooms = ClassroomApi::new(
            classroom_manager,
            Arc::new(pipeline(school_field_policies())),
        );

        // school process
        let school_store = Arc::new(MemorySchoolStore::new());
        let school_manager = Arc::new(SchoolManager::new(
            school_store.clone(),
            bus.clone(),
            NODE_TYPE,
        ));
        let mut dispatcher = Dispatcher::new();
        dispatcher.register(school_manager.clone());
        bus.attach(NODE_TYPE, Arc::new(dispatcher));
        let schools = SchoolApi::new(
            school_manager,
            Arc::new(pipeline(school_field_policies())),
        );

        Self {
            bus,
            tokens,
            auth,
            students,
            classrooms,
            schools,
            student_store,
            classroom_store,
            school_store,
        }
    }

    /// Let in-flight fire-and-forget notifications drain.
    pub async fn settle(&self) {
        tokio::time::sleep(Duration::from_millis(75)).await;
    }

    /// Create an account and mint a short token for it.
    pub async fn short_token(&self, username: &str, role: &str) -> String {
        let created = self
            .auth
            .handle(
                ApiRequest::new("auth", "create_user", Verb::Post).with_body(json!({
                    "username": username,
                    "password": "p@ssW0rD",
                    "role": role,
                })),
            )
            .await;
        assert!(created.ok, "create_user failed: {:?}", created.errors);
        let long_token = created.data["long_token"].as_str().unwrap().to_string();

        let minted = self
            .auth
            .handle(
                ApiRequest::new("auth", "create_short_token", Verb::Post)
                    .with_token(&long_token)
                    .with_device("workflow-tests"),
            )
            .await;
        assert!(minted.ok, "create_short_token failed: {:?}", minted.errors);
        minted.data.as_str().unwrap().to_string()
    }

    pub async fn school_admin(&self) -> String {
        self.short_token("school_admin", "SchoolAdmin").await
    }

    pub async fn super_admin(&self) -> String {
        self.short_token("super_admin", "SuperAdmin").await
    }

    pub async fn create_student(&self, token: &str, name: &str, classrooms: &[&str]) -> String {
        let resp = self
            .students
            .handle(
                ApiRequest::new("student", "create_student", Verb::Post)
                    .with_token(token)
                    .with_body(json!({ "name": name, "classrooms": classrooms })),
            )
            .await;
        assert!(resp.ok, "create_student failed: {:?}", resp.errors);
        resp.data["id"].as_str().unwrap().to_string()
    }

    pub async fn create_classroom(&self, token: &str, name: &str, students: &[&str]) -> String {
        let resp = self
            .classrooms
            .handle(
                ApiRequest::new("classroom", "create_classroom", Verb::Post)
                    .with_token(token)
                    .with_body(json!({ "name": name, "students": students })),
            )
            .await;
        assert!(resp.ok, "create_classroom failed: {:?}", resp.errors);
        resp.data["id"].as_str().unwrap().to_string()
    }

    pub async fn create_school(&self, token: &str, name: &str, classrooms: &[&str]) -> String {
        let resp = self
            .schools
            .handle(
                ApiRequest::new("school", "create_school", Verb::Post)
                    .with_token(token)
                    .with_body(json!({ "name": name, "classrooms": classrooms })),
            )
            .await;
        assert!(resp.ok, "create_school failed: {:?}", resp.errors);
        resp.data["id"].as_str().unwrap().to_string()
    }

    pub async fn update_classroom(
        &self,
        token: &str,
        id: &str,
        name: &str,
        students: &[&str],
    ) -> ApiResponse {
        self.classrooms
            .handle(
                ApiRequest::new("classroom", "update_classroom", Verb::Put)
                    .with_token(token)
                    .with_param("id", id)
                    .with_body(json!({ "name": name, "students": students })),
            )
            .await
    }

    /// The symmetry invariant: after settlement, every student↔classroom
    /// membership is recorded identically on both sides.
    pub async fn assert_symmetry(&self) {
        let students = self.student_store.find_all().await.unwrap();
        let classrooms = self.classroom_store.find_all().await.unwrap();

        for student in &students {
            for classroom_id in &student.classrooms {
                let classroom = classrooms
                    .iter()
                    .find(|c| &c.id == classroom_id)
                    .unwrap_or_else(|| panic!("student {} references missing classroom", student.id));
                assert!(
                    classroom.students.contains(&student.id),
                    "classroom {} does not list student {}",
                    classroom.id,
                    student.id
                );
            }
        }
        for classroom in &classrooms {
            for student_id in &classroom.students {
                let student = students
                    .iter()
                    .find(|s| &s.id == student_id)
                    .unwrap_or_else(|| panic!("classroom {} references missing student", classroom.id));
                assert!(
                    student.classrooms.contains(&classroom.id),
                    "student {} does not list classroom {}",
                    student.id,
                    classroom.id
                );
            }
        }
    }

    /// The exclusivity invariant: no classroom is listed by two schools, and
    /// each classroom's `school` link points back at the school listing it.
    pub async fn assert_school_exclusivity(&self) {
        let schools = self.school_store.find_all().await.unwrap();
        let classrooms = self.classroom_store.find_all().await.unwrap();

        for classroom in &classrooms {
            let holders: Vec<&str> = schools
                .iter()
                .filter(|s| s.classrooms.contains(&classroom.id))
                .map(|s| s.id.as_str())
                .collect();
            assert!(
                holders.len() <= 1,
                "classroom {} held by multiple schools: {holders:?}",
                classroom.id
            );
            match (&classroom.school, holders.first()) {
                (Some(link), Some(holder)) => assert_eq!(link, holder),
                (None, None) => {}
                (link, holder) => panic!(
                    "classroom {} link {:?} disagrees with holder {:?}",
                    classroom.id, link, holder
                ),
            }
        }
    }
}

impl Default for WorkflowTestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Unwrap a successful envelope into its data slot.
pub fn ok_data(resp: ApiResponse) -> Value {
    assert!(resp.ok, "request failed: {:?}", resp.errors);
    resp.data
}
