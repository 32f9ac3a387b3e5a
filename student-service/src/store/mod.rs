//! Student persistence: MongoDB for deployments, in-memory for tests and
//! dev mode. The relationship mutators are idempotent set operations.

use std::collections::HashMap;

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::doc;
use mongodb::{Client as MongoClient, Collection};
use tokio::sync::RwLock;

use service_core::error::AppError;

use crate::models::Student;

#[async_trait]
pub trait StudentStore: Send + Sync {
    async fn insert(&self, student: &Student) -> Result<(), AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Student>, AppError>;
    async fn find_all(&self) -> Result<Vec<Student>, AppError>;
    async fn replace(&self, student: &Student) -> Result<(), AppError>;
    async fn delete_by_id(&self, id: &str) -> Result<Option<Student>, AppError>;
    async fn count_by_id(&self, id: &str) -> Result<u64, AppError>;

    /// Add the classroom back-reference to every listed student.
    async fn add_classroom(&self, student_ids: &[String], classroom_id: &str)
        -> Result<(), AppError>;

    /// Remove the classroom back-reference from every listed student.
    async fn remove_classroom(
        &self,
        student_ids: &[String],
        classroom_id: &str,
    ) -> Result<(), AppError>;
}

#[derive(Default)]
pub struct MemoryStudentStore {
    students: RwLock<HashMap<String, Student>>,
}

impl MemoryStudentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StudentStore for MemoryStudentStore {
    async fn insert(&self, student: &Student) -> Result<(), AppError> {
        self.students
            .write()
            .await
            .insert(student.id.clone(), student.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Student>, AppError> {
        Ok(self.students.read().await.get(id).cloned())
    }

    async fn find_all(&self) -> Result<Vec<Student>, AppError> {
        Ok(self.students.read().await.values().cloned().collect())
    }

    async fn replace(&self, student: &Student) -> Result<(), AppError> {
        self.students
            .write()
            .await
            .insert(student.id.clone(), student.clone());
        Ok(())
    }

    async fn delete_by_id(&self, id: &str) -> Result<Option<Student>, AppError> {
        Ok(self.students.write().await.remove(id))
    }

    async fn count_by_id(&self, id: &str) -> Result<u64, AppError> {
        Ok(self.students.read().await.contains_key(id) as u64)
    }

    async fn add_classroom(
        &self,
        student_ids: &[String],
        classroom_id: &str,
    ) -> Result<(), AppError> {
        let mut students = self.students.write().await;
        for id in student_ids {
            if let Some(student) = students.get_mut(id) {
                if !student.classrooms.iter().any(|c| c == classroom_id) {
                    student.classrooms.push(classroom_id.to_string());
                }
            }
        }
        Ok(())
    }

    async fn remove_classroom(
        &self,
        student_ids: &[String],
        classroom_id: &str,
    ) -> Result<(), AppError> {
        let mut students = self.students.write().await;
        for id in student_ids {
            if let Some(student) = students.get_mut(id) {
                student.classrooms.retain(|c| c != classroom_id);
            }
        }
        Ok(())
    }
}

pub struct MongoStudentStore {
    students: Collection<Student>,
}

impl MongoStudentStore {
    pub async fn connect(uri: &str, database: &str) -> Result<Self, AppError> {
        tracing::info!(uri = %uri, database = %database, "connecting to MongoDB");
        let client = MongoClient::with_uri_str(uri).await?;
        let db = client.database(database);
        Ok(Self {
            students: db.collection::<Student>("students"),
        })
    }
}

#[async_trait]
impl StudentStore for MongoStudentStore {
    async fn insert(&self, student: &Student) -> Result<(), AppError> {
        self.students.insert_one(student, None).await?;
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Student>, AppError> {
        Ok(self.students.find_one(doc! { "id": id }, None).await?)
    }

    async fn find_all(&self) -> Result<Vec<Student>, AppError> {
        let cursor = self.students.find(doc! {}, None).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn replace(&self, student: &Student) -> Result<(), AppError> {
        self.students
            .replace_one(doc! { "id": &student.id }, student, None)
            .await?;
        Ok(())
    }

    async fn delete_by_id(&self, id: &str) -> Result<Option<Student>, AppError> {
        Ok(self
            .students
            .find_one_and_delete(doc! { "id": id }, None)
            .await?)
    }

    async fn count_by_id(&self, id: &str) -> Result<u64, AppError> {
        Ok(self.students.count_documents(doc! { "id": id }, None).await?)
    }

    async fn add_classroom(
        &self,
        student_ids: &[String],
        classroom_id: &str,
    ) -> Result<(), AppError> {
        self.students
            .update_many(
                doc! { "id": { "$in": student_ids.to_vec() } },
                doc! { "$addToSet": { "classrooms": classroom_id } },
                None,
            )
            .await?;
        Ok(())
    }

    async fn remove_classroom(
        &self,
        student_ids: &[String],
        classroom_id: &str,
    ) -> Result<(), AppError> {
        self.students
            .update_many(
                doc! { "id": { "$in": student_ids.to_vec() } },
                doc! { "$pull": { "classrooms": classroom_id } },
                None,
            )
            .await?;
        Ok(())
    }
}
