//! Classroom persistence: MongoDB for deployments, in-memory for tests and
//! dev mode. The relationship mutators are idempotent set operations.

use std::collections::HashMap;

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::doc;
use mongodb::{Client as MongoClient, Collection};
use tokio::sync::RwLock;

use service_core::error::AppError;

use crate::models::Classroom;

#[async_trait]
pub trait ClassroomStore: Send + Sync {
    async fn insert(&self, classroom: &Classroom) -> Result<(), AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Classroom>, AppError>;
    async fn find_all(&self) -> Result<Vec<Classroom>, AppError>;
    async fn replace(&self, classroom: &Classroom) -> Result<(), AppError>;
    async fn delete_by_id(&self, id: &str) -> Result<Option<Classroom>, AppError>;
    async fn count_by_id(&self, id: &str) -> Result<u64, AppError>;

    /// Add the student back-reference to every listed classroom.
    async fn add_student(
        &self,
        classroom_ids: &[String],
        student_id: &str,
    ) -> Result<(), AppError>;

    /// Remove the student back-reference from every listed classroom.
    async fn remove_student(
        &self,
        classroom_ids: &[String],
        student_id: &str,
    ) -> Result<(), AppError>;

    /// Scrub a deleted student from every classroom still holding it.
    async fn remove_student_everywhere(&self, student_id: &str) -> Result<(), AppError>;

    /// Point every listed classroom at `school_id`.
    async fn set_school(&self, classroom_ids: &[String], school_id: &str) -> Result<(), AppError>;

    /// Detach every listed classroom from whichever school it pointed at.
    async fn clear_school(&self, classroom_ids: &[String]) -> Result<(), AppError>;
}

#[derive(Default)]
pub struct MemoryClassroomStore {
    classrooms: RwLock<HashMap<String, Classroom>>,
}

impl MemoryClassroomStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ClassroomStore for MemoryClassroomStore {
    async fn insert(&self, classroom: &Classroom) -> Result<(), AppError> {
        self.classrooms
            .write()
            .await
            .insert(classroom.id.clone(), classroom.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Classroom>, AppError> {
        Ok(self.classrooms.read().await.get(id).cloned())
    }

    async fn find_all(&self) -> Result<Vec<Classroom>, AppError> {
        Ok(self.classrooms.read().await.values().cloned().collect())
    }

    async fn replace(&self, classroom: &Classroom) -> Result<(), AppError> {
        self.classrooms
            .write()
            .await
            .insert(classroom.id.clone(), classroom.clone());
        Ok(())
    }

    async fn delete_by_id(&self, id: &str) -> Result<Option<Classroom>, AppError> {
        Ok(self.classrooms.write().await.remove(id))
    }

    async fn count_by_id(&self, id: &str) -> Result<u64, AppError> {
        Ok(self.classrooms.read().await.contains_key(id) as u64)
    }

    async fn add_student(
        &self,
        classroom_ids: &[String],
        student_id: &str,
    ) -> Result<(), AppError> {
        let mut classrooms = self.classrooms.write().await;
        for id in classroom_ids {
            if let Some(classroom) = classrooms.get_mut(id) {
                if !classroom.students.iter().any(|s| s == student_id) {
                    classroom.students.push(student_id.to_string());
                }
            }
        }
        Ok(())
    }

    async fn remove_student(
        &self,
        classroom_ids: &[String],
        student_id: &str,
    ) -> Result<(), AppError> {
        let mut classrooms = self.classrooms.write().await;
        for id in classroom_ids {
            if let Some(classroom) = classrooms.get_mut(id) {
                classroom.students.retain(|s| s != student_id);
            }
        }
        Ok(())
    }

    async fn remove_student_everywhere(&self, student_id: &str) -> Result<(), AppError> {
        let mut classrooms = self.classrooms.write().await;
        for classroom in classrooms.values_mut() {
            classroom.students.retain(|s| s != student_id);
        }
        Ok(())
    }

    async fn set_school(&self, classroom_ids: &[String], school_id: &str) -> Result<(), AppError> {
        let mut classrooms = self.classrooms.write().await;
        for id in classroom_ids {
            if let Some(classroom) = classrooms.get_mut(id) {
                classroom.school = Some(school_id.to_string());
            }
        }
        Ok(())
    }

    async fn clear_school(&self, classroom_ids: &[String]) -> Result<(), AppError> {
        let mut classrooms = self.classrooms.write().await;
        for id in classroom_ids {
            if let Some(classroom) = classrooms.get_mut(id) {
                classroom.school = None;
            }
        }
        Ok(())
    }
}

pub struct MongoClassroomStore {
    classrooms: Collection<Classroom>,
}

impl MongoClassroomStore {
    pub async fn connect(uri: &str, database: &str) -> Result<Self, AppError> {
        tracing::info!(uri = %uri, database = %database, "connecting to MongoDB");
        let client = MongoClient::with_uri_str(uri).await?;
        let db = client.database(database);
        Ok(Self {
            classrooms: db.collection::<Classroom>("classrooms"),
        })
    }
}

#[async_trait]
impl ClassroomStore for MongoClassroomStore {
    async fn insert(&self, classroom: &Classroom) -> Result<(), AppError> {
        self.classrooms.insert_one(classroom, None).await?;
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Classroom>, AppError> {
        Ok(self.classrooms.find_one(doc! { "id": id }, None).await?)
    }

    async fn find_all(&self) -> Result<Vec<Classroom>, AppError> {
        let cursor = self.classrooms.find(doc! {}, None).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn replace(&self, classroom: &Classroom) -> Result<(), AppError> {
        self.classrooms
            .replace_one(doc! { "id": &classroom.id }, classroom, None)
            .await?;
        Ok(())
    }

    async fn delete_by_id(&self, id: &str) -> Result<Option<Classroom>, AppError> {
        Ok(self
            .classrooms
            .find_one_and_delete(doc! { "id": id }, None)
            .await?)
    }

    async fn count_by_id(&self, id: &str) -> Result<u64, AppError> {
        Ok(self
            .classrooms
            .count_documents(doc! { "id": id }, None)
            .await?)
    }

    async fn add_student(
        &self,
        classroom_ids: &[String],
        student_id: &str,
    ) -> Result<(), AppError> {
        self.classrooms
            .update_many(
                doc! { "id": { "$in": classroom_ids.to_vec() } },
                doc! { "$addToSet": { "students": student_id } },
                None,
            )
            .await?;
        Ok(())
    }

    async fn remove_student(
        &self,
        classroom_ids: &[String],
        student_id: &str,
    ) -> Result<(), AppError> {
        self.classrooms
            .update_many(
                doc! { "id": { "$in": classroom_ids.to_vec() } },
                doc! { "$pull": { "students": student_id } },
                None,
            )
            .await?;
        Ok(())
    }

    async fn remove_student_everywhere(&self, student_id: &str) -> Result<(), AppError> {
        self.classrooms
            .update_many(
                doc! { "students": student_id },
                doc! { "$pull": { "students": student_id } },
                None,
            )
            .await?;
        Ok(())
    }

    async fn set_school(&self, classroom_ids: &[String], school_id: &str) -> Result<(), AppError> {
        self.classrooms
            .update_many(
                doc! { "id": { "$in": classroom_ids.to_vec() } },
                doc! { "$set": { "school": school_id } },
                None,
            )
            .await?;
        Ok(())
    }

    async fn clear_school(&self, classroom_ids: &[String]) -> Result<(), AppError> {
        self.classrooms
            .update_many(
                doc! { "id": { "$in": classroom_ids.to_vec() } },
                doc! { "$unset": { "school": 1 } },
                None,
            )
            .await?;
        Ok(())
    }
}
