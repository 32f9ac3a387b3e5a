//! School persistence: MongoDB for deployments, in-memory for tests and dev
//! mode. The detach operations enforce the one-school-per-classroom rule at
//! the collection level.

use std::collections::HashMap;

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::doc;
use mongodb::{Client as MongoClient, Collection};
use tokio::sync::RwLock;

use service_core::error::AppError;

use crate::models::School;

#[async_trait]
pub trait SchoolStore: Send + Sync {
    async fn insert(&self, school: &School) -> Result<(), AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<School>, AppError>;
    async fn find_all(&self) -> Result<Vec<School>, AppError>;
    async fn replace(&self, school: &School) -> Result<(), AppError>;
    async fn delete_by_id(&self, id: &str) -> Result<Option<School>, AppError>;

    /// Pull the listed classrooms out of every school's set.
    async fn detach_classrooms(&self, classroom_ids: &[String]) -> Result<(), AppError>;

    /// Pull the listed classrooms out of every school's set except `keep_id`.
    async fn detach_classrooms_except(
        &self,
        classroom_ids: &[String],
        keep_id: &str,
    ) -> Result<(), AppError>;

    /// Scrub a deleted classroom from every school still holding it.
    async fn remove_classroom_everywhere(&self, classroom_id: &str) -> Result<(), AppError>;
}

#[derive(Default)]
pub struct MemorySchoolStore {
    schools: RwLock<HashMap<String, School>>,
}

impl MemorySchoolStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SchoolStore for MemorySchoolStore {
    async fn insert(&self, school: &School) -> Result<(), AppError> {
        self.schools
            .write()
            .await
            .insert(school.id.clone(), school.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<School>, AppError> {
        Ok(self.schools.read().await.get(id).cloned())
    }

    async fn find_all(&self) -> Result<Vec<School>, AppError> {
        Ok(self.schools.read().await.values().cloned().collect())
    }

    async fn replace(&self, school: &School) -> Result<(), AppError> {
        self.schools
            .write()
            .await
            .insert(school.id.clone(), school.clone());
        Ok(())
    }

    async fn delete_by_id(&self, id: &str) -> Result<Option<School>, AppError> {
        Ok(self.schools.write().await.remove(id))
    }

    async fn detach_classrooms(&self, classroom_ids: &[String]) -> Result<(), AppError> {
        let mut schools = self.schools.write().await;
        for school in schools.values_mut() {
            school.classrooms.retain(|c| !classroom_ids.contains(c));
        }
        Ok(())
    }

    async fn detach_classrooms_except(
        &self,
        classroom_ids: &[String],
        keep_id: &str,
    ) -> Result<(), AppError> {
        let mut schools = self.schools.write().await;
        for school in schools.values_mut() {
            if school.id != keep_id {
                school.classrooms.retain(|c| !classroom_ids.contains(c));
            }
        }
        Ok(())
    }

    async fn remove_classroom_everywhere(&self, classroom_id: &str) -> Result<(), AppError> {
        let mut schools = self.schools.write().await;
        for school in schools.values_mut() {
            school.classrooms.retain(|c| c != classroom_id);
        }
        Ok(())
    }
}

pub struct MongoSchoolStore {
    schools: Collection<School>,
}

impl MongoSchoolStore {
    pub async fn connect(uri: &str, database: &str) -> Result<Self, AppError> {
        tracing::info!(uri = %uri, database = %database, "connecting to MongoDB");
        let client = MongoClient::with_uri_str(uri).await?;
        let db = client.database(database);
        Ok(Self {
            schools: db.collection::<School>("schools"),
        })
    }
}

#[async_trait]
impl SchoolStore for MongoSchoolStore {
    async fn insert(&self, school: &School) -> Result<(), AppError> {
        self.schools.insert_one(school, None).await?;
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<School>, AppError> {
        Ok(self.schools.find_one(doc! { "id": id }, None).await?)
    }

    async fn find_all(&self) -> Result<Vec<School>, AppError> {
        let cursor = self.schools.find(doc! {}, None).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn replace(&self, school: &School) -> Result<(), AppError> {
        self.schools
            .replace_one(doc! { "id": &school.id }, school, None)
            .await?;
        Ok(())
    }

    async fn delete_by_id(&self, id: &str) -> Result<Option<School>, AppError> {
        Ok(self
            .schools
            .find_one_and_delete(doc! { "id": id }, None)
            .await?)
    }

    async fn detach_classrooms(&self, classroom_ids: &[String]) -> Result<(), AppError> {
        self.schools
            .update_many(
                doc! { "classrooms": { "$in": classroom_ids.to_vec() } },
                doc! { "$pullAll": { "classrooms": classroom_ids.to_vec() } },
                None,
            )
            .await?;
        Ok(())
    }

    async fn detach_classrooms_except(
        &self,
        classroom_ids: &[String],
        keep_id: &str,
    ) -> Result<(), AppError> {
        self.schools
            .update_many(
                doc! {
                    "classrooms": { "$in": classroom_ids.to_vec() },
                    "id": { "$ne": keep_id },
                },
                doc! { "$pullAll": { "classrooms": classroom_ids.to_vec() } },
                None,
            )
            .await?;
        Ok(())
    }

    async fn remove_classroom_everywhere(&self, classroom_id: &str) -> Result<(), AppError> {
        self.schools
            .update_many(
                doc! { "classrooms": classroom_id },
                doc! { "$pull": { "classrooms": classroom_id } },
                None,
            )
            .await?;
        Ok(())
    }
}
