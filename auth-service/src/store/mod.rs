//! User persistence: one trait, a MongoDB implementation for deployments and
//! an in-memory implementation for tests and dev mode.

use std::collections::HashMap;

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::doc;
use mongodb::options::IndexOptions;
use mongodb::{Client as MongoClient, Collection, IndexModel};
use tokio::sync::RwLock;

use service_core::error::AppError;

use crate::models::User;

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert(&self, user: &User) -> Result<(), AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<User>, AppError>;
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError>;
    async fn find_all(&self) -> Result<Vec<User>, AppError>;
    async fn delete_by_id(&self, id: &str) -> Result<Option<User>, AppError>;
    async fn count_username(&self, username: &str) -> Result<u64, AppError>;
}

#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<String, User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn insert(&self, user: &User) -> Result<(), AppError> {
        self.users
            .write()
            .await
            .insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, AppError> {
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn find_all(&self) -> Result<Vec<User>, AppError> {
        Ok(self.users.read().await.values().cloned().collect())
    }

    async fn delete_by_id(&self, id: &str) -> Result<Option<User>, AppError> {
        Ok(self.users.write().await.remove(id))
    }

    async fn count_username(&self, username: &str) -> Result<u64, AppError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .filter(|u| u.username == username)
            .count() as u64)
    }
}

pub struct MongoUserStore {
    users: Collection<User>,
}

impl MongoUserStore {
    pub async fn connect(uri: &str, database: &str) -> Result<Self, AppError> {
        tracing::info!(uri = %uri, database = %database, "connecting to MongoDB");
        let client = MongoClient::with_uri_str(uri).await?;
        let db = client.database(database);
        Ok(Self {
            users: db.collection::<User>("users"),
        })
    }

    pub async fn initialize_indexes(&self) -> Result<(), AppError> {
        let username_index = IndexModel::builder()
            .keys(doc! { "username": 1 })
            .options(
                IndexOptions::builder()
                    .name("username_idx".to_string())
                    .unique(true)
                    .build(),
            )
            .build();
        self.users.create_index(username_index, None).await?;
        Ok(())
    }
}

#[async_trait]
impl UserStore for MongoUserStore {
    async fn insert(&self, user: &User) -> Result<(), AppError> {
        self.users.insert_one(user, None).await?;
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, AppError> {
        Ok(self.users.find_one(doc! { "id": id }, None).await?)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .users
            .find_one(doc! { "username": username }, None)
            .await?)
    }

    async fn find_all(&self) -> Result<Vec<User>, AppError> {
        let cursor = self.users.find(doc! {}, None).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn delete_by_id(&self, id: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .users
            .find_one_and_delete(doc! { "id": id }, None)
            .await?)
    }

    async fn count_username(&self, username: &str) -> Result<u64, AppError> {
        Ok(self
            .users
            .count_documents(doc! { "username": username }, None)
            .await?)
    }
}
