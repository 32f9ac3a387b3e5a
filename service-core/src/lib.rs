//! service-core: Shared infrastructure for the school-management microservices.
pub mod bus;
pub mod config;
pub mod envelope;
pub mod error;
pub mod ids;
pub mod observability;
pub mod permissions;
pub mod pipeline;
pub mod tokens;
pub mod validation;

pub use async_trait;
pub use mongodb;
pub use serde;
pub use serde_json;
pub use tokio;
pub use tracing;
pub use validator;
