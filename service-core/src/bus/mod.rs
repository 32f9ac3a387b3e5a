//! Request/reply RPC layered over a publish/subscribe bus.
//!
//! A call addresses a shared node type plus a `"<module>.<function>"` string
//! and is delivered to exactly one live subscriber hosting that module
//! (load-balancing across horizontally scaled instances). Delivery is
//! best-effort: no retry, no ordering, and a timeout surfaces as an error the
//! caller must decide how to degrade from.

mod dispatcher;
mod memory;
mod redis;

pub use self::dispatcher::{BusModule, Dispatcher};
pub use self::memory::MemoryBus;
pub use self::redis::{serve, RedisBus};

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Default ceiling on a single request/reply round trip.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum BusError {
    #[error("bus call timed out after {0:?}")]
    Timeout(Duration),

    #[error("no subscriber for {0}")]
    Unroutable(String),

    #[error("malformed function ref {0:?}, expected \"<module>.<function>\"")]
    BadFunctionRef(String),

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("malformed bus payload: {0}")]
    Codec(String),
}

/// Wire frame for one request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallEnvelope {
    pub id: String,
    pub call: String,
    pub args: Value,
    /// Absent for fire-and-forget notifications.
    pub reply_to: Option<String>,
}

/// Wire frame for one reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyEnvelope {
    pub id: String,
    pub body: Value,
}

/// Reply contract for existence fan-out checks between entity managers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExistsReply {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing: Vec<String>,
}

impl ExistsReply {
    pub fn all_present() -> Self {
        Self {
            ok: true,
            error: None,
            missing: Vec::new(),
        }
    }

    pub fn some_missing(kind: &str, missing: Vec<String>) -> Self {
        Self {
            ok: false,
            error: Some(format!("{kind} {} do not exist", missing.join(","))),
            missing,
        }
    }
}

/// Addressable request/reply abstraction over the underlying transport.
#[async_trait]
pub trait RpcBus: Send + Sync {
    /// Call a named function on one live instance of the target module and
    /// await its single reply.
    async fn call(
        &self,
        node_type: &str,
        function_ref: &str,
        args: Value,
    ) -> Result<Value, BusError>;

    /// Fire-and-forget variant: hand the call to one live instance and return
    /// without awaiting a reply.
    async fn notify(
        &self,
        node_type: &str,
        function_ref: &str,
        args: Value,
    ) -> Result<(), BusError>;
}

pub(crate) fn split_function_ref(function_ref: &str) -> Result<(&str, &str), BusError> {
    function_ref
        .split_once('.')
        .filter(|(module, function)| !module.is_empty() && !function.is_empty())
        .ok_or_else(|| BusError::BadFunctionRef(function_ref.to_string()))
}
