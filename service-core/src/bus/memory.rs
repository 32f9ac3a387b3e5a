//! In-process transport: a broker keyed by (node type, module) with
//! round-robin pick across subscribers. Used by tests and single-process
//! deployments.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use tokio::time::timeout;

use super::{split_function_ref, BusError, Dispatcher, RpcBus, DEFAULT_CALL_TIMEOUT};

#[derive(Clone)]
pub struct MemoryBus {
    inner: Arc<Inner>,
}

struct Inner {
    groups: DashMap<String, Group>,
    call_timeout: Duration,
}

#[derive(Default)]
struct Group {
    subscribers: Vec<Arc<Dispatcher>>,
    next: AtomicUsize,
}

impl MemoryBus {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_CALL_TIMEOUT)
    }

    pub fn with_timeout(call_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                groups: DashMap::new(),
                call_timeout,
            }),
        }
    }

    /// Subscribe a dispatcher under `node_type` for every module it hosts.
    pub fn attach(&self, node_type: &str, dispatcher: Arc<Dispatcher>) {
        for module in dispatcher.module_names() {
            self.inner
                .groups
                .entry(group_key(node_type, &module))
                .or_default()
                .subscribers
                .push(dispatcher.clone());
        }
    }

    fn pick(&self, node_type: &str, module: &str) -> Option<Arc<Dispatcher>> {
        let group = self.inner.groups.get(&group_key(node_type, module))?;
        if group.subscribers.is_empty() {
            return None;
        }
        let idx = group.next.fetch_add(1, Ordering::Relaxed) % group.subscribers.len();
        Some(group.subscribers[idx].clone())
    }
}

impl Default for MemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

fn group_key(node_type: &str, module: &str) -> String {
    format!("{node_type}:{module}")
}

#[async_trait]
impl RpcBus for MemoryBus {
    async fn call(
        &self,
        node_type: &str,
        function_ref: &str,
        args: Value,
    ) -> Result<Value, BusError> {
        let (module, _) = split_function_ref(function_ref)?;
        let dispatcher = self
            .pick(node_type, module)
            .ok_or_else(|| BusError::Unroutable(format!("{node_type}/{module}")))?;
        let call = function_ref.to_string();
        timeout(self.inner.call_timeout, dispatcher.dispatch(&call, args))
            .await
            .map_err(|_| BusError::Timeout(self.inner.call_timeout))
    }

    async fn notify(
        &self,
        node_type: &str,
        function_ref: &str,
        args: Value,
    ) -> Result<(), BusError> {
        let (module, _) = split_function_ref(function_ref)?;
        let dispatcher = self
            .pick(node_type, module)
            .ok_or_else(|| BusError::Unroutable(format!("{node_type}/{module}")))?;
        let call = function_ref.to_string();
        tokio::spawn(async move {
            let reply = dispatcher.dispatch(&call, args).await;
            tracing::debug!(call = %call, ?reply, "notification handled");
        });
        Ok(())
    }
}
