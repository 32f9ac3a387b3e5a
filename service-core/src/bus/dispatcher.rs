//! Inbound call dispatch: module registry plus per-module allow-lists.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::split_function_ref;

/// A module reachable over the bus.
///
/// `exposed()` is the allow-list and the only access control at the bus
/// layer: callers cannot reach a handler the module did not list.
#[async_trait]
pub trait BusModule: Send + Sync {
    fn module_name(&self) -> &'static str;

    /// Function names callable over the bus.
    fn exposed(&self) -> &'static [&'static str];

    /// Invoke an allow-listed handler by name. Only called after the
    /// allow-list check in `intercept`.
    async fn handle(&self, function: &str, args: Value) -> Value;

    /// Single entry point used by the dispatcher.
    async fn intercept(&self, function: &str, args: Value) -> Value {
        if self.exposed().contains(&function) {
            self.handle(function, args).await
        } else {
            json!({ "error": format!("{function} is not executable") })
        }
    }
}

/// Routes `"<module>.<function>"` strings to registered modules.
#[derive(Default)]
pub struct Dispatcher {
    modules: HashMap<String, Arc<dyn BusModule>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, module: Arc<dyn BusModule>) {
        self.modules
            .insert(module.module_name().to_string(), module);
    }

    pub fn module_names(&self) -> Vec<String> {
        self.modules.keys().cloned().collect()
    }

    /// Resolve and invoke; unknown modules and malformed call strings get a
    /// structured error reply instead of an invocation.
    pub async fn dispatch(&self, call: &str, args: Value) -> Value {
        let Ok((module_name, function)) = split_function_ref(call) else {
            return json!({ "error": format!("malformed call {call}") });
        };
        match self.modules.get(module_name) {
            Some(module) => module.intercept(function, args).await,
            None => json!({ "error": format!("module {module_name} not found") }),
        }
    }
}
