//! Function registry — stores and resolves the callables a program may invoke.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// ProgramFunction
// ---------------------------------------------------------------------------

/// A callable capability exposed to programs.
///
/// `parameters` declares the ordered parameter names. The evaluator binds
/// arguments by position and requires the count to match exactly.
#[async_trait]
pub trait ProgramFunction: Send + Sync {
    fn parameters(&self) -> &[String];

    async fn invoke(&self, args: Vec<Value>) -> anyhow::Result<Value>;
}

/// Adapter exposing an async closure as a `ProgramFunction`.
pub struct FnHandler<F> {
    parameters: Vec<String>,
    handler: F,
}

#[async_trait]
impl<F, Fut> ProgramFunction for FnHandler<F>
where
    F: Fn(Vec<Value>) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Value>> + Send,
{
    fn parameters(&self) -> &[String] {
        &self.parameters
    }

    async fn invoke(&self, args: Vec<Value>) -> anyhow::Result<Value> {
        (self.handler)(args).await
    }
}

// ---------------------------------------------------------------------------
// FunctionRegistry
// ---------------------------------------------------------------------------

/// In-memory function registry.
#[derive(Default, Clone)]
pub struct FunctionRegistry {
    functions: HashMap<String, Arc<dyn ProgramFunction>>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a function. Overwrites if the same name already exists.
    pub fn register(&mut self, name: impl Into<String>, function: Arc<dyn ProgramFunction>) {
        self.functions.insert(name.into(), function);
    }

    /// Register an async closure under `name` with the given parameter names.
    pub fn register_fn<F, Fut>(&mut self, name: impl Into<String>, parameters: &[&str], handler: F)
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        self.register(
            name,
            Arc::new(FnHandler {
                parameters: parameters.iter().map(|p| p.to_string()).collect(),
                handler,
            }),
        );
    }

    /// Look up a function by name.
    pub fn resolve(&self, name: &str) -> Option<Arc<dyn ProgramFunction>> {
        self.functions.get(name).cloned()
    }

    /// Names of all registered functions.
    pub fn names(&self) -> Vec<&str> {
        self.functions.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
