//! Program evaluator — sequential step execution with back-reference substitution.

use crate::registry::FunctionRegistry;
use crate::EvalError;
use async_recursion::async_recursion;
use serde_json::Value;
use tc_core::program::{Expr, FunctionCall, Program};
use tokio_util::sync::CancellationToken;

/// Evaluates one program against a registry. Steps run strictly in order;
/// the results array grows by one slot per completed step and is the only
/// state a back-reference can observe.
pub struct Evaluator<'a> {
    registry: &'a FunctionRegistry,
    cancel: &'a CancellationToken,
}

impl<'a> Evaluator<'a> {
    pub fn new(registry: &'a FunctionRegistry, cancel: &'a CancellationToken) -> Self {
        Self { registry, cancel }
    }

    /// Run every step, returning one result per step. A failed step aborts
    /// the remaining plan.
    pub async fn run(&self, program: &Program) -> Result<Vec<Value>, EvalError> {
        let mut results: Vec<Value> = Vec::with_capacity(program.steps().len());

        for (step, call) in program.steps().iter().enumerate() {
            if self.cancel.is_cancelled() {
                return Err(EvalError::Cancelled);
            }
            tracing::debug!("step {step}: calling '{}'", call.name);
            let value = self.eval_call(step, call, &results).await?;
            results.push(value);
        }

        Ok(results)
    }

    async fn eval_call(
        &self,
        step: usize,
        call: &FunctionCall,
        results: &[Value],
    ) -> Result<Value, EvalError> {
        let mut args = Vec::with_capacity(call.args.len());
        for arg in &call.args {
            args.push(self.eval_expr(step, arg, results).await?);
        }

        let function = self
            .registry
            .resolve(&call.name)
            .ok_or_else(|| EvalError::FunctionNotFound(call.name.clone()))?;

        let expected = function.parameters().len();
        if args.len() != expected {
            return Err(EvalError::ArityMismatch {
                name: call.name.clone(),
                expected,
                actual: args.len(),
            });
        }

        function
            .invoke(args)
            .await
            .map_err(|err| EvalError::StepFailed {
                step,
                name: call.name.clone(),
                message: format!("{err:#}"),
            })
    }

    #[async_recursion]
    async fn eval_expr(
        &self,
        step: usize,
        expr: &Expr,
        results: &[Value],
    ) -> Result<Value, EvalError> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(self.eval_expr(step, item, results).await?);
                }
                Ok(Value::Array(out))
            }
            Expr::Object(fields) => {
                let mut map = serde_json::Map::new();
                for (key, value) in fields {
                    map.insert(key.clone(), self.eval_expr(step, value, results).await?);
                }
                Ok(Value::Object(map))
            }
            Expr::Ref(reference) => {
                results
                    .get(reference.index())
                    .cloned()
                    .ok_or(EvalError::InvalidReference {
                        index: reference.index(),
                        completed: results.len(),
                    })
            }
            Expr::Call(call) => self.eval_call(step, call, results).await,
            Expr::Unknown(node) => Err(EvalError::UnrecognizedExpression(node.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
