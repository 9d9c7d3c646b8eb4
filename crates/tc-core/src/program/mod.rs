//! Program DSL — immutable expression tree for model-authored multi-step plans.
//!
//! A program document is a JSON object of the form
//! `{"@steps": [{"@func": "name", "@args": [...]}, ...]}`. Arguments may be
//! literals, arrays, objects, nested calls, or `{"@ref": n}` back-references
//! to the result of an earlier step.

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProgramError {
    #[error("document is not a program: {0}")]
    NotAProgram(String),
    #[error("step reference must be non-negative, got {0}")]
    NegativeRef(i64),
    #[error("malformed program: {0}")]
    Malformed(String),
}

// ---------------------------------------------------------------------------
// StepRef
// ---------------------------------------------------------------------------

/// A back-reference to the result of an already-completed step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepRef {
    index: usize,
}

impl StepRef {
    /// Construction enforces the non-negative invariant.
    pub fn new(index: i64) -> Result<Self, ProgramError> {
        if index < 0 {
            return Err(ProgramError::NegativeRef(index));
        }
        Ok(Self {
            index: index as usize,
        })
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

// ---------------------------------------------------------------------------
// Expression tree
// ---------------------------------------------------------------------------

/// A function call: a name plus ordered argument expressions.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    pub args: Vec<Expr>,
}

/// One node of the expression tree. `Unknown` carries the originating JSON
/// node for any shape that matches no recognized variant; evaluating it must
/// fail, never produce a value.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Call(FunctionCall),
    Literal(Value),
    Array(Vec<Expr>),
    Object(Vec<(String, Expr)>),
    Ref(StepRef),
    Unknown(Value),
}

// ---------------------------------------------------------------------------
// Program
// ---------------------------------------------------------------------------

/// An immutable plan: the ordered top-level calls plus the document they
/// were parsed from, kept for diagnostics.
#[derive(Debug, Clone)]
pub struct Program {
    steps: Vec<FunctionCall>,
    source: Option<Value>,
}

impl Program {
    /// Build the expression tree bottom-up from a parsed JSON document.
    pub fn parse(doc: Value) -> Result<Self, ProgramError> {
        let steps_node = doc
            .get("@steps")
            .ok_or_else(|| ProgramError::NotAProgram("missing \"@steps\"".into()))?;
        let entries = steps_node
            .as_array()
            .ok_or_else(|| ProgramError::NotAProgram("\"@steps\" is not an array".into()))?;

        let mut steps = Vec::with_capacity(entries.len());
        for (i, entry) in entries.iter().enumerate() {
            match parse_expr(entry)? {
                Expr::Call(call) => steps.push(call),
                _ => {
                    return Err(ProgramError::Malformed(format!(
                        "step {i} is not a function call"
                    )))
                }
            }
        }

        Ok(Self {
            steps,
            source: Some(doc),
        })
    }

    /// Parse a program from JSON text.
    pub fn parse_str(text: &str) -> Result<Self, ProgramError> {
        let doc: Value =
            serde_json::from_str(text).map_err(|e| ProgramError::Malformed(e.to_string()))?;
        Self::parse(doc)
    }

    pub fn steps(&self) -> &[FunctionCall] {
        &self.steps
    }

    /// The original document, when the program was built from one.
    pub fn source(&self) -> Option<&Value> {
        self.source.as_ref()
    }
}

// ---------------------------------------------------------------------------
// Expression parsing
// ---------------------------------------------------------------------------

fn parse_expr(node: &Value) -> Result<Expr, ProgramError> {
    match node {
        Value::Object(map) => {
            let directives: Vec<&str> = map
                .keys()
                .filter(|k| k.starts_with('@'))
                .map(String::as_str)
                .collect();

            if directives.is_empty() {
                let mut fields = Vec::with_capacity(map.len());
                for (key, value) in map {
                    fields.push((key.clone(), parse_expr(value)?));
                }
                return Ok(Expr::Object(fields));
            }

            if directives == ["@ref"] && map.len() == 1 {
                return match map["@ref"].as_i64() {
                    // A negative index is a construction failure, not an
                    // Unknown placeholder.
                    Some(index) => Ok(Expr::Ref(StepRef::new(index)?)),
                    None => Ok(Expr::Unknown(node.clone())),
                };
            }

            if directives.contains(&"@func")
                && directives.iter().all(|d| *d == "@func" || *d == "@args")
                && map.keys().all(|k| k.starts_with('@'))
            {
                let Some(name) = map["@func"].as_str() else {
                    return Ok(Expr::Unknown(node.clone()));
                };
                let args = match map.get("@args") {
                    None => Vec::new(),
                    Some(Value::Array(items)) => items
                        .iter()
                        .map(parse_expr)
                        .collect::<Result<Vec<_>, _>>()?,
                    Some(_) => return Ok(Expr::Unknown(node.clone())),
                };
                return Ok(Expr::Call(FunctionCall {
                    name: name.to_string(),
                    args,
                }));
            }

            // Any other use of "@" keys is an unrecognized directive.
            Ok(Expr::Unknown(node.clone()))
        }
        Value::Array(items) => Ok(Expr::Array(
            items.iter().map(parse_expr).collect::<Result<Vec<_>, _>>()?,
        )),
        _ => Ok(Expr::Literal(node.clone())),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
