//! Validation pipeline — type conformance first, then optional domain rules.

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;

// ---------------------------------------------------------------------------
// Failure kinds
// ---------------------------------------------------------------------------

/// Why one response was rejected. Both kinds are recoverable inside the
/// translation loop; the message is echoed verbatim into the repair prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationFailure {
    Schema(String),
    Constraint(String),
}

impl ValidationFailure {
    pub fn message(&self) -> &str {
        match self {
            Self::Schema(msg) | Self::Constraint(msg) => msg,
        }
    }

    pub fn into_message(self) -> String {
        match self {
            Self::Schema(msg) | Self::Constraint(msg) => msg,
        }
    }
}

// ---------------------------------------------------------------------------
// Validator traits
// ---------------------------------------------------------------------------

/// Structural validation: parse JSON text into the target type, or explain
/// what does not conform. Diagnostics must be self-contained since they
/// steer the model during repair.
pub trait TypeValidator<T>: Send + Sync {
    /// The schema text shown to the model inside prompts.
    fn schema_text(&self) -> &str;

    fn validate(&self, json_text: &str) -> Result<T, String>;
}

/// Domain-rule validation applied only to structurally valid values.
pub trait ConstraintValidator<T>: Send + Sync {
    fn check(&self, value: T) -> Result<T, String>;
}

impl<T, F> ConstraintValidator<T> for F
where
    F: Fn(T) -> Result<T, String> + Send + Sync,
{
    fn check(&self, value: T) -> Result<T, String> {
        self(value)
    }
}

// ---------------------------------------------------------------------------
// SchemaValidator — serde-backed default
// ---------------------------------------------------------------------------

/// Default `TypeValidator`: deserialize into `T`, carrying caller-supplied
/// schema text. serde's error messages name the offending field and position,
/// which is exactly what a repair prompt needs.
pub struct SchemaValidator<T> {
    schema: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> SchemaValidator<T> {
    pub fn new(schema: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            _marker: PhantomData,
        }
    }

    /// Derive the schema text from the type itself.
    pub fn for_type() -> Self
    where
        T: JsonSchema,
    {
        let schema = schemars::gen::SchemaGenerator::default().into_root_schema_for::<T>();
        Self::new(serde_json::to_string_pretty(&schema).unwrap_or_default())
    }
}

impl<T: DeserializeOwned> TypeValidator<T> for SchemaValidator<T> {
    fn schema_text(&self) -> &str {
        &self.schema
    }

    fn validate(&self, json_text: &str) -> Result<T, String> {
        serde_json::from_str(json_text).map_err(|e| e.to_string())
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Decision returned by an acceptance gate: accept now, reject now, or let
/// constraint validation proceed.
pub type GateDecision = Option<Result<(), String>>;

/// Composes the type validator with an optional acceptance gate and an
/// optional constraint validator. Each `validate` call is independent; the
/// pipeline holds no mutable state.
pub struct ValidationPipeline<T> {
    type_validator: Box<dyn TypeValidator<T>>,
    constraint_validator: Option<Box<dyn ConstraintValidator<T>>>,
    gate: Option<Box<dyn Fn(&T) -> GateDecision + Send + Sync>>,
}

impl<T> ValidationPipeline<T> {
    pub fn new(type_validator: Box<dyn TypeValidator<T>>) -> Self {
        Self {
            type_validator,
            constraint_validator: None,
            gate: None,
        }
    }

    pub fn with_constraints(mut self, validator: Box<dyn ConstraintValidator<T>>) -> Self {
        self.constraint_validator = Some(validator);
        self
    }

    /// Install a short-circuit gate. When the gate returns a decision,
    /// constraint validation does not run.
    pub fn with_gate(mut self, gate: impl Fn(&T) -> GateDecision + Send + Sync + 'static) -> Self {
        self.gate = Some(Box::new(gate));
        self
    }

    pub fn schema_text(&self) -> &str {
        self.type_validator.schema_text()
    }

    pub fn validate(&self, json_text: &str) -> Result<T, ValidationFailure> {
        let value = self
            .type_validator
            .validate(json_text)
            .map_err(ValidationFailure::Schema)?;

        if let Some(gate) = &self.gate {
            match gate(&value) {
                Some(Ok(())) => return Ok(value),
                Some(Err(msg)) => return Err(ValidationFailure::Constraint(msg)),
                None => {}
            }
        }

        match &self.constraint_validator {
            Some(cv) => cv.check(value).map_err(ValidationFailure::Constraint),
            None => Ok(value),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
