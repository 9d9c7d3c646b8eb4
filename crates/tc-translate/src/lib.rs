//! tc-translate: Drive a language model toward a schema-valid typed value.
//!
//! Loop: assemble prompt → complete → classify → validate, repairing invalid
//! output by feeding the diagnostic back to the model, up to a bounded number
//! of attempts. The transcript is trimmed between repair rounds so its size
//! stays constant no matter how many rounds run.

pub mod observe;
pub mod prompt;
pub mod validate;

pub use observe::TranslationObserver;
pub use validate::{
    ConstraintValidator, GateDecision, SchemaValidator, TypeValidator, ValidationFailure,
    ValidationPipeline,
};

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use tc_core::prompt::{Prompt, PromptSection};
use tc_core::response::{Completeness, JsonResponse};
use tc_model::{CompletionSettings, LanguageModel, ModelError};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("model error: {0}")]
    Model(ModelError),
    #[error("repair budget exhausted after {attempts} attempt(s): {diagnostic}")]
    RepairBudgetExhausted {
        attempts: u32,
        /// The last validation diagnostic.
        diagnostic: String,
        /// The last raw model response, for post-mortem inspection.
        response: String,
    },
    #[error("cancelled")]
    Cancelled,
}

// ---------------------------------------------------------------------------
// Translator
// ---------------------------------------------------------------------------

/// Translates natural-language requests into values of type `T`.
///
/// The configuration is read-only per call; the repair counter and the
/// prompt transcript are call-local, so one `Translator` can serve
/// concurrent `translate` calls independently.
pub struct Translator<T, M> {
    model: M,
    pipeline: ValidationPipeline<T>,
    settings: CompletionSettings,
    max_repair_attempts: u32,
    preamble: Vec<PromptSection>,
    observers: Vec<Box<dyn TranslationObserver>>,
}

impl<T, M> Translator<T, M>
where
    M: LanguageModel,
{
    pub fn new(model: M, pipeline: ValidationPipeline<T>) -> Self {
        Self {
            model,
            pipeline,
            settings: CompletionSettings::default(),
            max_repair_attempts: 1,
            preamble: Vec::new(),
            observers: Vec::new(),
        }
    }

    /// Wire a schemars-derived validator for `T`.
    pub fn for_type(model: M) -> Self
    where
        T: DeserializeOwned + JsonSchema,
    {
        Self::new(
            model,
            ValidationPipeline::new(Box::new(SchemaValidator::<T>::for_type())),
        )
    }

    pub fn with_settings(mut self, settings: CompletionSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Bound on repair rounds after the initial attempt. Zero disables
    /// repair entirely.
    pub fn with_max_repair_attempts(mut self, max: u32) -> Self {
        self.max_repair_attempts = max;
        self
    }

    /// Extra sections placed between the instructions and the request.
    pub fn with_preamble_section(mut self, section: PromptSection) -> Self {
        self.preamble.push(section);
        self
    }

    pub fn with_observer(mut self, observer: Box<dyn TranslationObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Translate one request. The only successful exit is a response that
    /// passes the full validation pipeline.
    pub async fn translate(
        &self,
        request: &str,
        cancel: &CancellationToken,
    ) -> Result<T, TranslateError> {
        let mut transcript =
            prompt::request_prompt(self.pipeline.schema_text(), request, &self.preamble);
        let mut attempts = 0u32;

        loop {
            if cancel.is_cancelled() {
                return Err(TranslateError::Cancelled);
            }

            observe::notify(&self.observers, |o| o.on_send(&transcript));
            let raw = match self.model.complete(&transcript, &self.settings, cancel).await {
                Ok(text) => text,
                Err(ModelError::Cancelled) => return Err(TranslateError::Cancelled),
                Err(err) => return Err(TranslateError::Model(err)),
            };
            observe::notify(&self.observers, |o| o.on_response(&raw));

            let response = JsonResponse::classify(raw);
            let diagnostic = match response.completeness() {
                Completeness::CompleteJson => {
                    match self
                        .pipeline
                        .validate(response.json_body().unwrap_or_default())
                    {
                        Ok(value) => return Ok(value),
                        Err(failure) => failure.into_message(),
                    }
                }
                Completeness::PartialJson => {
                    "the JSON value is incomplete: the output ended before all brackets were closed"
                        .to_string()
                }
                Completeness::NoJson => "the response contained no JSON value".to_string(),
            };

            tracing::debug!("attempt {} invalid: {diagnostic}", attempts + 1);

            if attempts >= self.max_repair_attempts {
                return Err(TranslateError::RepairBudgetExhausted {
                    attempts,
                    diagnostic,
                    response: response.raw().to_string(),
                });
            }
            attempts += 1;
            observe::notify(&self.observers, |o| o.on_repair(attempts, &diagnostic));

            // From the second round on, replace the previous response/repair
            // pair instead of accumulating it.
            if attempts > 1 {
                transcript.drop_last(prompt::REPAIR_SECTIONS);
            }
            transcript.push(PromptSection::assistant(response.raw().to_string()));
            transcript.push(PromptSection::user(prompt::repair_section(&diagnostic)));
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde::Deserialize;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Deserialize, PartialEq)]
    struct Shape {
        shape: String,
        color: String,
        size: f64,
    }

    struct ScriptedModel {
        responses: Mutex<VecDeque<String>>,
        calls: Arc<AtomicU32>,
    }

    impl ScriptedModel {
        fn new(responses: &[&str]) -> (Self, Arc<AtomicU32>) {
            let calls = Arc::new(AtomicU32::new(0));
            let model = Self {
                responses: Mutex::new(responses.iter().map(|s| s.to_string()).collect()),
                calls: calls.clone(),
            };
            (model, calls)
        }
    }

    #[async_trait]
    impl LanguageModel for ScriptedModel {
        async fn complete(
            &self,
            _prompt: &Prompt,
            _settings: &CompletionSettings,
            _cancel: &CancellationToken,
        ) -> Result<String, ModelError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| ModelError::Malformed("script exhausted".into()))
        }
    }

    #[derive(Default)]
    struct Recorder {
        repairs: Arc<AtomicU32>,
        last_diagnostic: Arc<Mutex<String>>,
        send_sizes: Arc<Mutex<Vec<usize>>>,
    }

    impl TranslationObserver for Recorder {
        fn on_send(&self, prompt: &Prompt) -> anyhow::Result<()> {
            self.send_sizes.lock().unwrap().push(prompt.len());
            Ok(())
        }

        fn on_repair(&self, _attempt: u32, diagnostic: &str) -> anyhow::Result<()> {
            self.repairs.fetch_add(1, Ordering::SeqCst);
            *self.last_diagnostic.lock().unwrap() = diagnostic.to_string();
            Ok(())
        }
    }

    fn shape_pipeline() -> ValidationPipeline<Shape> {
        ValidationPipeline::new(Box::new(SchemaValidator::<Shape>::new(
            "{ shape: string, color: string, size: number }",
        )))
    }

    #[tokio::test]
    async fn valid_first_response_skips_repair() {
        let (model, calls) = ScriptedModel::new(&[r#"{"shape":"circle","color":"red","size":2}"#]);
        let recorder = Recorder::default();
        let repairs = recorder.repairs.clone();

        let translator =
            Translator::new(model, shape_pipeline()).with_observer(Box::new(recorder));
        let value = translator
            .translate("a red circle of size two", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(value.shape, "circle");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(repairs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_field_repairs_once() {
        let (model, calls) = ScriptedModel::new(&[
            r#"{"shape":"square","color":"green"}"#,
            r#"{"shape":"square","color":"green","size":10}"#,
        ]);
        let recorder = Recorder::default();
        let repairs = recorder.repairs.clone();
        let last_diagnostic = recorder.last_diagnostic.clone();

        let translator =
            Translator::new(model, shape_pipeline()).with_observer(Box::new(recorder));
        let value = translator
            .translate("a green square of size 10", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(value.size, 10.0);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(repairs.load(Ordering::SeqCst), 1);
        assert!(last_diagnostic.lock().unwrap().contains("size"));
    }

    #[tokio::test]
    async fn prose_with_zero_budget_fails_after_one_call() {
        let (model, calls) = ScriptedModel::new(&["I'd rather describe it in words."]);

        let translator = Translator::new(model, shape_pipeline()).with_max_repair_attempts(0);
        let err = translator
            .translate("a green square", &CancellationToken::new())
            .await
            .unwrap_err();

        let TranslateError::RepairBudgetExhausted {
            diagnostic,
            response,
            ..
        } = err
        else {
            panic!("expected budget exhaustion");
        };
        assert!(diagnostic.contains("no JSON"));
        assert_eq!(response, "I'd rather describe it in words.");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn partial_json_drives_repair_without_validation() {
        let (model, calls) = ScriptedModel::new(&[
            r#"{"shape":"square","color":"gre"#,
            r#"{"shape":"square","color":"green","size":10}"#,
        ]);
        let recorder = Recorder::default();
        let last_diagnostic = recorder.last_diagnostic.clone();

        let translator =
            Translator::new(model, shape_pipeline()).with_observer(Box::new(recorder));
        let value = translator
            .translate("a green square of size 10", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(value.color, "green");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(last_diagnostic.lock().unwrap().contains("incomplete"));
    }

    #[tokio::test]
    async fn repair_budget_is_a_hard_bound() {
        let (model, calls) = ScriptedModel::new(&["nope", "still nope", "words only"]);

        let translator = Translator::new(model, shape_pipeline()).with_max_repair_attempts(2);
        let err = translator
            .translate("a green square", &CancellationToken::new())
            .await
            .unwrap_err();

        let TranslateError::RepairBudgetExhausted {
            attempts, response, ..
        } = err
        else {
            panic!("expected budget exhaustion");
        };
        assert_eq!(attempts, 2);
        assert_eq!(response, "words only");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn transcript_size_is_bounded_across_rounds() {
        let (model, _calls) = ScriptedModel::new(&["bad", "bad", "bad", "bad"]);
        let recorder = Recorder::default();
        let send_sizes = recorder.send_sizes.clone();

        let translator = Translator::new(model, shape_pipeline())
            .with_max_repair_attempts(3)
            .with_observer(Box::new(recorder));
        let _ = translator
            .translate("a green square", &CancellationToken::new())
            .await;

        let sizes = send_sizes.lock().unwrap().clone();
        assert_eq!(sizes.len(), 4);
        // One response/repair pair on top of the initial prompt, no matter
        // how many rounds have run.
        assert_eq!(sizes[1], sizes[0] + prompt::REPAIR_SECTIONS);
        assert_eq!(sizes[2], sizes[1]);
        assert_eq!(sizes[3], sizes[1]);
    }

    #[tokio::test]
    async fn cancelled_before_first_send() {
        let (model, calls) = ScriptedModel::new(&[r#"{"shape":"s","color":"c","size":1}"#]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let translator = Translator::new(model, shape_pipeline());
        let err = translator.translate("anything", &cancel).await.unwrap_err();

        assert!(matches!(err, TranslateError::Cancelled));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn constraint_violation_drives_repair() {
        let (model, calls) = ScriptedModel::new(&[
            r#"{"shape":"square","color":"green","size":3}"#,
            r#"{"shape":"square","color":"green","size":10}"#,
        ]);

        let pipeline = shape_pipeline().with_constraints(Box::new(|shape: Shape| {
            if shape.size < 5.0 {
                Err(format!("size {} is below the minimum of 5", shape.size))
            } else {
                Ok(shape)
            }
        }));

        let translator = Translator::new(model, pipeline);
        let value = translator
            .translate("a big green square", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(value.size, 10.0);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn provider_error_propagates() {
        let (model, _calls) = ScriptedModel::new(&[]);

        let translator = Translator::new(model, shape_pipeline());
        let err = translator
            .translate("anything", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, TranslateError::Model(_)));
    }
}
