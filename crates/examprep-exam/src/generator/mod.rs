//! Question generation with bounded retries.
//!
//! Each attempt renders the generation prompt, invokes the model once and
//! tries to read a non-empty JSON array of well-formed questions from the
//! reply. The first attempt that succeeds wins; when every attempt fails the
//! result is empty rather than an error.

mod extract;

pub use extract::extract_json_array;

use examprep_core::prompts::PromptTemplate;
use examprep_core::{Question, QuestionType, ShapeError, TextGenerator};
use serde::{Deserialize, Serialize};
use serde_json::{Value, from_str};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Default number of model invocations per request
pub const DEFAULT_MAX_RETRIES: usize = 5;

/// Why one generation attempt produced no questions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttemptFailure {
    /// The model call failed in a way that may pass on another try.
    #[error("model invocation failed: {0}")]
    Provider(String),
    /// The provider refused the request; retrying cannot help.
    #[error("model invocation rejected: {0}")]
    Rejected(String),
    /// No array of objects was found in the reply.
    #[error("no JSON array of objects found in model output")]
    ExtractionMiss,
    /// The extracted text is not valid JSON.
    #[error("extracted JSON is invalid: {0}")]
    InvalidJson(String),
    /// The extracted JSON is not an array.
    #[error("extracted JSON is not a list")]
    NotAList,
    /// The array holds no questions.
    #[error("model returned an empty question list")]
    EmptyList,
    /// One element is not a valid question.
    #[error("question {index} is malformed: {error}")]
    Shape {
        /// 0-based position of the element
        index: usize,
        /// What is wrong with it
        error: ShapeError,
    },
}

impl AttemptFailure {
    /// Whether another attempt could succeed
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Rejected(_))
    }
}

/// Outcome of a generation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GenerationStatus {
    /// At least one question was generated
    Generated,
    /// Retrieval produced no usable context; the model was not called
    NoRelevantContext,
    /// Every attempt failed
    Exhausted,
}

/// What to generate.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Subject the questions must be about
    pub topic: String,
    /// Kind of question requested
    pub question_type: QuestionType,
    /// Number of questions requested
    pub num_questions: usize,
    /// Study material the questions must be drawn from
    pub context: String,
}

/// Questions generated for one request, with their provenance.
#[derive(Debug, Clone)]
pub struct GeneratedQuestions {
    /// Requested topic
    pub topic: String,
    /// Requested question type
    pub question_type: QuestionType,
    /// Context the questions were generated from
    pub context: String,
    /// Generated questions; empty unless `status` is `Generated`
    pub questions: Vec<Question>,
    /// Model invocations made
    pub attempts: usize,
    /// Failure of each unsuccessful attempt, in order
    pub failures: Vec<AttemptFailure>,
    /// Overall outcome
    pub status: GenerationStatus,
}

impl GeneratedQuestions {
    fn empty(request: GenerationRequest, status: GenerationStatus) -> Self {
        Self {
            topic: request.topic,
            question_type: request.question_type,
            context: request.context,
            questions: Vec::new(),
            attempts: 0,
            failures: Vec::new(),
            status,
        }
    }
}

/// Drives the model until it returns a parseable question list.
pub struct QuestionGenerator {
    model: Arc<dyn TextGenerator>,
    max_retries: usize,
}

impl QuestionGenerator {
    /// Create a generator allowing at most `max_retries` model invocations per request.
    pub fn new(model: Arc<dyn TextGenerator>, max_retries: usize) -> Self {
        Self { model, max_retries }
    }

    /// Maximum model invocations per request
    pub fn max_retries(&self) -> usize {
        self.max_retries
    }

    /// Generate questions for `request`.
    pub async fn generate(&self, request: GenerationRequest) -> GeneratedQuestions {
        if request.context.trim().is_empty() {
            info!(
                "No relevant context for topic '{}', skipping generation",
                request.topic
            );
            return GeneratedQuestions::empty(request, GenerationStatus::NoRelevantContext);
        }

        let requested = request.num_questions;
        let num_questions = requested.to_string();
        let prompt = PromptTemplate::QuestionGeneration.render(&[
            ("num_questions", &num_questions),
            ("question_type", request.question_type.label()),
            ("topic", &request.topic),
            ("context", &request.context),
        ]);

        let mut result = GeneratedQuestions::empty(request, GenerationStatus::Exhausted);

        for attempt in 1..=self.max_retries {
            result.attempts = attempt;
            match self.attempt(&prompt).await {
                Ok(questions) => {
                    if questions.len() != requested {
                        warn!(
                            "Requested {requested} questions on '{}', model returned {}",
                            result.topic,
                            questions.len()
                        );
                    }
                    info!(
                        "Generated {} {} questions on '{}' in {attempt} attempt(s)",
                        questions.len(),
                        result.question_type,
                        result.topic
                    );
                    result.questions = questions;
                    result.status = GenerationStatus::Generated;
                    return result;
                }
                Err(failure) => {
                    warn!(
                        "Generation attempt {attempt}/{} for '{}' failed: {failure}",
                        self.max_retries, result.topic
                    );
                    let retryable = failure.is_retryable();
                    result.failures.push(failure);
                    if !retryable {
                        warn!("Provider error is not retryable, stopping early");
                        break;
                    }
                }
            }
        }

        warn!(
            "Giving up on '{}' after {} attempts",
            result.topic, result.attempts
        );
        result
    }

    async fn attempt(&self, prompt: &str) -> Result<Vec<Question>, AttemptFailure> {
        let completion = self
            .model
            .invoke(prompt)
            .await
            .map_err(|error| {
                if error.is_retryable() {
                    AttemptFailure::Provider(error.to_string())
                } else {
                    AttemptFailure::Rejected(error.to_string())
                }
            })?;
        debug!(
            "{} replied with {} characters",
            completion.provider,
            completion.text.len()
        );
        parse_questions(&completion.text)
    }
}

/// Read a question list from raw model output.
///
/// # Errors
/// Returns the [`AttemptFailure`] describing the first problem found.
pub fn parse_questions(raw: &str) -> Result<Vec<Question>, AttemptFailure> {
    let json = extract_json_array(raw).ok_or(AttemptFailure::ExtractionMiss)?;
    let value: Value =
        from_str(json).map_err(|error| AttemptFailure::InvalidJson(error.to_string()))?;

    let Value::Array(items) = value else {
        return Err(AttemptFailure::NotAList);
    };
    if items.is_empty() {
        return Err(AttemptFailure::EmptyList);
    }

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            Question::try_from(item).map_err(|error| AttemptFailure::Shape { index, error })
        })
        .collect()
}
