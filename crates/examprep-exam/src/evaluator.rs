//! Answer grading against retrieved reference content.

use examprep_core::prompts::PromptTemplate;
use examprep_core::types::MAX_MARKS;
use examprep_core::{Evaluation, Result, TextGenerator};
use serde_json::{Map, Value, from_str};
use std::sync::Arc;
use tracing::{debug, warn};

/// Feedback used when the grader omits it
pub const MISSING_FEEDBACK: &str = "No feedback.";

/// Grades one answer at a time with a single model call per attempt.
pub struct AnswerEvaluator {
    model: Arc<dyn TextGenerator>,
    max_attempts: usize,
}

impl AnswerEvaluator {
    /// Create an evaluator making exactly one model call per answer.
    pub fn new(model: Arc<dyn TextGenerator>) -> Self {
        Self {
            model,
            max_attempts: 1,
        }
    }

    /// Allow up to `max_attempts` calls per answer when the reply is unusable.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Invoke the grading model once and return its raw output.
    ///
    /// # Errors
    /// Returns the provider error if the model call fails.
    pub async fn evaluate(
        &self,
        question: &str,
        reference_context: &str,
        candidate_answer: &str,
    ) -> Result<String> {
        let prompt = PromptTemplate::AnswerEvaluation.render(&[
            ("question", question),
            ("reference_context", reference_context),
            ("candidate_answer", candidate_answer),
        ]);
        let completion = self.model.invoke(&prompt).await?;
        debug!("Grader {} replied: {}", completion.provider, completion.text);
        Ok(completion.text)
    }

    /// Evaluate and parse, falling back to the invalid-response evaluation.
    pub async fn grade(
        &self,
        question: &str,
        reference_context: &str,
        candidate_answer: &str,
    ) -> Evaluation {
        for attempt in 1..=self.max_attempts {
            match self.evaluate(question, reference_context, candidate_answer).await {
                Ok(raw) => {
                    if let Some(evaluation) = try_parse_evaluation(&raw) {
                        return evaluation;
                    }
                    warn!(
                        "Grading attempt {attempt}/{} returned a non-object reply",
                        self.max_attempts
                    );
                }
                Err(error) => {
                    warn!(
                        "Grading attempt {attempt}/{} failed: {error}",
                        self.max_attempts
                    );
                    if !error.is_retryable() {
                        break;
                    }
                }
            }
        }
        Evaluation::invalid_response()
    }
}

/// Parse grader output, substituting the invalid-response evaluation when it
/// is not a JSON object.
#[must_use]
pub fn parse_evaluation(raw: &str) -> Evaluation {
    try_parse_evaluation(raw).unwrap_or_else(Evaluation::invalid_response)
}

/// Parse grader output if it is a JSON object.
///
/// Fractional marks are rounded, out-of-range marks clamped to 0..=10, and
/// missing fields defaulted.
pub fn try_parse_evaluation(raw: &str) -> Option<Evaluation> {
    let Ok(Value::Object(object)) = from_str::<Value>(raw.trim()) else {
        return None;
    };
    Some(Evaluation::new(read_marks(&object), read_feedback(&object)))
}

fn read_marks(object: &Map<String, Value>) -> u8 {
    let marks = match object.get("marks") {
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(text)) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    marks
        .filter(|value| value.is_finite())
        .map_or(0, |value| value.round().clamp(0.0, f64::from(MAX_MARKS)) as u8)
}

fn read_feedback(object: &Map<String, Value>) -> String {
    match object.get("feedback") {
        Some(Value::String(text)) => text.clone(),
        _ => MISSING_FEEDBACK.to_owned(),
    }
}
