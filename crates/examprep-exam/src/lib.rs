//! Question generation, answer grading and exam session management.
#![cfg_attr(
    test,
    allow(
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::missing_panics_doc,
        clippy::missing_errors_doc,
        reason = "Test allows"
    )
)]

/// Answer grading and grader output parsing
pub mod evaluator;
pub mod generator;
pub mod report;
pub mod session;
pub mod store;

pub use evaluator::{AnswerEvaluator, parse_evaluation, try_parse_evaluation};
pub use generator::{
    AttemptFailure, GeneratedQuestions, GenerationRequest, GenerationStatus, QuestionGenerator,
    extract_json_array, parse_questions,
};
pub use report::{ReportRow, ScoreReport};
pub use session::{Document, ExamSession, IngestSummary};
pub use store::{ExamPaper, GradedAnswer, SessionState, SessionStore};
