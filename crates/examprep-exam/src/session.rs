//! Exam session orchestration: ingest, generate, submit, report.
//!
//! A session owns one vector index and the state of the current exam. All
//! model and index calls are awaited one after another.

use chrono::Utc;
use examprep_context::{
    ChunkerConfig, IndexHandle, TeardownReport, VectorIndex, chunk_text, join_context, retrieve,
};
use examprep_core::{Error, QuestionType, Result, TextEmbedder};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::evaluator::AnswerEvaluator;
use crate::generator::{GeneratedQuestions, GenerationRequest, GenerationStatus, QuestionGenerator};
use crate::report::ScoreReport;
use crate::store::{ExamPaper, GradedAnswer, SessionState};

/// Default number of chunks retrieved per query
pub const DEFAULT_TOP_K: usize = 5;

/// Extracted text of one study document.
#[derive(Debug, Clone)]
pub struct Document {
    /// Display name, usually the file name
    pub name: String,
    /// Plain text content
    pub text: String,
}

impl Document {
    /// Create a document
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }
}

/// Outcome of [`ExamSession::ingest`].
#[derive(Debug, Clone)]
pub struct IngestSummary {
    /// Documents ingested
    pub documents: usize,
    /// Chunks indexed
    pub chunks: usize,
    /// Teardown of the previous index generation
    pub teardown: TeardownReport,
}

/// One user's exam workflow over one index.
pub struct ExamSession<E> {
    index: VectorIndex<E>,
    handle: Option<IndexHandle>,
    generator: Option<QuestionGenerator>,
    evaluator: Option<AnswerEvaluator>,
    chunker: ChunkerConfig,
    top_k: usize,
    state: SessionState,
}

impl<E: TextEmbedder> ExamSession<E> {
    /// Create a session with default chunking and retrieval settings.
    ///
    /// Such a session can ingest and report; generating needs
    /// [`with_generator`](Self::with_generator) and submitting needs
    /// [`with_evaluator`](Self::with_evaluator).
    pub fn new(index: VectorIndex<E>) -> Self {
        Self {
            index,
            handle: None,
            generator: None,
            evaluator: None,
            chunker: ChunkerConfig::default(),
            top_k: DEFAULT_TOP_K,
            state: SessionState::default(),
        }
    }

    /// Generate questions with `generator`.
    #[must_use]
    pub fn with_generator(mut self, generator: QuestionGenerator) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Grade answers with `evaluator`.
    #[must_use]
    pub fn with_evaluator(mut self, evaluator: AnswerEvaluator) -> Self {
        self.evaluator = Some(evaluator);
        self
    }

    /// Use `chunker` when ingesting documents.
    #[must_use]
    pub fn with_chunker(mut self, chunker: ChunkerConfig) -> Self {
        self.chunker = chunker;
        self
    }

    /// Retrieve `top_k` chunks per query.
    #[must_use]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Resume from previously saved state.
    #[must_use]
    pub fn with_state(mut self, state: SessionState) -> Self {
        self.state = state;
        self
    }

    /// Current session state
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// The session's vector index
    pub fn index(&self) -> &VectorIndex<E> {
        &self.index
    }

    /// Replace the current index generation with one built from `documents`.
    ///
    /// # Errors
    /// `ExtractionUnavailable` if the documents hold no text (the existing
    /// index is left untouched), or an error from building the index.
    pub async fn ingest(&mut self, documents: &[Document]) -> Result<IngestSummary> {
        let combined: String = documents
            .iter()
            .map(|document| format!("\n{}", document.text))
            .collect();
        if combined.trim().is_empty() {
            return Err(Error::ExtractionUnavailable(
                "the documents contain no text".to_owned(),
            ));
        }

        let teardown = self.reset();
        let chunks = chunk_text(&combined, &self.chunker);
        let handle = self.index.build(&chunks).await?;
        self.handle = Some(handle);

        self.state.documents = documents
            .iter()
            .map(|document| document.name.clone())
            .collect();
        self.state.ingested_at = Some(Utc::now());

        info!(
            "Ingested {} documents into {} chunks",
            documents.len(),
            chunks.len()
        );
        Ok(IngestSummary {
            documents: documents.len(),
            chunks: chunks.len(),
            teardown,
        })
    }

    /// Generate an exam on `topic`.
    ///
    /// On success the new questions replace the current exam and clear any
    /// answers; otherwise the current exam is kept.
    ///
    /// # Errors
    /// `Config` if `num_questions` is zero or no generator is configured;
    /// index errors if no index is available. Model failures are reported in the result, not as errors.
    pub async fn generate(
        &mut self,
        topic: &str,
        question_type: QuestionType,
        num_questions: usize,
    ) -> Result<GeneratedQuestions> {
        if num_questions == 0 {
            return Err(Error::Config(
                "number of questions must be at least 1".to_owned(),
            ));
        }

        configured(self.generator.as_ref(), "question generator")?;

        self.ensure_open().await?;
        let handle = open_handle(self.handle.as_ref())?;
        let generator = configured(self.generator.as_ref(), "question generator")?;
        let chunks = retrieve(&self.index, handle, topic, self.top_k).await?;
        debug!("Retrieved {} chunks for topic '{topic}'", chunks.len());

        let result = generator
            .generate(GenerationRequest {
                topic: topic.to_owned(),
                question_type,
                num_questions,
                context: join_context(&chunks),
            })
            .await;

        if result.status == GenerationStatus::Generated {
            self.state.exam = Some(ExamPaper {
                topic: result.topic.clone(),
                question_type: result.question_type,
                context: result.context.clone(),
                questions: result.questions.clone(),
                generated_at: Utc::now(),
            });
            self.state.clear_answers();
        }

        Ok(result)
    }

    /// Grade `answers` (keyed by 1-based question number) for the current exam.
    ///
    /// Every question is graded in order against context retrieved for it; a
    /// missing answer is graded as an empty string.
    ///
    /// # Errors
    /// Returns an error if no exam has been generated, no evaluator is
    /// configured or the index is unavailable.
    pub async fn submit(&mut self, answers: &BTreeMap<usize, String>) -> Result<ScoreReport> {
        let questions: Vec<String> = self
            .state
            .questions()
            .iter()
            .map(|question| question.text().to_owned())
            .collect();
        if questions.is_empty() {
            return Err(Error::Other("No exam has been generated yet".to_owned()));
        }

        for number in answers
            .keys()
            .filter(|number| **number == 0 || **number > questions.len())
        {
            warn!(
                "Ignoring answer for question {number}: the exam has {} questions",
                questions.len()
            );
        }

        configured(self.evaluator.as_ref(), "answer evaluator")?;

        self.ensure_open().await?;
        let handle = open_handle(self.handle.as_ref())?;
        let evaluator = configured(self.evaluator.as_ref(), "answer evaluator")?;
        self.state.clear_answers();

        for (index, question) in questions.iter().enumerate() {
            let number = index + 1;
            let answer = answers.get(&number).cloned().unwrap_or_default();
            let reference = retrieve(&self.index, handle, question, self.top_k).await?;
            let reference_context = join_context(&reference);

            let evaluation = evaluator
                .grade(question, &reference_context, &answer)
                .await;
            debug!("Question {number} scored {}", evaluation.marks);

            self.state.answers.insert(number, answer);
            self.state.evaluations.insert(
                number,
                GradedAnswer {
                    evaluation,
                    reference_context,
                },
            );
        }

        Ok(self.report())
    }

    /// Score report for the current exam
    pub fn report(&self) -> ScoreReport {
        ScoreReport::from_state(&self.state)
    }

    /// Close the index, tear it down and forget the session state.
    pub fn reset(&mut self) -> TeardownReport {
        if let Some(mut handle) = self.handle.take() {
            handle.close();
        }
        let report = self.index.teardown();
        self.state = SessionState::default();
        report
    }

    async fn ensure_open(&mut self) -> Result<()> {
        if self.handle.is_none() {
            self.handle = Some(self.index.open().await?);
        }
        Ok(())
    }
}

fn open_handle(handle: Option<&IndexHandle>) -> Result<&IndexHandle> {
    handle.ok_or_else(|| Error::IndexUnavailable("no open index handle".to_owned()))
}

fn configured<'model, T>(model: Option<&'model T>, role: &str) -> Result<&'model T> {
    model.ok_or_else(|| Error::Config(format!("no {role} configured for this session")))
}
