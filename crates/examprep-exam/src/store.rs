//! Session persistence.
//!
//! Saves the ingested document list, the current exam and the graded answers
//! as one JSON file, so separate CLI invocations share a session.

use chrono::{DateTime, Utc};
use examprep_core::{Error, Evaluation, Question, QuestionType, Result};
use serde::{Deserialize, Serialize};
use serde_json::{from_str, to_string_pretty};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A generated question set and where it came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamPaper {
    /// Topic the questions were generated for
    pub topic: String,
    /// Requested question type
    pub question_type: QuestionType,
    /// Context the questions were generated from
    pub context: String,
    /// Questions, numbered from 1 in this order
    pub questions: Vec<Question>,
    /// When the questions were generated
    pub generated_at: DateTime<Utc>,
}

/// An evaluation and the reference context it was graded against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradedAnswer {
    /// Score and feedback
    pub evaluation: Evaluation,
    /// Context retrieved for the question when grading
    pub reference_context: String,
}

/// Everything a session remembers between invocations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionState {
    /// Names of the documents in the current index generation
    pub documents: Vec<String>,
    /// When the current index generation was built
    pub ingested_at: Option<DateTime<Utc>>,
    /// Current exam, if one was generated
    pub exam: Option<ExamPaper>,
    /// Submitted answers keyed by question number
    pub answers: BTreeMap<usize, String>,
    /// Evaluations keyed by question number
    pub evaluations: BTreeMap<usize, GradedAnswer>,
}

impl SessionState {
    /// Questions of the current exam
    pub fn questions(&self) -> &[Question] {
        self.exam
            .as_ref()
            .map(|exam| exam.questions.as_slice())
            .unwrap_or_default()
    }

    /// Drop answers and evaluations, keeping the exam
    pub fn clear_answers(&mut self) {
        self.answers.clear();
        self.evaluations.clear();
    }
}

/// JSON file holding a [`SessionState`].
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    /// Create a store backed by `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the session file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the saved session, or an empty one if nothing was saved.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(&self) -> Result<SessionState> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(error) if error.kind() == ErrorKind::NotFound => {
                debug!("No saved session at {}", self.path.display());
                return Ok(SessionState::default());
            }
            Err(error) => return Err(error.into()),
        };

        from_str(&contents).map_err(|err| {
            Error::Persistence(format!(
                "Failed to parse session file {}: {err}",
                self.path.display()
            ))
        })
    }

    /// Save `state`, creating the parent directory if needed.
    ///
    /// # Errors
    /// Returns an error if the state cannot be serialized or written.
    pub fn save(&self, state: &SessionState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let json = to_string_pretty(state)
            .map_err(|err| Error::Persistence(format!("Failed to serialize session: {err}")))?;
        fs::write(&self.path, json)?;
        Ok(())
    }

    /// Delete the session file if present.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be removed.
    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
            Err(error) => Err(error.into()),
        }
    }
}
