//! Command handlers for CLI operations

use anyhow::{Context as _, Result};
use examprep_context::{ChunkerConfig, HashEmbedder, OllamaEmbedder, VectorIndex};
use examprep_core::{
    Error, ExamPrepConfig, Question, QuestionType, Result as ExamResult, TextEmbedder,
    TextGenerator,
};
use examprep_exam::{
    AnswerEvaluator, Document, ExamSession, GenerationStatus, IngestSummary, QuestionGenerator,
    ScoreReport, SessionState, SessionStore,
};
use examprep_providers::GroqProvider;
use serde_json::{from_str, to_string_pretty};
use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::cli::{Cli, Commands};

const INGEST_HINT: &str = "No usable study material; run `examprep ingest <files>` first";

/// Loaded configuration and the locations derived from it.
struct Workspace {
    config: ExamPrepConfig,
    state_dir: PathBuf,
    store: SessionStore,
}

impl Workspace {
    fn load() -> Result<Self> {
        let config = ExamPrepConfig::load_or_create().context("Failed to load configuration")?;
        let state_dir = ExamPrepConfig::state_dir()?;
        let store = SessionStore::new(config.session_path(&state_dir));
        Ok(Self {
            config,
            state_dir,
            store,
        })
    }

    fn index_root(&self) -> PathBuf {
        self.config.index_path(&self.state_dir)
    }

    fn ollama(&self) -> OllamaEmbedder {
        OllamaEmbedder::from_config(&self.config.embedding)
    }

    /// Session over the saved state, without any language model.
    fn session<E: TextEmbedder>(&self, embedder: E) -> Result<ExamSession<E>> {
        let config = &self.config;
        let session = ExamSession::new(VectorIndex::new(self.index_root(), embedder))
            .with_chunker(ChunkerConfig::from_config(&config.chunking)?)
            .with_top_k(config.retrieval.top_k)
            .with_state(self.store.load()?);
        Ok(session)
    }

    fn groq(&self) -> ExamResult<GroqProvider> {
        let api_key = self
            .config
            .groq_api_key()
            .ok_or_else(|| Error::MissingApiKey("GROQ_API_KEY".to_owned()))?;
        GroqProvider::with_api_key_direct(api_key)
    }

    fn question_generator(&self) -> ExamResult<QuestionGenerator> {
        let generation = &self.config.generation;
        let model: Arc<dyn TextGenerator> = Arc::new(
            self.groq()?
                .with_model(generation.model.clone())
                .with_temperature(generation.temperature),
        );
        Ok(QuestionGenerator::new(model, generation.max_retries))
    }

    fn answer_evaluator(&self) -> ExamResult<AnswerEvaluator> {
        let evaluation = &self.config.evaluation;
        let model: Arc<dyn TextGenerator> =
            Arc::new(self.groq()?.with_model(evaluation.model.clone()));
        Ok(AnswerEvaluator::new(model).with_max_attempts(evaluation.max_attempts))
    }
}

/// Run one CLI command.
///
/// # Errors
/// Returns an error if the command fails; model output problems are reported
/// on stdout instead.
pub async fn run(cli: Cli) -> Result<()> {
    let workspace = Workspace::load()?;

    match cli.command {
        Commands::Ingest { files } => {
            let documents = files
                .iter()
                .map(|path| read_document(path))
                .collect::<ExamResult<Vec<_>>>()?;
            if cli.offline {
                ingest(&workspace, HashEmbedder::default(), &documents).await
            } else {
                ingest(&workspace, workspace.ollama(), &documents).await
            }
        }
        Commands::Generate { topic, kind, count } => {
            let num_questions = count.unwrap_or(workspace.config.generation.default_questions);
            if cli.offline {
                generate(&workspace, HashEmbedder::default(), &topic, kind, num_questions).await
            } else {
                generate(&workspace, workspace.ollama(), &topic, kind, num_questions).await
            }
        }
        Commands::Submit { answers } => {
            let answers: BTreeMap<usize, String> = from_str(&answers).context(
                "--answers must be a JSON object mapping question numbers to answer text",
            )?;
            if cli.offline {
                submit(&workspace, HashEmbedder::default(), &answers).await
            } else {
                submit(&workspace, workspace.ollama(), &answers).await
            }
        }
        Commands::Show => show_exam(&workspace.store.load()?),
        Commands::Results { json } => show_results(&workspace.store.load()?, json),
        Commands::Reset => reset(&workspace),
        Commands::Config { path } => show_config(&workspace.config, path),
    }
}

async fn ingest<E: TextEmbedder>(
    workspace: &Workspace,
    embedder: E,
    documents: &[Document],
) -> Result<()> {
    let mut session = workspace.session(embedder)?;
    let summary = ingest_and_save(&mut session, &workspace.store, documents).await?;

    for failure in &summary.teardown.failures {
        warn!(
            "Could not remove {} from the previous index: {}",
            failure.path.display(),
            failure.message
        );
    }

    let mut stdout = io::stdout().lock();
    writeln!(
        stdout,
        "Ingested {} documents into {} chunks.",
        summary.documents, summary.chunks
    )?;
    Ok(())
}

/// Ingest `documents` and save the session whether or not it succeeded: a
/// failed build has already torn down the previous index.
async fn ingest_and_save<E: TextEmbedder>(
    session: &mut ExamSession<E>,
    store: &SessionStore,
    documents: &[Document],
) -> Result<IngestSummary> {
    let outcome = session.ingest(documents).await;
    store.save(session.state())?;
    outcome.map_err(Into::into)
}

async fn generate<E: TextEmbedder>(
    workspace: &Workspace,
    embedder: E,
    topic: &str,
    question_type: QuestionType,
    num_questions: usize,
) -> Result<()> {
    let mut session = workspace
        .session(embedder)?
        .with_generator(workspace.question_generator()?);
    let result = with_ingest_hint(session.generate(topic, question_type, num_questions).await)?;
    workspace.store.save(session.state())?;

    let mut stdout = io::stdout().lock();
    match result.status {
        GenerationStatus::Generated => {
            info!(
                "Generated {} questions in {} attempts",
                result.questions.len(),
                result.attempts
            );
            write_exam(&mut stdout, session.state())?;
        }
        GenerationStatus::NoRelevantContext => {
            writeln!(
                stdout,
                "No questions generated: nothing in the study material relates to '{topic}'."
            )?;
        }
        GenerationStatus::Exhausted => {
            writeln!(
                stdout,
                "No questions generated: the model gave no usable output in {} attempts.",
                result.attempts
            )?;
        }
    }
    Ok(())
}

async fn submit<E: TextEmbedder>(
    workspace: &Workspace,
    embedder: E,
    answers: &BTreeMap<usize, String>,
) -> Result<()> {
    let mut session = workspace
        .session(embedder)?
        .with_evaluator(workspace.answer_evaluator()?);
    let report = with_ingest_hint(session.submit(answers).await)?;
    workspace.store.save(session.state())?;

    writeln!(io::stdout().lock(), "{report}")?;
    Ok(())
}

fn show_exam(state: &SessionState) -> Result<()> {
    let mut stdout = io::stdout().lock();
    if !state.documents.is_empty() {
        writeln!(stdout, "Documents: {}", state.documents.join(", "))?;
    }
    write_exam(&mut stdout, state)?;
    Ok(())
}

fn show_results(state: &SessionState, json: bool) -> Result<()> {
    let report = ScoreReport::from_state(state);
    let mut stdout = io::stdout().lock();

    if json {
        writeln!(stdout, "{}", to_string_pretty(&report)?)?;
    } else if report.rows.is_empty() {
        writeln!(stdout, "No exam generated yet.")?;
    } else {
        writeln!(stdout, "{report}")?;
    }
    Ok(())
}

fn reset(workspace: &Workspace) -> Result<()> {
    // Teardown never embeds, so the embedder choice is irrelevant here
    let index = VectorIndex::new(workspace.index_root(), HashEmbedder::default());
    let report = index.teardown();
    workspace.store.clear()?;

    let mut stdout = io::stdout().lock();
    if report.is_clean() {
        writeln!(stdout, "Reset complete: removed {} index entries.", report.removed)?;
    } else {
        for failure in &report.failures {
            warn!("Could not remove {}: {}", failure.path.display(), failure.message);
        }
        writeln!(
            stdout,
            "Reset incomplete: {} entries could not be removed; ingest again to rebuild.",
            report.failures.len()
        )?;
    }
    Ok(())
}

fn show_config(config: &ExamPrepConfig, path_only: bool) -> Result<()> {
    let mut stdout = io::stdout().lock();
    if path_only {
        writeln!(stdout, "{}", ExamPrepConfig::config_path()?.display())?;
        return Ok(());
    }

    let mut shown = config.clone();
    if shown.api_keys.groq_api_key.is_some() {
        shown.api_keys.groq_api_key = Some("<redacted>".to_owned());
    }
    writeln!(stdout, "{}", toml::to_string_pretty(&shown)?)?;
    Ok(())
}

/// Read a plain-text study document.
fn read_document(path: &Path) -> ExamResult<Document> {
    let extension = path
        .extension()
        .and_then(OsStr::to_str)
        .map(str::to_ascii_lowercase);
    if !matches!(extension.as_deref(), Some("txt" | "md" | "markdown")) {
        return Err(Error::ExtractionUnavailable(format!(
            "cannot extract text from {}; convert it to .txt or .md first",
            path.display()
        )));
    }

    let text = fs::read_to_string(path)?;
    if text.trim().is_empty() {
        return Err(Error::ExtractionUnavailable(format!(
            "{} contains no text",
            path.display()
        )));
    }

    let name = path.file_name().map_or_else(
        || path.display().to_string(),
        |name| name.to_string_lossy().into_owned(),
    );
    Ok(Document::new(name, text))
}

fn with_ingest_hint<T>(result: ExamResult<T>) -> Result<T> {
    match result {
        Err(error) if error.requires_reingest() => Err(error).context(INGEST_HINT),
        other => other.map_err(Into::into),
    }
}

fn write_exam(out: &mut impl Write, state: &SessionState) -> io::Result<()> {
    let Some(exam) = &state.exam else {
        return writeln!(out, "No exam generated yet.");
    };

    writeln!(
        out,
        "{} questions on '{}' ({})",
        exam.questions.len(),
        exam.topic,
        exam.question_type
    )?;
    for (index, question) in exam.questions.iter().enumerate() {
        write_question(out, index + 1, question)?;
    }
    Ok(())
}

fn write_question(out: &mut impl Write, number: usize, question: &Question) -> io::Result<()> {
    match question {
        Question::Mcq { question, options } => {
            writeln!(out, "Q{number}. {question}")?;
            for option in options {
                writeln!(out, "    {option}")?;
            }
            Ok(())
        }
        Question::TrueFalse {
            question,
            reason_required,
        } => {
            let suffix = if *reason_required {
                " (True/False, give a reason)"
            } else {
                " (True/False)"
            };
            writeln!(out, "Q{number}. {question}{suffix}")
        }
        Question::OpenAnswer { question } => writeln!(out, "Q{number}. {question}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use examprep_core::Embedding;
    use tempfile::TempDir;

    /// Embedder whose server is never reachable
    struct UnreachableEmbedder;

    impl TextEmbedder for UnreachableEmbedder {
        fn model_name(&self) -> &str {
            "unreachable"
        }

        async fn ensure_model_available(&self) -> ExamResult<()> {
            Err(Error::Embedding("connection refused".to_owned()))
        }

        async fn embed(&self, _text: &str) -> ExamResult<Embedding> {
            Err(Error::Embedding("connection refused".to_owned()))
        }

        async fn embed_batch(&self, _texts: Vec<String>) -> ExamResult<Vec<Embedding>> {
            Err(Error::Embedding("connection refused".to_owned()))
        }
    }

    fn render(question: &Question) -> String {
        let mut buffer = Vec::new();
        write_question(&mut buffer, 3, question).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn test_read_text_document() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("Biology.MD");
        fs::write(&path, "# Cells\nCells divide by mitosis.").unwrap();

        let document = read_document(&path).unwrap();
        assert_eq!(document.name, "Biology.MD");
        assert!(document.text.contains("mitosis"));
    }

    #[test]
    fn test_unsupported_format_is_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("lecture.pdf");
        fs::write(&path, "%PDF-1.7").unwrap();

        let error = read_document(&path).unwrap_err();
        assert!(matches!(error, Error::ExtractionUnavailable(_)));
    }

    #[test]
    fn test_blank_document_is_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("empty.txt");
        fs::write(&path, "\n  \n").unwrap();

        let error = read_document(&path).unwrap_err();
        assert!(matches!(error, Error::ExtractionUnavailable(_)));
    }

    #[test]
    fn test_question_rendering() {
        let mcq = Question::Mcq {
            question: "Which organelle makes ATP?".to_owned(),
            options: [
                "A) Nucleus".to_owned(),
                "B) Mitochondrion".to_owned(),
                "C) Ribosome".to_owned(),
                "D) Vacuole".to_owned(),
            ],
        };
        let rendered = render(&mcq);
        assert!(rendered.starts_with("Q3. Which organelle makes ATP?\n"));
        assert_eq!(rendered.lines().count(), 5);

        let statement = Question::TrueFalse {
            question: "Ribosomes build proteins.".to_owned(),
            reason_required: true,
        };
        assert_eq!(
            render(&statement),
            "Q3. Ribosomes build proteins. (True/False, give a reason)\n"
        );
    }

    #[tokio::test]
    async fn test_failed_ingest_still_saves_reset_session() {
        let temp = TempDir::new().unwrap();
        let store = SessionStore::new(temp.path().join("session.json"));
        store
            .save(&SessionState {
                documents: vec!["old.txt".to_owned()],
                ..SessionState::default()
            })
            .unwrap();

        let index = VectorIndex::new(temp.path().join("store"), UnreachableEmbedder);
        let mut session = ExamSession::new(index).with_state(store.load().unwrap());
        let error = ingest_and_save(
            &mut session,
            &store,
            &[Document::new("new.txt", "Cells divide by mitosis.")],
        )
        .await
        .unwrap_err();

        assert!(error.to_string().contains("connection refused"));
        assert!(store.load().unwrap().documents.is_empty());
    }

    #[test]
    fn test_ingest_hint_only_for_index_errors() {
        let missing: ExamResult<()> = Err(Error::IndexNotFound(PathBuf::from("vector_store")));
        let message = format!("{:#}", with_ingest_hint(missing).unwrap_err());
        assert!(message.contains("examprep ingest"));

        let other: ExamResult<()> = Err(Error::Config("bad".to_owned()));
        let message = format!("{:#}", with_ingest_hint(other).unwrap_err());
        assert!(!message.contains("examprep ingest"));
    }
}
