//! Ingest, generate, submit and reset through one exam session.

use examprep_context::{ChunkerConfig, HashEmbedder, VectorIndex};
use examprep_core::types::INVALID_EVALUATION_FEEDBACK;
use examprep_core::{Error, QuestionType};
use examprep_exam::{
    AnswerEvaluator, Document, ExamSession, GenerationStatus, QuestionGenerator,
};
use examprep_providers::MockProvider;
use std::collections::BTreeMap;
use std::sync::Arc;
use tempfile::TempDir;

const VALID_MCQ: &str = r#"[{"question": "What does photosynthesis convert light into?", "options": ["Chemical energy", "Heat", "Sound", "Water"]}]"#;

const TWO_OPEN_QUESTIONS: &str = r#"Here are your questions:
[{"question": "Where does the Calvin cycle take place?"}, {"question": "What does chlorophyll absorb?"}]"#;

const NOTES: &str = "Chlorophyll in the thylakoid membranes absorbs red and blue light.\n\n\
                     The Calvin cycle fixes carbon dioxide into sugars using ATP.";

fn session(temp: &TempDir, provider: &MockProvider) -> ExamSession<HashEmbedder> {
    let index = VectorIndex::new(temp.path().join("store"), HashEmbedder::default());
    let generator = QuestionGenerator::new(Arc::new(provider.clone()), 5);
    let evaluator = AnswerEvaluator::new(Arc::new(provider.clone()));
    ExamSession::new(index)
        .with_generator(generator)
        .with_evaluator(evaluator)
        .with_chunker(ChunkerConfig::new(80, 10).unwrap())
        .with_top_k(3)
}

#[tokio::test]
async fn test_photosynthesis_mcq() {
    let temp = TempDir::new().unwrap();
    let provider = MockProvider::new().then_reply(VALID_MCQ);
    let mut session = session(&temp, &provider);

    let summary = session
        .ingest(&[Document::new(
            "notes.txt",
            "Photosynthesis converts light into chemical energy.",
        )])
        .await
        .unwrap();
    assert_eq!(summary.documents, 1);
    assert!(summary.chunks >= 1);

    let result = session
        .generate("Photosynthesis", QuestionType::Mcq, 1)
        .await
        .unwrap();

    assert_eq!(result.status, GenerationStatus::Generated);
    assert_eq!(result.questions.len(), 1);
    assert_eq!(result.questions[0].options().map(|options| options.len()), Some(4));
    assert!(result.context.contains("Photosynthesis converts light"));
    assert_eq!(provider.call_count(), 1);
    assert_eq!(session.state().questions().len(), 1);
    assert_eq!(session.state().documents, vec!["notes.txt"]);
}

#[tokio::test]
async fn test_submit_grades_every_question() {
    let temp = TempDir::new().unwrap();
    let provider = MockProvider::new()
        .then_reply(TWO_OPEN_QUESTIONS)
        .then_reply(r#"{"marks": 8, "feedback": "Correct location."}"#)
        .then_reply("I would give this about five marks.");
    let mut session = session(&temp, &provider);

    session
        .ingest(&[Document::new("biology.md", NOTES)])
        .await
        .unwrap();
    let result = session
        .generate("Calvin cycle", QuestionType::ShortAnswer, 2)
        .await
        .unwrap();
    assert_eq!(result.questions.len(), 2);

    let mut answers = BTreeMap::new();
    answers.insert(1, "In the stroma".to_owned());
    answers.insert(2, "Red and blue light".to_owned());
    answers.insert(7, "Out of range".to_owned());

    let report = session.submit(&answers).await.unwrap();

    assert_eq!(provider.call_count(), 3);
    assert_eq!(report.rows.len(), 2);
    assert_eq!(report.rows[0].marks, Some(8));
    assert_eq!(report.rows[1].marks, Some(0));
    assert_eq!(report.rows[1].feedback, INVALID_EVALUATION_FEEDBACK);
    assert_eq!(report.total, 8);
    assert_eq!(report.maximum, 20);
    assert!(!session.state().answers.contains_key(&7));

    let grading_prompt = &provider.get_call_history()[1];
    assert!(grading_prompt.contains("Where does the Calvin cycle take place?"));
    assert!(grading_prompt.contains("In the stroma"));
}

#[tokio::test]
async fn test_failed_generation_keeps_previous_exam() {
    let temp = TempDir::new().unwrap();
    let provider = MockProvider::new()
        .then_reply(VALID_MCQ)
        .then_repeat("Sorry, I cannot help with that.", 5);
    let mut session = session(&temp, &provider);

    session
        .ingest(&[Document::new("notes.txt", NOTES)])
        .await
        .unwrap();
    session
        .generate("light", QuestionType::Mcq, 1)
        .await
        .unwrap();

    let result = session
        .generate("light", QuestionType::Mcq, 1)
        .await
        .unwrap();

    assert_eq!(result.status, GenerationStatus::Exhausted);
    assert_eq!(result.attempts, 5);
    assert_eq!(provider.call_count(), 6);
    assert_eq!(session.state().questions().len(), 1);
}

#[tokio::test]
async fn test_submit_without_exam_fails() {
    let temp = TempDir::new().unwrap();
    let provider = MockProvider::new();
    let mut session = session(&temp, &provider);

    let error = session.submit(&BTreeMap::new()).await.unwrap_err();
    assert!(matches!(error, Error::Other(_)));
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn test_generate_after_reset_needs_reingest() {
    let temp = TempDir::new().unwrap();
    let provider = MockProvider::new().with_default_response(VALID_MCQ);
    let mut session = session(&temp, &provider);

    session
        .ingest(&[Document::new("notes.txt", NOTES)])
        .await
        .unwrap();
    let report = session.reset();
    assert!(report.is_clean());
    assert!(session.state().documents.is_empty());

    let error = session
        .generate("light", QuestionType::Mcq, 1)
        .await
        .unwrap_err();
    assert!(matches!(error, Error::IndexNotFound(_)));
    assert!(error.requires_reingest());
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn test_blank_documents_are_rejected() {
    let temp = TempDir::new().unwrap();
    let provider = MockProvider::new().with_default_response(VALID_MCQ);
    let mut session = session(&temp, &provider);

    session
        .ingest(&[Document::new("notes.txt", NOTES)])
        .await
        .unwrap();

    let error = session
        .ingest(&[Document::new("scan.txt", "  \n\t ")])
        .await
        .unwrap_err();
    assert!(matches!(error, Error::ExtractionUnavailable(_)));

    let result = session
        .generate("Calvin", QuestionType::Mcq, 1)
        .await
        .unwrap();
    assert_eq!(result.status, GenerationStatus::Generated);
}

#[tokio::test]
async fn test_zero_questions_is_rejected() {
    let temp = TempDir::new().unwrap();
    let provider = MockProvider::new();
    let mut session = session(&temp, &provider);

    let error = session
        .generate("light", QuestionType::Mcq, 0)
        .await
        .unwrap_err();
    assert!(matches!(error, Error::Config(_)));
}

#[tokio::test]
async fn test_reingest_replaces_previous_generation() {
    let temp = TempDir::new().unwrap();
    let provider = MockProvider::new().with_default_response(VALID_MCQ);
    let mut session = session(&temp, &provider);

    session
        .ingest(&[Document::new("old.txt", "Mitosis splits one cell into two identical cells.")])
        .await
        .unwrap();
    let summary = session
        .ingest(&[Document::new("new.txt", NOTES)])
        .await
        .unwrap();
    assert!(summary.teardown.removed >= 1);

    let result = session
        .generate("Mitosis", QuestionType::Mcq, 1)
        .await
        .unwrap();
    assert!(!result.context.contains("Mitosis"));
    assert_eq!(session.state().documents, vec!["new.txt"]);
}

#[tokio::test]
async fn test_ingest_needs_no_models() {
    let temp = TempDir::new().unwrap();
    let index = VectorIndex::new(temp.path().join("store"), HashEmbedder::default());
    let mut session = ExamSession::new(index).with_chunker(ChunkerConfig::new(80, 10).unwrap());

    let summary = session
        .ingest(&[Document::new("notes.txt", NOTES)])
        .await
        .unwrap();
    assert!(summary.chunks >= 1);
    assert_eq!(session.state().documents, vec!["notes.txt"]);

    let error = session
        .generate("Calvin", QuestionType::Mcq, 1)
        .await
        .unwrap_err();
    assert!(matches!(error, Error::Config(_)));
}
