//! Session state survives a save and a fresh session.

use examprep_context::{ChunkerConfig, HashEmbedder, VectorIndex};
use examprep_core::QuestionType;
use examprep_exam::{
    AnswerEvaluator, Document, ExamSession, QuestionGenerator, ScoreReport, SessionStore,
};
use examprep_providers::MockProvider;
use std::collections::BTreeMap;
use std::sync::Arc;
use tempfile::TempDir;

const TRUE_FALSE: &str =
    r#"[{"question": "Osmosis moves water across a membrane.", "reason_required": true}]"#;

fn session(temp: &TempDir, provider: &MockProvider) -> ExamSession<HashEmbedder> {
    let index = VectorIndex::new(temp.path().join("store"), HashEmbedder::default());
    ExamSession::new(index)
        .with_generator(QuestionGenerator::new(Arc::new(provider.clone()), 5))
        .with_evaluator(AnswerEvaluator::new(Arc::new(provider.clone())))
        .with_chunker(ChunkerConfig::new(80, 10).unwrap())
}

#[tokio::test]
async fn test_resume_and_submit_in_new_session() {
    let temp = TempDir::new().unwrap();
    let store = SessionStore::new(temp.path().join("session.json"));
    let provider = MockProvider::new()
        .then_reply(TRUE_FALSE)
        .then_reply(r#"{"marks": 10, "feedback": "Right, with a valid reason."}"#);

    let mut first = session(&temp, &provider);
    first
        .ingest(&[Document::new(
            "cells.txt",
            "Osmosis moves water across a semipermeable membrane.",
        )])
        .await
        .unwrap();
    first
        .generate("Osmosis", QuestionType::TrueFalse, 1)
        .await
        .unwrap();
    store.save(first.state()).unwrap();
    drop(first);

    let mut second = session(&temp, &provider).with_state(store.load().unwrap());
    assert_eq!(second.state().questions().len(), 1);

    let mut answers = BTreeMap::new();
    answers.insert(1, "True, water follows the concentration gradient".to_owned());
    let report = second.submit(&answers).await.unwrap();
    store.save(second.state()).unwrap();

    assert_eq!(report.total, 10);
    let reloaded = ScoreReport::from_state(&store.load().unwrap());
    assert_eq!(reloaded.rows[0].marks, Some(10));
    assert!(reloaded.to_string().ends_with("Total: 10/10 (100.0%)"));
}
