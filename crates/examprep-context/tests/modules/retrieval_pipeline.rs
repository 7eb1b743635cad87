//! Chunk, index and retrieve study material end to end.

use examprep_context::{
    ChunkerConfig, HashEmbedder, VectorIndex, chunk_text, join_context, retrieve,
};
use tempfile::TempDir;

const NOTES: &str = "Photosynthesis converts light into chemical energy.\n\n\
                     Chlorophyll in the thylakoid membranes absorbs red and blue light.\n\n\
                     The Calvin cycle fixes carbon dioxide into sugars using ATP.\n\n\
                     Mitochondria release energy from glucose during cellular respiration.\n\n\
                     Osmosis moves water across a semipermeable membrane.";

fn small_chunks() -> ChunkerConfig {
    ChunkerConfig::new(80, 10).expect("valid chunker config")
}

#[tokio::test]
async fn test_retrieval_prefers_keyword_matches() {
    let temp = TempDir::new().unwrap();
    let index = VectorIndex::new(temp.path().join("store"), HashEmbedder::default());
    let chunks = chunk_text(NOTES, &small_chunks());
    let handle = index.build(&chunks).await.unwrap();

    let retrieved = retrieve(&index, &handle, "Osmosis", 5).await.unwrap();

    assert!(!retrieved.is_empty());
    assert!(
        retrieved
            .iter()
            .all(|chunk| chunk.text.to_lowercase().contains("osmosis"))
    );
}

#[tokio::test]
async fn test_retrieval_falls_back_without_keyword_match() {
    let temp = TempDir::new().unwrap();
    let index = VectorIndex::new(temp.path().join("store"), HashEmbedder::default());
    let chunks = chunk_text(NOTES, &small_chunks());
    let handle = index.build(&chunks).await.unwrap();

    let retrieved = retrieve(&index, &handle, "Genetics and heredity", 3).await.unwrap();

    assert_eq!(retrieved.len(), 3);
    assert!(!join_context(&retrieved).trim().is_empty());
}

#[tokio::test]
async fn test_rebuild_gives_same_ranking() {
    let chunks = chunk_text(NOTES, &small_chunks());
    let mut rankings = Vec::new();

    for _ in 0..2 {
        let temp = TempDir::new().unwrap();
        let index = VectorIndex::new(temp.path().join("store"), HashEmbedder::default());
        let handle = index.build(&chunks).await.unwrap();
        let ranked = index.query(&handle, "energy from light", 5).await.unwrap();
        rankings.push(ranked.into_iter().map(|chunk| chunk.order).collect::<Vec<_>>());
    }

    assert_eq!(rankings[0], rankings[1]);
    assert_eq!(rankings[0].len(), 5);
}

#[tokio::test]
async fn test_query_is_bounded_by_k() {
    let temp = TempDir::new().unwrap();
    let index = VectorIndex::new(temp.path().join("store"), HashEmbedder::default());
    let handle = index
        .build(&chunk_text(NOTES, &small_chunks()))
        .await
        .unwrap();

    assert_eq!(index.query(&handle, "light", 2).await.unwrap().len(), 2);
    assert!(index.query(&handle, "light", 0).await.unwrap().is_empty());
}
