use super::*;
use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::store::MemoryStore;

struct StubEmbedder {
    calls: Mutex<Vec<String>>,
}

impl StubEmbedder {
    fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Embedder for StubEmbedder {
    async fn embed(&self, text: &str) -> crate::Result<Vec<f32>> {
        self.calls
            .lock()
            .expect("calls lock poisoned")
            .push(text.to_string());
        Ok(vec![text.len() as f32, 1.0])
    }
}

/// Fails every even-numbered call.
struct FlakyEmbedder {
    counter: AtomicUsize,
}

#[async_trait]
impl Embedder for FlakyEmbedder {
    async fn embed(&self, _text: &str) -> crate::Result<Vec<f32>> {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        if n % 2 == 0 {
            Ok(vec![1.0, 0.0])
        } else {
            Err(crate::DocChatError::Embedding(
                "embedding backend unavailable".to_string(),
            ))
        }
    }
}

struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed(&self, _text: &str) -> crate::Result<Vec<f32>> {
        Err(crate::DocChatError::Embedding("always down".to_string()))
    }
}

fn ingestor<E: Embedder + 'static>(
    storage: Arc<MemoryStore>,
    embedder: E,
) -> DocumentIngestor<E> {
    DocumentIngestor::new(storage, Arc::new(embedder), ChunkingConfig::default())
}

#[tokio::test]
async fn ingest_persists_document_and_embedded_chunks() {
    let storage = Arc::new(MemoryStore::new());
    let ingestor = ingestor(Arc::clone(&storage), StubEmbedder::new());

    let text = "word ".repeat(500);
    let report = ingestor
        .ingest("notes.txt", text.as_bytes(), DocumentType::Txt)
        .await
        .expect("ingest succeeded");

    assert_eq!(report.document.name, "notes.txt");
    assert_eq!(report.document.size_bytes, text.len() as i64);
    assert!(report.chunks_created > 1);
    assert_eq!(report.chunks_embedded, report.chunks_created);
    assert_eq!(report.chunks_failed, 0);

    let chunks = storage
        .chunks_for_document(&report.document.id)
        .await
        .expect("chunks listed");
    assert_eq!(chunks.len(), report.chunks_created);
    assert!(chunks.iter().all(|c| c.embedding.is_some()));
}

#[tokio::test]
async fn extraction_failure_persists_nothing() {
    let storage = Arc::new(MemoryStore::new());
    let ingestor = ingestor(Arc::clone(&storage), StubEmbedder::new());

    let result = ingestor
        .ingest("bad.txt", &[0xff, 0xfe, 0x00], DocumentType::Txt)
        .await;
    assert!(result.is_err());

    let documents = storage.list_documents().await.expect("documents listed");
    assert!(documents.is_empty());
    assert_eq!(storage.count_chunks().await.expect("chunk count"), 0);
}

#[tokio::test]
async fn embedding_failures_leave_chunks_visible_without_vectors() {
    let storage = Arc::new(MemoryStore::new());
    let ingestor = ingestor(
        Arc::clone(&storage),
        FlakyEmbedder {
            counter: AtomicUsize::new(0),
        },
    );

    let text = "word ".repeat(2000);
    let report = ingestor
        .ingest("flaky.txt", text.as_bytes(), DocumentType::Txt)
        .await
        .expect("ingest succeeded despite embedding failures");

    assert!(report.chunks_failed > 0);
    assert_eq!(
        report.chunks_embedded + report.chunks_failed,
        report.chunks_created
    );

    let chunks = storage
        .chunks_for_document(&report.document.id)
        .await
        .expect("chunks listed");
    assert_eq!(chunks.len(), report.chunks_created);
    let unembedded = chunks.iter().filter(|c| c.embedding.is_none()).count();
    assert_eq!(unembedded, report.chunks_failed);
}

#[tokio::test]
async fn total_embedding_outage_still_ingests() {
    let storage = Arc::new(MemoryStore::new());
    let ingestor = ingestor(Arc::clone(&storage), FailingEmbedder);

    let report = ingestor
        .ingest("down.txt", b"some short document", DocumentType::Txt)
        .await
        .expect("ingest succeeded");

    assert_eq!(report.chunks_created, 1);
    assert_eq!(report.chunks_embedded, 0);
    assert_eq!(report.chunks_failed, 1);
    assert_eq!(
        storage
            .count_embedded_chunks()
            .await
            .expect("embedded count"),
        0
    );
}

#[tokio::test]
async fn whitespace_only_chunks_are_not_persisted() {
    let storage = Arc::new(MemoryStore::new());
    let ingestor = ingestor(Arc::clone(&storage), StubEmbedder::new());

    let report = ingestor
        .ingest("blank.txt", b"   \n\n   \n", DocumentType::Txt)
        .await
        .expect("ingest succeeded");

    assert_eq!(report.chunks_created, 0);
    assert_eq!(storage.count_chunks().await.expect("chunk count"), 0);
    // The document record itself still exists
    assert_eq!(
        storage.list_documents().await.expect("documents").len(),
        1
    );
}
