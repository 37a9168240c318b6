#[cfg(test)]
mod tests;

use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::Result;
use crate::chunker::{ChunkingConfig, chunk_text};
use crate::embeddings::Embedder;
use crate::extractor::extract_text;
use crate::store::Storage;
use crate::store::models::{Document, DocumentType, NewChunk, NewDocument};

/// Outcome of ingesting one document. Chunks that failed to embed stay
/// visible in the store without a vector and are reported here.
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub document: Document,
    pub chunks_created: usize,
    pub chunks_embedded: usize,
    pub chunks_failed: usize,
}

pub struct DocumentIngestor<E: Embedder> {
    storage: Arc<dyn Storage>,
    embedder: Arc<E>,
    chunking: ChunkingConfig,
}

impl<E: Embedder + 'static> DocumentIngestor<E> {
    #[inline]
    pub fn new(storage: Arc<dyn Storage>, embedder: Arc<E>, chunking: ChunkingConfig) -> Self {
        Self {
            storage,
            embedder,
            chunking,
        }
    }

    /// Extract, chunk, persist, and embed a document. Extraction failures
    /// abort before anything is written; embedding failures do not.
    #[inline]
    pub async fn ingest(
        &self,
        name: &str,
        bytes: &[u8],
        doc_type: DocumentType,
    ) -> Result<IngestReport> {
        let text = extract_text(bytes, doc_type)?;

        debug!(
            "Extracted {} characters from {} ({} bytes)",
            text.len(),
            name,
            bytes.len()
        );

        let document = self
            .storage
            .insert_document(NewDocument {
                name: name.to_string(),
                doc_type,
                size_bytes: bytes.len() as i64,
            })
            .await?;

        let chunks: Vec<String> = chunk_text(&text, &self.chunking)
            .into_iter()
            .filter(|c| !c.trim().is_empty())
            .collect();

        info!(
            "Ingesting document {} as {} chunks",
            document.name,
            chunks.len()
        );

        let mut tasks = JoinSet::new();
        for content in chunks {
            let chunk = self
                .storage
                .insert_chunk(NewChunk {
                    document_id: document.id.clone(),
                    content,
                })
                .await?;

            let storage = Arc::clone(&self.storage);
            let embedder = Arc::clone(&self.embedder);
            tasks.spawn(async move {
                let embedding = embedder.embed(&chunk.content).await?;
                storage.set_chunk_embedding(&chunk.id, &embedding).await?;
                Ok::<_, crate::DocChatError>(())
            });
        }

        let chunks_created = tasks.len();
        let mut chunks_embedded = 0;
        let mut chunks_failed = 0;

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(())) => chunks_embedded += 1,
                Ok(Err(e)) => {
                    chunks_failed += 1;
                    warn!("Failed to embed chunk for {}: {}", document.name, e);
                }
                Err(e) => {
                    chunks_failed += 1;
                    warn!("Embedding task for {} panicked: {}", document.name, e);
                }
            }
        }

        if chunks_failed > 0 {
            warn!(
                "Document {} ingested with {} of {} chunks unembedded",
                document.name, chunks_failed, chunks_created
            );
        } else {
            info!(
                "Document {} fully embedded ({} chunks)",
                document.name, chunks_embedded
            );
        }

        Ok(IngestReport {
            document,
            chunks_created,
            chunks_embedded,
            chunks_failed,
        })
    }
}
