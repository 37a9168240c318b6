//! In-memory [`Storage`] implementation. Keeps the same semantics as the
//! SQLite store (cascading document delete, chronological message order) so
//! the ingest pipeline and chat orchestrator can be tested without a real
//! database.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::Storage;
use super::models::{Chunk, Document, Message, NewChunk, NewDocument, NewMessage};

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    documents: Vec<Document>,
    chunks: Vec<Chunk>,
    messages: Vec<Message>,
}

impl MemoryStore {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStore {
    async fn insert_document(&self, new_document: NewDocument) -> Result<Document> {
        let document = Document {
            id: Uuid::new_v4().to_string(),
            name: new_document.name,
            doc_type: new_document.doc_type,
            size_bytes: new_document.size_bytes,
            created_date: Utc::now().naive_utc(),
        };

        self.inner.lock().await.documents.push(document.clone());
        Ok(document)
    }

    async fn get_document(&self, id: &str) -> Result<Option<Document>> {
        let inner = self.inner.lock().await;
        Ok(inner.documents.iter().find(|d| d.id == id).cloned())
    }

    async fn list_documents(&self) -> Result<Vec<Document>> {
        Ok(self.inner.lock().await.documents.clone())
    }

    async fn delete_document(&self, id: &str) -> Result<bool> {
        let mut inner = self.inner.lock().await;
        let before = inner.documents.len();
        inner.documents.retain(|d| d.id != id);
        let removed = inner.documents.len() < before;
        if removed {
            inner.chunks.retain(|c| c.document_id != id);
        }
        Ok(removed)
    }

    async fn insert_chunk(&self, new_chunk: NewChunk) -> Result<Chunk> {
        let chunk = Chunk {
            id: Uuid::new_v4().to_string(),
            document_id: new_chunk.document_id,
            content: new_chunk.content,
            embedding: None,
            created_date: Utc::now().naive_utc(),
        };

        self.inner.lock().await.chunks.push(chunk.clone());
        Ok(chunk)
    }

    async fn chunks_for_document(&self, document_id: &str) -> Result<Vec<Chunk>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .chunks
            .iter()
            .filter(|c| c.document_id == document_id)
            .cloned()
            .collect())
    }

    async fn set_chunk_embedding(&self, chunk_id: &str, embedding: &[f32]) -> Result<bool> {
        let mut inner = self.inner.lock().await;
        match inner.chunks.iter_mut().find(|c| c.id == chunk_id) {
            Some(chunk) => {
                chunk.embedding = Some(embedding.to_vec());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn embedded_chunks(&self) -> Result<Vec<Chunk>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .chunks
            .iter()
            .filter(|c| c.embedding.is_some())
            .cloned()
            .collect())
    }

    async fn count_chunks(&self) -> Result<u64> {
        Ok(self.inner.lock().await.chunks.len() as u64)
    }

    async fn count_embedded_chunks(&self) -> Result<u64> {
        let inner = self.inner.lock().await;
        Ok(inner.chunks.iter().filter(|c| c.embedding.is_some()).count() as u64)
    }

    async fn append_message(&self, new_message: NewMessage) -> Result<Message> {
        let message = Message {
            id: Uuid::new_v4().to_string(),
            conversation_id: new_message.conversation_id,
            role: new_message.role,
            content: new_message.content,
            created_date: Utc::now().naive_utc(),
        };

        self.inner.lock().await.messages.push(message.clone());
        Ok(message)
    }

    async fn conversation_messages(&self, conversation_id: &str) -> Result<Vec<Message>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .cloned()
            .collect())
    }

    async fn clear_conversation(&self, conversation_id: &str) -> Result<u64> {
        let mut inner = self.inner.lock().await;
        let before = inner.messages.len();
        inner.messages.retain(|m| m.conversation_id != conversation_id);
        Ok((before - inner.messages.len()) as u64)
    }

    async fn count_messages(&self) -> Result<u64> {
        Ok(self.inner.lock().await.messages.len() as u64)
    }
}
