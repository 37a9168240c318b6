
use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::models::{
    Chunk, ChunkRow, Document, Message, NewChunk, NewDocument, NewMessage, encode_embedding,
};

pub struct DocumentQueries;

impl DocumentQueries {
    #[inline]
    pub async fn create(pool: &SqlitePool, new_document: NewDocument) -> Result<Document> {
        let document = Document {
            id: Uuid::new_v4().to_string(),
            name: new_document.name,
            doc_type: new_document.doc_type,
            size_bytes: new_document.size_bytes,
            created_date: Utc::now().naive_utc(),
        };

        sqlx::query(
            "INSERT INTO documents (id, name, doc_type, size_bytes, created_date) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&document.id)
        .bind(&document.name)
        .bind(document.doc_type)
        .bind(document.size_bytes)
        .bind(document.created_date)
        .execute(pool)
        .await
        .context("Failed to create document")?;

        Ok(document)
    }

    #[inline]
    pub async fn get_by_id(pool: &SqlitePool, id: &str) -> Result<Option<Document>> {
        sqlx::query_as::<_, Document>(
            "SELECT id, name, doc_type, size_bytes, created_date FROM documents WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get document by id")
    }

    #[inline]
    pub async fn list_all(pool: &SqlitePool) -> Result<Vec<Document>> {
        sqlx::query_as::<_, Document>(
            "SELECT id, name, doc_type, size_bytes, created_date FROM documents \
             ORDER BY created_date DESC",
        )
        .fetch_all(pool)
        .await
        .context("Failed to list documents")
    }

    /// Delete a document; chunks cascade via the foreign key.
    #[inline]
    pub async fn delete(pool: &SqlitePool, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await
            .context("Failed to delete document")?;

        Ok(result.rows_affected() > 0)
    }
}

pub struct ChunkQueries;

impl ChunkQueries {
    #[inline]
    pub async fn create(pool: &SqlitePool, new_chunk: NewChunk) -> Result<Chunk> {
        let chunk = Chunk {
            id: Uuid::new_v4().to_string(),
            document_id: new_chunk.document_id,
            content: new_chunk.content,
            embedding: None,
            created_date: Utc::now().naive_utc(),
        };

        sqlx::query(
            "INSERT INTO chunks (id, document_id, content, embedding, created_date) \
             VALUES (?, ?, ?, NULL, ?)",
        )
        .bind(&chunk.id)
        .bind(&chunk.document_id)
        .bind(&chunk.content)
        .bind(chunk.created_date)
        .execute(pool)
        .await
        .context("Failed to create chunk")?;

        Ok(chunk)
    }

    #[inline]
    pub async fn list_by_document(pool: &SqlitePool, document_id: &str) -> Result<Vec<Chunk>> {
        let rows = sqlx::query_as::<_, ChunkRow>(
            "SELECT id, document_id, content, embedding, created_date FROM chunks \
             WHERE document_id = ? ORDER BY created_date, rowid",
        )
        .bind(document_id)
        .fetch_all(pool)
        .await
        .context("Failed to list chunks for document")?;

        Ok(rows.into_iter().map(Chunk::from).collect())
    }

    /// Every chunk whose embedding has been computed; the similarity ranker's
    /// candidate set.
    #[inline]
    pub async fn list_embedded(pool: &SqlitePool) -> Result<Vec<Chunk>> {
        let rows = sqlx::query_as::<_, ChunkRow>(
            "SELECT id, document_id, content, embedding, created_date FROM chunks \
             WHERE embedding IS NOT NULL ORDER BY created_date, rowid",
        )
        .fetch_all(pool)
        .await
        .context("Failed to list embedded chunks")?;

        Ok(rows.into_iter().map(Chunk::from).collect())
    }

    #[inline]
    pub async fn set_embedding(
        pool: &SqlitePool,
        chunk_id: &str,
        embedding: &[f32],
    ) -> Result<bool> {
        let bytes = encode_embedding(embedding);
        let result = sqlx::query("UPDATE chunks SET embedding = ? WHERE id = ?")
            .bind(bytes)
            .bind(chunk_id)
            .execute(pool)
            .await
            .context("Failed to set chunk embedding")?;

        Ok(result.rows_affected() > 0)
    }

    #[inline]
    pub async fn count_all(pool: &SqlitePool) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks")
            .fetch_one(pool)
            .await
            .context("Failed to count chunks")?;

        Ok(count.unsigned_abs())
    }

    #[inline]
    pub async fn count_embedded(pool: &SqlitePool) -> Result<u64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM chunks WHERE embedding IS NOT NULL")
                .fetch_one(pool)
                .await
                .context("Failed to count embedded chunks")?;

        Ok(count.unsigned_abs())
    }
}

pub struct MessageQueries;

impl MessageQueries {
    #[inline]
    pub async fn create(pool: &SqlitePool, new_message: NewMessage) -> Result<Message> {
        let message = Message {
            id: Uuid::new_v4().to_string(),
            conversation_id: new_message.conversation_id,
            role: new_message.role,
            content: new_message.content,
            created_date: Utc::now().naive_utc(),
        };

        sqlx::query(
            "INSERT INTO messages (id, conversation_id, role, content, created_date) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&message.id)
        .bind(&message.conversation_id)
        .bind(message.role)
        .bind(&message.content)
        .bind(message.created_date)
        .execute(pool)
        .await
        .context("Failed to create message")?;

        Ok(message)
    }

    /// Full conversation history in the order it occurred. Rowid breaks ties
    /// between messages created within the same timestamp tick.
    #[inline]
    pub async fn list_conversation(
        pool: &SqlitePool,
        conversation_id: &str,
    ) -> Result<Vec<Message>> {
        sqlx::query_as::<_, Message>(
            "SELECT id, conversation_id, role, content, created_date FROM messages \
             WHERE conversation_id = ? ORDER BY created_date, rowid",
        )
        .bind(conversation_id)
        .fetch_all(pool)
        .await
        .context("Failed to list conversation messages")
    }

    #[inline]
    pub async fn delete_conversation(pool: &SqlitePool, conversation_id: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM messages WHERE conversation_id = ?")
            .bind(conversation_id)
            .execute(pool)
            .await
            .context("Failed to clear conversation")?;

        Ok(result.rows_affected())
    }

    #[inline]
    pub async fn count_all(pool: &SqlitePool) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM messages")
            .fetch_one(pool)
            .await
            .context("Failed to count messages")?;

        Ok(count.unsigned_abs())
    }
}
