
pub mod memory;
pub mod models;
pub mod queries;

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use tracing::{debug, info};

use models::{Chunk, Document, Message, NewChunk, NewDocument, NewMessage};
use queries::{ChunkQueries, DocumentQueries, MessageQueries};

pub use memory::MemoryStore;

pub type DbPool = Pool<Sqlite>;

/// Persistence capability used by the ingest pipeline and chat orchestrator.
/// Injected so both can be exercised against [`MemoryStore`] in tests.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn insert_document(&self, new_document: NewDocument) -> Result<Document>;
    async fn get_document(&self, id: &str) -> Result<Option<Document>>;
    async fn list_documents(&self) -> Result<Vec<Document>>;
    /// Delete a document and all of its chunks.
    async fn delete_document(&self, id: &str) -> Result<bool>;

    async fn insert_chunk(&self, new_chunk: NewChunk) -> Result<Chunk>;
    async fn chunks_for_document(&self, document_id: &str) -> Result<Vec<Chunk>>;
    async fn set_chunk_embedding(&self, chunk_id: &str, embedding: &[f32]) -> Result<bool>;
    /// Chunks with a computed embedding; chunks without one never rank.
    async fn embedded_chunks(&self) -> Result<Vec<Chunk>>;
    async fn count_chunks(&self) -> Result<u64>;
    async fn count_embedded_chunks(&self) -> Result<u64>;

    async fn append_message(&self, new_message: NewMessage) -> Result<Message>;
    /// Conversation history in the order it occurred.
    async fn conversation_messages(&self, conversation_id: &str) -> Result<Vec<Message>>;
    async fn clear_conversation(&self, conversation_id: &str) -> Result<u64>;
    async fn count_messages(&self) -> Result<u64>;
}

#[derive(Debug, Clone)]
pub struct Database {
    pool: DbPool,
}

impl Database {
    #[inline]
    pub async fn new<P: AsRef<Path>>(database_path: P) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(database_path)
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect_with(options)
            .await
            .context("Failed to create database connection pool")?;

        let database = Self { pool };
        database.run_migrations().await?;

        Ok(database)
    }

    #[inline]
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    #[inline]
    pub async fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations");

        sqlx::migrate!("src/store/migrations")
            .run(&self.pool)
            .await
            .context("Failed to run schema migration")?;

        debug!("Database migrations completed successfully");
        Ok(())
    }

    #[inline]
    pub async fn initialize_from_config_dir(config_dir: &Path) -> Result<Self> {
        let db_path = config_dir.join("docchat.db");

        std::fs::create_dir_all(config_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                config_dir.display()
            )
        })?;

        Self::new(db_path).await
    }
}

#[async_trait]
impl Storage for Database {
    async fn insert_document(&self, new_document: NewDocument) -> Result<Document> {
        DocumentQueries::create(&self.pool, new_document).await
    }

    async fn get_document(&self, id: &str) -> Result<Option<Document>> {
        DocumentQueries::get_by_id(&self.pool, id).await
    }

    async fn list_documents(&self) -> Result<Vec<Document>> {
        DocumentQueries::list_all(&self.pool).await
    }

    async fn delete_document(&self, id: &str) -> Result<bool> {
        DocumentQueries::delete(&self.pool, id).await
    }

    async fn insert_chunk(&self, new_chunk: NewChunk) -> Result<Chunk> {
        ChunkQueries::create(&self.pool, new_chunk).await
    }

    async fn chunks_for_document(&self, document_id: &str) -> Result<Vec<Chunk>> {
        ChunkQueries::list_by_document(&self.pool, document_id).await
    }

    async fn set_chunk_embedding(&self, chunk_id: &str, embedding: &[f32]) -> Result<bool> {
        ChunkQueries::set_embedding(&self.pool, chunk_id, embedding).await
    }

    async fn embedded_chunks(&self) -> Result<Vec<Chunk>> {
        ChunkQueries::list_embedded(&self.pool).await
    }

    async fn count_chunks(&self) -> Result<u64> {
        ChunkQueries::count_all(&self.pool).await
    }

    async fn count_embedded_chunks(&self) -> Result<u64> {
        ChunkQueries::count_embedded(&self.pool).await
    }

    async fn append_message(&self, new_message: NewMessage) -> Result<Message> {
        MessageQueries::create(&self.pool, new_message).await
    }

    async fn conversation_messages(&self, conversation_id: &str) -> Result<Vec<Message>> {
        MessageQueries::list_conversation(&self.pool, conversation_id).await
    }

    async fn clear_conversation(&self, conversation_id: &str) -> Result<u64> {
        MessageQueries::delete_conversation(&self.pool, conversation_id).await
    }

    async fn count_messages(&self) -> Result<u64> {
        MessageQueries::count_all(&self.pool).await
    }
}
