use thiserror::Error;

pub type Result<T> = std::result::Result<T, DocChatError>;

#[derive(Error, Debug)]
pub enum DocChatError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl From<config::ConfigError> for DocChatError {
    #[inline]
    fn from(e: config::ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}

pub mod chat;
pub mod chunker;
pub mod commands;
pub mod config;
pub mod embeddings;
pub mod extractor;
pub mod ingest;
pub mod retrieval;
pub mod store;
