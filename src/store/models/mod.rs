
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Document {
    pub id: String,
    pub name: String,
    pub doc_type: DocumentType,
    pub size_bytes: i64,
    pub created_date: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
pub enum DocumentType {
    Pdf,
    Docx,
    Txt,
    Md,
}

impl std::fmt::Display for DocumentType {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            DocumentType::Pdf => write!(f, "pdf"),
            DocumentType::Docx => write!(f, "docx"),
            DocumentType::Txt => write!(f, "txt"),
            DocumentType::Md => write!(f, "md"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDocument {
    pub name: String,
    pub doc_type: DocumentType,
    pub size_bytes: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub document_id: String,
    pub content: String,
    /// Absent until the embedding task for this chunk completes. Chunks
    /// without an embedding are invisible to similarity search.
    pub embedding: Option<Vec<f32>>,
    pub created_date: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewChunk {
    pub document_id: String,
    pub content: String,
}

/// Row shape for `chunks`; the embedding column holds little-endian f32 bytes.
#[derive(Debug, Clone, FromRow)]
pub(crate) struct ChunkRow {
    pub id: String,
    pub document_id: String,
    pub content: String,
    pub embedding: Option<Vec<u8>>,
    pub created_date: NaiveDateTime,
}

impl From<ChunkRow> for Chunk {
    #[inline]
    fn from(row: ChunkRow) -> Self {
        Self {
            id: row.id,
            document_id: row.document_id,
            content: row.content,
            embedding: row.embedding.as_deref().map(decode_embedding),
            created_date: row.created_date,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub role: MessageRole,
    pub content: String,
    pub created_date: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl std::fmt::Display for MessageRole {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMessage {
    pub conversation_id: String,
    pub role: MessageRole,
    pub content: String,
}

/// Encode an embedding vector as little-endian f32 bytes for BLOB storage.
#[inline]
pub fn encode_embedding(vector: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vector.len() * 4);
    for value in vector {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB of little-endian f32 bytes back into an embedding vector.
/// Trailing bytes that do not form a whole f32 are ignored.
#[inline]
pub fn decode_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}
