
use crate::store::models::Chunk;

/// A chunk scored against a query vector.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// Cosine similarity between two vectors: `dot(a,b) / (||a|| * ||b||)`.
///
/// Returns 0.0 when either vector has zero magnitude or the dimensions
/// disagree, which sorts such pairs below any genuinely similar pair.
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0_f32;
    let mut norm_a = 0.0_f32;
    let mut norm_b = 0.0_f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Rank chunks by cosine similarity against a query vector and keep the top
/// `limit`. Chunks without an embedding are dropped up front; ties break on
/// ascending chunk id so the ordering is deterministic for a fixed corpus.
#[inline]
pub fn rank_chunks(query: &[f32], chunks: Vec<Chunk>, limit: usize) -> Vec<ScoredChunk> {
    let mut scored: Vec<ScoredChunk> = chunks
        .into_iter()
        .filter_map(|chunk| {
            let score = chunk
                .embedding
                .as_deref()
                .map(|embedding| cosine_similarity(query, embedding))?;
            Some(ScoredChunk { chunk, score })
        })
        .collect();

    scored.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.chunk.id.cmp(&b.chunk.id))
    });
    scored.truncate(limit);
    scored
}
