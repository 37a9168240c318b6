#[cfg(test)]
mod tests;

use itertools::Itertools;
use std::sync::Arc;
use tracing::{debug, info};

use crate::Result;
use crate::embeddings::{Embedder, GenerationOptions, Generator, PromptMessage};
use crate::retrieval::{ScoredChunk, rank_chunks};
use crate::store::Storage;
use crate::store::models::{Message, MessageRole, NewMessage};

/// Conversation used when the caller does not name one.
pub const DEFAULT_CONVERSATION: &str = "default";

/// A generated reply along with the excerpts that grounded it.
#[derive(Debug, Clone)]
pub struct ChatReply {
    pub message: Message,
    pub chunks_used: Vec<ScoredChunk>,
}

pub struct ChatEngine<E: Embedder, G: Generator> {
    storage: Arc<dyn Storage>,
    embedder: Arc<E>,
    generator: Arc<G>,
    top_k: usize,
    options: GenerationOptions,
}

impl<E: Embedder, G: Generator> ChatEngine<E, G> {
    #[inline]
    pub fn new(
        storage: Arc<dyn Storage>,
        embedder: Arc<E>,
        generator: Arc<G>,
        top_k: usize,
        options: GenerationOptions,
    ) -> Self {
        Self {
            storage,
            embedder,
            generator,
            top_k,
            options,
        }
    }

    /// Answer one user turn. The user message is persisted before any
    /// fallible step, so a failed turn still appears in the transcript.
    #[inline]
    pub async fn respond(&self, conversation_id: &str, user_text: &str) -> Result<ChatReply> {
        self.storage
            .append_message(NewMessage {
                conversation_id: conversation_id.to_string(),
                role: MessageRole::User,
                content: user_text.to_string(),
            })
            .await?;

        let history = self.storage.conversation_messages(conversation_id).await?;

        let query_embedding = self.embedder.embed(user_text).await?;
        let candidates = self.storage.embedded_chunks().await?;
        let chunks_used = rank_chunks(&query_embedding, candidates, self.top_k);

        debug!(
            "Grounding reply on {} chunks for conversation {}",
            chunks_used.len(),
            conversation_id
        );

        let mut prompt = vec![PromptMessage::system(build_system_prompt(&chunks_used))];
        for message in &history {
            prompt.push(match message.role {
                MessageRole::User => PromptMessage::user(message.content.clone()),
                MessageRole::Assistant => PromptMessage::assistant(message.content.clone()),
            });
        }

        let reply_text = self.generator.generate(&prompt, self.options).await?;

        let message = self
            .storage
            .append_message(NewMessage {
                conversation_id: conversation_id.to_string(),
                role: MessageRole::Assistant,
                content: reply_text,
            })
            .await?;

        info!(
            "Replied in conversation {} using {} excerpts",
            conversation_id,
            chunks_used.len()
        );

        Ok(ChatReply {
            message,
            chunks_used,
        })
    }

    /// Delete the conversation transcript. Documents are untouched.
    #[inline]
    pub async fn reset(&self, conversation_id: &str) -> Result<u64> {
        let removed = self.storage.clear_conversation(conversation_id).await?;
        info!(
            "Cleared {} messages from conversation {}",
            removed, conversation_id
        );
        Ok(removed)
    }
}

fn build_system_prompt(chunks: &[ScoredChunk]) -> String {
    if chunks.is_empty() {
        return "You are a document assistant, but no documents have been added yet. \
                Tell the user to add documents before asking questions about them. \
                Do not answer from general knowledge."
            .to_string();
    }

    let excerpts = chunks
        .iter()
        .enumerate()
        .map(|(i, scored)| format!("[{}] {}", i + 1, scored.chunk.content))
        .join("\n\n");

    format!(
        "You are a document assistant. Answer using ONLY the numbered excerpts \
         below. If the excerpts do not contain the answer, say you don't know. \
         Do not use outside knowledge.\n\nExcerpts:\n\n{excerpts}"
    )
}
