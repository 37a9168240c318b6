use super::*;
use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::store::MemoryStore;
use crate::store::models::{DocumentType, NewChunk, NewDocument};

struct StubEmbedder {
    vector: Vec<f32>,
    calls: AtomicUsize,
}

impl StubEmbedder {
    fn new(vector: Vec<f32>) -> Self {
        Self {
            vector,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Embedder for StubEmbedder {
    async fn embed(&self, _text: &str) -> crate::Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.vector.clone())
    }
}

struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed(&self, _text: &str) -> crate::Result<Vec<f32>> {
        Err(crate::DocChatError::Embedding(
            "embedding backend unavailable".to_string(),
        ))
    }
}

struct StubGenerator {
    reply: String,
    prompts: Mutex<Vec<Vec<PromptMessage>>>,
}

impl StubGenerator {
    fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn last_prompt(&self) -> Vec<PromptMessage> {
        self.prompts
            .lock()
            .expect("prompts lock poisoned")
            .last()
            .cloned()
            .expect("generator was called")
    }
}

#[async_trait]
impl Generator for StubGenerator {
    async fn generate(
        &self,
        messages: &[PromptMessage],
        _options: GenerationOptions,
    ) -> crate::Result<String> {
        self.prompts
            .lock()
            .expect("prompts lock poisoned")
            .push(messages.to_vec());
        Ok(self.reply.clone())
    }
}

struct FailingGenerator;

#[async_trait]
impl Generator for FailingGenerator {
    async fn generate(
        &self,
        _messages: &[PromptMessage],
        _options: GenerationOptions,
    ) -> crate::Result<String> {
        Err(crate::DocChatError::Generation(
            "model unavailable".to_string(),
        ))
    }
}

async fn seed_chunk(storage: &MemoryStore, content: &str, embedding: &[f32]) {
    let document = storage
        .insert_document(NewDocument {
            name: "seed.txt".to_string(),
            doc_type: DocumentType::Txt,
            size_bytes: content.len() as i64,
        })
        .await
        .expect("document inserted");
    let chunk = storage
        .insert_chunk(NewChunk {
            document_id: document.id,
            content: content.to_string(),
        })
        .await
        .expect("chunk inserted");
    storage
        .set_chunk_embedding(&chunk.id, embedding)
        .await
        .expect("embedding set");
}

fn engine<G: Generator>(
    storage: Arc<MemoryStore>,
    generator: Arc<G>,
) -> ChatEngine<StubEmbedder, G> {
    engine_with_embedder(
        storage,
        Arc::new(StubEmbedder::new(vec![1.0, 0.0])),
        generator,
    )
}

fn engine_with_embedder<E: Embedder, G: Generator>(
    storage: Arc<MemoryStore>,
    embedder: Arc<E>,
    generator: Arc<G>,
) -> ChatEngine<E, G> {
    ChatEngine::new(storage, embedder, generator, 2, GenerationOptions::default())
}

#[tokio::test]
async fn reply_is_grounded_on_best_matching_chunks() {
    let storage = Arc::new(MemoryStore::new());
    seed_chunk(&storage, "rust is a systems language", &[1.0, 0.0]).await;
    seed_chunk(&storage, "bread needs yeast", &[0.0, 1.0]).await;
    seed_chunk(&storage, "rust has ownership", &[0.9, 0.1]).await;

    let generator = Arc::new(StubGenerator::new("It is a systems language."));
    let engine = engine(Arc::clone(&storage), Arc::clone(&generator));

    let reply = engine
        .respond(DEFAULT_CONVERSATION, "what is rust?")
        .await
        .expect("respond succeeded");

    assert_eq!(reply.message.content, "It is a systems language.");
    assert_eq!(reply.chunks_used.len(), 2);
    assert_eq!(reply.chunks_used[0].chunk.content, "rust is a systems language");

    let prompt = generator.last_prompt();
    assert_eq!(prompt[0].role, "system");
    assert!(prompt[0].content.contains("[1] rust is a systems language"));
    assert!(prompt[0].content.contains("[2] rust has ownership"));
    assert!(!prompt[0].content.contains("bread"));

    // Both turns are now in the transcript
    let history = storage
        .conversation_messages(DEFAULT_CONVERSATION)
        .await
        .expect("history listed");
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].role, MessageRole::User);
    assert_eq!(history[1].role, MessageRole::Assistant);
}

#[tokio::test]
async fn empty_corpus_uses_no_documents_prompt() {
    let storage = Arc::new(MemoryStore::new());
    let embedder = Arc::new(StubEmbedder::new(vec![1.0, 0.0]));
    let generator = Arc::new(StubGenerator::new("Please add documents first."));
    let engine = engine_with_embedder(
        Arc::clone(&storage),
        Arc::clone(&embedder),
        Arc::clone(&generator),
    );

    let reply = engine
        .respond(DEFAULT_CONVERSATION, "hello?")
        .await
        .expect("respond succeeded");

    assert!(reply.chunks_used.is_empty());
    let prompt = generator.last_prompt();
    assert!(prompt[0].content.contains("no documents have been added"));
    // The query is embedded even when nothing can be retrieved
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn embedder_failure_leaves_orphaned_user_message() {
    let storage = Arc::new(MemoryStore::new());
    seed_chunk(&storage, "rust is a systems language", &[1.0, 0.0]).await;

    let engine = engine_with_embedder(
        Arc::clone(&storage),
        Arc::new(FailingEmbedder),
        Arc::new(StubGenerator::new("unreached")),
    );

    let result = engine.respond(DEFAULT_CONVERSATION, "what is rust?").await;
    assert!(matches!(result, Err(crate::DocChatError::Embedding(_))));

    let history = storage
        .conversation_messages(DEFAULT_CONVERSATION)
        .await
        .expect("history listed");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].role, MessageRole::User);
    assert_eq!(history[0].content, "what is rust?");
}

#[tokio::test]
async fn generator_failure_leaves_orphaned_user_message() {
    let storage = Arc::new(MemoryStore::new());
    let engine = engine(Arc::clone(&storage), Arc::new(FailingGenerator));

    let result = engine.respond(DEFAULT_CONVERSATION, "anyone there?").await;
    assert!(matches!(result, Err(crate::DocChatError::Generation(_))));

    let history = storage
        .conversation_messages(DEFAULT_CONVERSATION)
        .await
        .expect("history listed");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].role, MessageRole::User);
    assert_eq!(history[0].content, "anyone there?");
}

#[tokio::test]
async fn history_is_replayed_to_the_generator_in_order() {
    let storage = Arc::new(MemoryStore::new());
    let generator = Arc::new(StubGenerator::new("reply"));
    let engine = engine(Arc::clone(&storage), Arc::clone(&generator));

    engine
        .respond("session-a", "first question")
        .await
        .expect("first turn");
    engine
        .respond("session-a", "second question")
        .await
        .expect("second turn");

    let prompt = generator.last_prompt();
    let roles: Vec<&str> = prompt.iter().map(|m| m.role.as_str()).collect();
    assert_eq!(roles, vec!["system", "user", "assistant", "user"]);
    assert_eq!(prompt[3].content, "second question");
}

#[tokio::test]
async fn conversations_are_isolated() {
    let storage = Arc::new(MemoryStore::new());
    let generator = Arc::new(StubGenerator::new("reply"));
    let engine = engine(Arc::clone(&storage), Arc::clone(&generator));

    engine.respond("alpha", "hi").await.expect("alpha turn");
    engine.respond("beta", "hello").await.expect("beta turn");

    let prompt = generator.last_prompt();
    // The beta conversation sees only its own turn
    assert_eq!(prompt.len(), 2);
    assert_eq!(prompt[1].content, "hello");
}

#[tokio::test]
async fn reset_clears_only_the_named_conversation() {
    let storage = Arc::new(MemoryStore::new());
    let generator = Arc::new(StubGenerator::new("reply"));
    let engine = engine(Arc::clone(&storage), Arc::clone(&generator));

    engine.respond("alpha", "hi").await.expect("alpha turn");
    engine.respond("beta", "hello").await.expect("beta turn");

    let removed = engine.reset("alpha").await.expect("reset succeeded");
    assert_eq!(removed, 2);

    assert!(storage
        .conversation_messages("alpha")
        .await
        .expect("alpha history")
        .is_empty());
    assert_eq!(
        storage
            .conversation_messages("beta")
            .await
            .expect("beta history")
            .len(),
        2
    );
}
