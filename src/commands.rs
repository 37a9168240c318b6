use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::chat::{ChatEngine, DEFAULT_CONVERSATION};
use crate::config::{Config, get_config_dir};
use crate::embeddings::{GenerationOptions, OllamaClient};
use crate::extractor::document_type_from_path;
use crate::ingest::DocumentIngestor;
use crate::store::models::Document;
use crate::store::{Database, Storage};

/// Add a document to the knowledge base
#[inline]
pub async fn add_document(file: &Path) -> Result<()> {
    info!("Adding document: {}", file.display());

    let doc_type = document_type_from_path(file)?;
    let name = file
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| anyhow::anyhow!("Path has no file name: {}", file.display()))?;

    let bytes = std::fs::read(file)
        .with_context(|| format!("Failed to read file: {}", file.display()))?;

    let (config, storage) = open_storage().await?;
    let client = Arc::new(OllamaClient::new(&config).context("Failed to create Ollama client")?);

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}").context("Invalid progress template")?,
    );
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner.set_message(format!("Ingesting {name}..."));

    let ingestor = DocumentIngestor::new(storage, client, config.chunking.clone());
    let report = ingestor.ingest(&name, &bytes, doc_type).await?;

    spinner.finish_and_clear();

    println!(
        "Added document: {} (ID: {})",
        report.document.name, report.document.id
    );
    println!("  Type: {}", report.document.doc_type);
    println!("  Size: {} bytes", report.document.size_bytes);
    println!("  Chunks: {}", report.chunks_created);
    if report.chunks_failed > 0 {
        println!(
            "  ⚠️  {} of {} chunks could not be embedded and will not be searchable",
            report.chunks_failed, report.chunks_created
        );
        println!("  Check that Ollama is running, then re-add the document.");
    } else {
        println!("  ✅ All chunks embedded");
    }

    Ok(())
}

/// List all documents in the knowledge base
#[inline]
pub async fn list_documents() -> Result<()> {
    let (_config, storage) = open_storage().await?;

    let documents = storage
        .list_documents()
        .await
        .context("Failed to list documents")?;

    if documents.is_empty() {
        println!("No documents have been added yet.");
        println!("Use 'docchat add <file>' to add one.");
        return Ok(());
    }

    println!("Documents ({} total):", documents.len());
    println!();

    for document in &documents {
        println!("📄 {} (ID: {})", document.name, document.id);
        println!("   Type: {}", document.doc_type);
        println!("   Size: {} bytes", document.size_bytes);

        match storage.chunks_for_document(&document.id).await {
            Ok(chunks) => {
                let embedded = chunks.iter().filter(|c| c.embedding.is_some()).count();
                println!("   Chunks: {} ({} embedded)", chunks.len(), embedded);
            }
            Err(e) => println!("   Chunks: Error - {e}"),
        }

        println!(
            "   Added: {}",
            document.created_date.format("%Y-%m-%d %H:%M:%S")
        );
        println!();
    }

    Ok(())
}

/// Delete a document and all its chunks
#[inline]
pub async fn delete_document(identifier: &str) -> Result<()> {
    let (_config, storage) = open_storage().await?;

    let document = resolve_document(storage.as_ref(), identifier)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Document not found: {}", identifier))?;

    let deleted = storage
        .delete_document(&document.id)
        .await
        .context("Failed to delete document")?;

    if deleted {
        println!("Deleted document: {} (ID: {})", document.name, document.id);
        println!("✓ All chunks and embeddings removed");
    } else {
        println!("Document was already gone: {}", document.name);
    }

    Ok(())
}

/// Chat about the documents, one-shot or interactively
#[inline]
pub async fn chat(message: Option<String>) -> Result<()> {
    let (config, storage) = open_storage().await?;
    let client = Arc::new(OllamaClient::new(&config).context("Failed to create Ollama client")?);

    let engine = ChatEngine::new(
        storage,
        Arc::clone(&client),
        client,
        config.retrieval.top_k,
        GenerationOptions {
            max_tokens: config.retrieval.max_reply_tokens,
            temperature: config.retrieval.temperature,
        },
    );

    if let Some(message) = message {
        respond_once(&engine, &message).await?;
        return Ok(());
    }

    println!("💬 DocChat interactive session. Type 'exit' or press Ctrl+D to quit.");
    println!();

    loop {
        let input: String = match dialoguer::Input::new().with_prompt("you").interact_text() {
            Ok(input) => input,
            Err(_) => break,
        };

        let trimmed = input.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed == "exit" || trimmed == "quit" {
            break;
        }

        if let Err(e) = respond_once(&engine, trimmed).await {
            println!("Error: {e}");
        }
    }

    println!("Goodbye!");
    Ok(())
}

/// Clear the conversation history
#[inline]
pub async fn reset_conversation() -> Result<()> {
    let (config, storage) = open_storage().await?;
    let client = Arc::new(OllamaClient::new(&config).context("Failed to create Ollama client")?);

    let engine = ChatEngine::new(
        storage,
        Arc::clone(&client),
        client,
        config.retrieval.top_k,
        GenerationOptions::default(),
    );

    let removed = engine.reset(DEFAULT_CONVERSATION).await?;
    println!("Conversation reset ({removed} messages removed).");

    Ok(())
}

/// Show the state of the knowledge base and its backing services
#[inline]
pub async fn show_status() -> Result<()> {
    let config_dir = get_config_dir()?;
    let config = Config::load(&config_dir).unwrap_or_else(|_| Config {
        ollama: crate::config::OllamaConfig::default(),
        chunking: crate::chunker::ChunkingConfig::default(),
        retrieval: crate::config::RetrievalConfig::default(),
        base_dir: config_dir.clone(),
    });

    println!("📊 DocChat Status");
    println!("{}", "=".repeat(50));
    println!();

    println!("🗄️  Database:");
    let storage = match Database::initialize_from_config_dir(&config_dir).await {
        Ok(db) => {
            println!("   ✅ SQLite: Connected");
            Some(db)
        }
        Err(e) => {
            println!("   ❌ SQLite: Failed to connect - {e}");
            None
        }
    };

    println!("🤖 Ollama:");
    match OllamaClient::new(&config) {
        Ok(client) => match client.ping() {
            Ok(()) => {
                println!(
                    "   ✅ Connected ({}:{})",
                    config.ollama.host, config.ollama.port
                );
                println!("   📋 Embedding model: {}", config.ollama.embedding_model);
                println!("   📋 Chat model: {}", config.ollama.chat_model);
                match client.validate_models() {
                    Ok(missing) if missing.is_empty() => {
                        println!("   ✅ Configured models are available");
                    }
                    Ok(missing) => {
                        for model in missing {
                            println!("   ⚠️  Model not available: {model}");
                        }
                        println!("   Pull missing models with 'ollama pull <model>'.");
                    }
                    Err(e) => {
                        println!("   ⚠️  Could not verify models - {e}");
                    }
                }
            }
            Err(e) => {
                println!("   ❌ Unreachable - {e}");
            }
        },
        Err(e) => {
            println!("   ❌ Invalid configuration - {e}");
        }
    }

    if let Some(storage) = storage {
        println!();
        println!("📚 Knowledge Base:");
        let documents = storage.list_documents().await.unwrap_or_default();
        let total_chunks = storage.count_chunks().await.unwrap_or(0);
        let embedded_chunks = storage.count_embedded_chunks().await.unwrap_or(0);
        let messages = storage.count_messages().await.unwrap_or(0);

        println!("   📄 Documents: {}", documents.len());
        println!("   🧩 Chunks: {total_chunks} ({embedded_chunks} embedded)");
        if total_chunks > embedded_chunks {
            println!(
                "   ⚠️  {} chunks have no embedding and will not be searchable",
                total_chunks - embedded_chunks
            );
        }
        println!("   💬 Conversation messages: {messages}");
    }

    println!();
    println!("💡 Next Steps:");
    println!("   • Use 'docchat add <file>' to add a document");
    println!("   • Use 'docchat chat' to ask questions about your documents");
    println!("   • Use 'docchat config' to update connection settings");

    Ok(())
}

async fn respond_once<E, G>(engine: &ChatEngine<E, G>, message: &str) -> Result<()>
where
    E: crate::embeddings::Embedder,
    G: crate::embeddings::Generator,
{
    let reply = engine.respond(DEFAULT_CONVERSATION, message).await?;

    println!();
    println!("{}", reply.message.content);
    println!();

    if reply.chunks_used.is_empty() {
        println!("(no document excerpts matched)");
    } else {
        println!("Sources:");
        for (i, scored) in reply.chunks_used.iter().enumerate() {
            let preview: String = scored.chunk.content.chars().take(60).collect();
            println!("  [{}] {:.3}  {}...", i + 1, scored.score, preview);
        }
    }
    println!();

    Ok(())
}

async fn open_storage() -> Result<(Config, Arc<dyn Storage>)> {
    let config_dir = get_config_dir()?;
    let config = Config::load(&config_dir).context("Failed to load configuration")?;
    let database = Database::initialize_from_config_dir(&config_dir)
        .await
        .context("Failed to initialize database")?;
    Ok((config, Arc::new(database)))
}

async fn resolve_document(storage: &dyn Storage, identifier: &str) -> Result<Option<Document>> {
    if let Some(document) = storage.get_document(identifier).await? {
        return Ok(Some(document));
    }

    let documents = storage.list_documents().await?;
    Ok(documents.into_iter().find(|d| {
        d.name.to_lowercase().contains(&identifier.to_lowercase())
    }))
}
