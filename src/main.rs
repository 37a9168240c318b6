use clap::{Parser, Subcommand};
use docchat::Result;
use docchat::commands::{
    add_document, chat, delete_document, list_documents, reset_conversation, show_status,
};
use docchat::config::{get_config_dir, run_interactive_config, show_config};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "docchat")]
#[command(about = "Chat with your documents using local models")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure Ollama connection and retrieval settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Add a document (.pdf, .docx, .txt, .md) to the knowledge base
    Add {
        /// Path to the document
        file: PathBuf,
    },
    /// List all documents in the knowledge base
    List,
    /// Delete a document and its indexed content
    Delete {
        /// Document ID or name to delete
        document: String,
    },
    /// Ask a question, or start an interactive session
    Chat {
        /// One-shot question; omit for an interactive session
        message: Option<String>,
    },
    /// Clear the conversation history
    Reset,
    /// Show the state of the knowledge base and backing services
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { show } => {
            let config_dir = get_config_dir()?;
            if show {
                show_config(&config_dir)?;
            } else {
                run_interactive_config(&config_dir)?;
            }
        }
        Commands::Add { file } => {
            add_document(&file).await?;
        }
        Commands::List => {
            list_documents().await?;
        }
        Commands::Delete { document } => {
            delete_document(&document).await?;
        }
        Commands::Chat { message } => {
            chat(message).await?;
        }
        Commands::Reset => {
            reset_conversation().await?;
        }
        Commands::Status => {
            show_status().await?;
        }
    }

    Ok(())
}
