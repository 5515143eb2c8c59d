use clap::{Parser, Subcommand};
use docs_qa::commands::{ask_once, rebuild_index, run_chat, show_status};
use docs_qa::config::{Config, run_interactive_config, show_config};

#[derive(Parser)]
#[command(name = "docs-qa")]
#[command(about = "Retrieval-augmented question answering over local text and PDF documents")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the interactive question/answer loop
    Chat,
    /// Answer a single question and exit
    Ask {
        /// The question to answer
        question: String,
    },
    /// Rebuild the vector index from the documents directory
    Index,
    /// Configure the Ollama connection and pipeline settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Show Ollama connectivity and index state
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Chat => {
            run_chat(Config::load()?).await?;
        }
        Commands::Ask { question } => {
            ask_once(Config::load()?, &question).await?;
        }
        Commands::Index => {
            rebuild_index(Config::load()?).await?;
        }
        Commands::Config { show } => {
            if show {
                show_config()?;
            } else {
                run_interactive_config()?;
            }
        }
        Commands::Status => {
            show_status(Config::load()?).await?;
        }
    }

    Ok(())
}
