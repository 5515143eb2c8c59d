use anyhow::{Context, Result};
use chrono::Utc;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use uuid::Uuid;

use crate::chain::AnswerChain;
use crate::chunker::{Chunk, chunk_documents};
use crate::config::Config;
use crate::loader::load_documents;
use crate::ollama::OllamaClient;
use crate::repl;
use crate::store::{ChunkMetadata, EmbeddingRecord, IndexState, VectorStore};

/// Start the interactive question/answer loop, building the index first if
/// none exists yet
#[inline]
pub async fn run_chat(config: Config) -> Result<()> {
    eprintln!("{}", style("DOCUMENT KNOWLEDGE ASSISTANT").bold().cyan());
    eprintln!("{}", "-".repeat(40));

    let chain = prepare_chain(&config).await?;
    repl::run(&chain).await
}

/// Answer a single question and exit
#[inline]
pub async fn ask_once(config: Config, question: &str) -> Result<()> {
    let chain = prepare_chain(&config).await?;
    let answer = chain.ask(question).await?;
    println!("Answer: {}", answer);
    Ok(())
}

/// Rebuild the index from the docs directory, replacing any existing index
#[inline]
pub async fn rebuild_index(config: Config) -> Result<()> {
    let ollama = connect_ollama(&config)?;
    let store = build_index(&config, &ollama).await?;

    let entries = store.count_entries().await?;
    println!(
        "Index built: {} entries in {}",
        style(entries).green(),
        config.storage.index_dir.display()
    );
    Ok(())
}

/// Report Ollama connectivity and index state
#[inline]
pub async fn show_status(config: Config) -> Result<()> {
    println!("{}", style("docs-qa Status").bold().cyan());
    println!("{}", "=".repeat(40));

    println!("Ollama:");
    match OllamaClient::new(&config.ollama) {
        Ok(client) => match client.health_check() {
            Ok(()) => {
                println!(
                    "  ✅ Connected ({}:{})",
                    config.ollama.host, config.ollama.port
                );
                println!("  Embedding model: {}", config.ollama.embedding_model);
                println!("  Chat model: {}", config.ollama.chat_model);
            }
            Err(e) => println!("  ⚠️  Reachable but unhealthy: {}", e),
        },
        Err(e) => println!("  ❌ Failed to connect: {}", e),
    }

    println!();
    println!("Documents:");
    let docs_dir = &config.storage.docs_dir;
    if docs_dir.is_dir() {
        println!("  📄 Directory: {}", docs_dir.display());
    } else {
        println!("  ❌ Directory missing: {}", docs_dir.display());
    }

    println!();
    println!("Index:");
    let index_dir = &config.storage.index_dir;
    match IndexState::detect(index_dir) {
        IndexState::Fresh => {
            println!("  💤 Not built yet ({})", index_dir.display());
            println!("  Run 'docs-qa index' or start a chat to build it.");
        }
        IndexState::Existing => {
            match VectorStore::open(index_dir, &config.ollama.embedding_model).await {
                Ok(store) => {
                    let entries = store.count_entries().await?;
                    println!("  ✅ Built: {} entries ({})", entries, index_dir.display());
                }
                Err(e) => println!("  ❌ Present but unusable: {}", e),
            }
        }
    }

    Ok(())
}

/// Resolve the index state once, then load or build accordingly
async fn prepare_chain(config: &Config) -> Result<AnswerChain> {
    let ollama = connect_ollama(config)?;

    let store = match IndexState::detect(&config.storage.index_dir) {
        IndexState::Existing => {
            info!(
                "Loading existing index from {}",
                config.storage.index_dir.display()
            );
            VectorStore::open(
                &config.storage.index_dir,
                &config.ollama.embedding_model,
            )
            .await
            .context("Failed to load existing index")?
        }
        IndexState::Fresh => build_index(config, &ollama).await?,
    };

    Ok(AnswerChain::new(store, ollama, config.retrieval.top_k))
}

fn connect_ollama(config: &Config) -> Result<OllamaClient> {
    let client =
        OllamaClient::new(&config.ollama).context("Failed to create Ollama client")?;
    client
        .health_check()
        .context("Ollama is not ready; check the connection with 'docs-qa config'")?;
    Ok(client)
}

/// Load, chunk, embed, and persist the documents directory as a new index
async fn build_index(config: &Config, ollama: &OllamaClient) -> Result<VectorStore> {
    eprintln!(
        "Building index from {}...",
        config.storage.docs_dir.display()
    );

    let documents = load_documents(&config.storage.docs_dir)
        .context("Failed to load documents")?;
    let chunks = chunk_documents(&documents, &config.chunking);
    eprintln!("Original docs: {}, Chunks: {}", documents.len(), chunks.len());

    let records = embed_chunks(ollama, &chunks, config.ollama.batch_size)?;

    let store = VectorStore::build(
        &config.storage.index_dir,
        &config.ollama.embedding_model,
        records,
    )
    .await
    .context("Failed to build index")?;

    Ok(store)
}

/// Embed all chunks with console progress, one configured batch at a time
fn embed_chunks(
    ollama: &OllamaClient,
    chunks: &[Chunk],
    batch_size: u32,
) -> Result<Vec<EmbeddingRecord>> {
    let progress = ProgressBar::new(chunks.len() as u64);
    progress.set_style(
        ProgressStyle::with_template("{bar:40} {pos}/{len} chunks embedded")
            .context("Invalid progress bar template")?,
    );

    let mut records = Vec::with_capacity(chunks.len());

    for batch in chunks.chunks(batch_size as usize) {
        let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
        let embeddings = ollama
            .embed_batch(&texts)
            .context("Failed to embed chunks")?;

        for (chunk, vector) in batch.iter().zip(embeddings) {
            records.push(EmbeddingRecord {
                id: Uuid::new_v4().to_string(),
                vector,
                metadata: ChunkMetadata {
                    source: chunk.metadata.source.display().to_string(),
                    page: chunk.metadata.page,
                    chunk_index: chunk.chunk_index,
                    content: chunk.content.clone(),
                    created_at: Utc::now().to_rfc3339(),
                },
            });
        }

        progress.inc(batch.len() as u64);
    }

    progress.finish_and_clear();
    info!("Embedded {} chunks", records.len());
    Ok(records)
}
