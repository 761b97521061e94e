mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use folio_ingest::{ChunkerConfig, IngestionPipeline};
use folio_llm::openai::OpenAiProvider;
use folio_query::{
    ChatConfig, CitedChat, Conversation, GapAnalysis, GapAnalysisConfig, GapReport, Retriever,
    RetrieverConfig,
};
use folio_store::{QdrantStore, VectorStore};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

use crate::config::Config;

#[derive(Parser)]
#[command(name = "folio", about = "Literature-review assistant over a paper collection")]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, default_value = "folio.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest every supported paper file in a directory.
    Ingest { dir: PathBuf },
    /// Analyze the collection for research gaps on a topic.
    Gaps { topic: String },
    /// Interactive question answering with citations.
    Chat,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;
    tracing::debug!(config = %cli.config.display(), "configuration loaded");

    let provider = OpenAiProvider::new(
        config.llm.api_key.clone(),
        config.llm.base_url.clone(),
        config.llm.model.clone(),
        Some(config.llm.embedding_model.clone()),
        config.llm.max_tokens,
        config.llm.temperature,
    );
    let store: Arc<dyn VectorStore> = Arc::new(
        QdrantStore::new(&config.store.qdrant_url)
            .map_err(|e| anyhow::anyhow!(e))
            .context("failed to connect to Qdrant")?,
    );

    match cli.command {
        Command::Ingest { dir } => run_ingest(provider, store, &config, &dir).await,
        Command::Gaps { topic } => {
            let cancel = cancel_on_ctrl_c();
            run_gaps(provider, store, &config, &topic, &cancel).await
        }
        Command::Chat => {
            let cancel = cancel_on_ctrl_c();
            run_chat(provider, store, &config, &cancel).await
        }
    }
}

fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }
    cancel
}

async fn run_ingest(
    provider: OpenAiProvider,
    store: Arc<dyn VectorStore>,
    config: &Config,
    dir: &std::path::Path,
) -> anyhow::Result<()> {
    let pipeline = IngestionPipeline::new(provider, store, config.store.collection.clone())
        .with_chunker(ChunkerConfig {
            target_size_words: config.ingest.target_size_words,
            overlap_words: config.ingest.overlap_words,
        });

    let batch = pipeline.ingest_dir(dir).await?;
    for report in &batch.reports {
        println!(
            "ingested {} ({} chunks, {} failed)",
            report.document_id,
            report.succeeded,
            report.failed.len()
        );
    }
    for file in &batch.failed_files {
        println!("skipped {}: {}", file.filename, file.reason);
    }
    println!(
        "done: {} documents, {} files skipped",
        batch.reports.len(),
        batch.failed_files.len()
    );
    Ok(())
}

fn retriever(
    provider: OpenAiProvider,
    store: Arc<dyn VectorStore>,
    config: &Config,
) -> Retriever<OpenAiProvider> {
    Retriever::new(provider, store, config.store.collection.clone()).with_config(RetrieverConfig {
        min_score: config.query.min_score,
        ..RetrieverConfig::default()
    })
}

async fn run_gaps(
    provider: OpenAiProvider,
    store: Arc<dyn VectorStore>,
    config: &Config,
    topic: &str,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let analysis =
        GapAnalysis::new(retriever(provider, store, config)).with_config(GapAnalysisConfig {
            top_k_per_query: config.query.gap_top_k_per_query,
            max_chunks_per_document: config.query.gap_max_chunks_per_document,
            concurrency: config.query.gap_concurrency,
            ..GapAnalysisConfig::default()
        });

    let report = analysis.run(topic, cancel).await?;
    print_gap_report(&report);
    Ok(())
}

fn print_gap_report(report: &GapReport) {
    println!("gap analysis: {}", report.topic);
    println!(
        "({} findings across {} documents)\n",
        report.findings.len(),
        report.documents_consulted
    );
    for finding in &report.findings {
        println!("[{}] {}", finding.category, finding.description);
        for cite in &finding.sources {
            println!("    - document {} chunk {}", cite.document_id, cite.chunk_index);
        }
    }
}

async fn run_chat(
    provider: OpenAiProvider,
    store: Arc<dyn VectorStore>,
    config: &Config,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let chat = CitedChat::new(retriever(provider, store, config)).with_config(ChatConfig {
        top_k: config.query.chat_top_k,
        history_turns: config.query.history_turns,
        ..ChatConfig::default()
    });
    let mut conversation = Conversation::new();

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            () = cancel.cancelled() => break,
        };
        let Some(line) = line else { break };
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if question == "exit" || question == "quit" {
            break;
        }

        match chat.ask(&mut conversation, question, cancel).await {
            Ok(turn) => {
                println!("{}", turn.answer);
                if !turn.citations.is_empty() {
                    println!("cited:");
                    for cite in &turn.citations {
                        println!("  - document {} chunk {}", cite.document_id, cite.chunk_index);
                    }
                }
            }
            Err(e) => eprintln!("error: {e}"),
        }
    }

    Ok(())
}
