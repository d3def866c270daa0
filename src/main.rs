use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use docqa_core::{DocumentStore, Embedder, MatchKind, RagConfig, ScoredPassage};
use docqa_groq::GroqClient;
use docqa_rag::{
    embedder_from_config, ContextAssembler, IngestionPipeline, LocalDocumentStore,
    QuestionAnswerer, Retrieval, RetrievalConfig, Retriever,
};

#[derive(Parser)]
#[command(name = "docqa")]
#[command(about = "Ask questions about your documents", long_about = None)]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest PDF, JSON, text, markdown or HTML files
    Ingest {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Show the passages retrieved for a query
    Search {
        query: String,
        /// Number of passages to retrieve (defaults to DOCQA_TOP_K)
        #[arg(short)]
        k: Option<usize>,
    },
    /// Answer a question from the ingested documents
    Ask {
        question: String,
        /// Groq model to answer with (defaults to GROQ_MODEL)
        #[arg(long)]
        model: Option<String>,
    },
    /// Delete every passage whose source matches a pattern (case-insensitive)
    Delete { pattern: String },
    /// Show passage counts by document type
    Stats,
}

#[derive(Serialize)]
struct SearchHit<'a> {
    content: &'a str,
    source: &'a str,
    page: u32,
    similarity: f32,
    kind: MatchKind,
}

impl<'a> From<&'a ScoredPassage> for SearchHit<'a> {
    fn from(passage: &'a ScoredPassage) -> Self {
        Self {
            content: passage.content(),
            source: passage.source(),
            page: passage.page(),
            similarity: passage.similarity,
            kind: passage.kind,
        }
    }
}

/// Shared components, built once from configuration
struct App {
    config: RagConfig,
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn DocumentStore>,
}

impl App {
    async fn from_config(config: RagConfig) -> Result<Self> {
        let embedder = embedder_from_config(&config.embedding)?;
        let store = LocalDocumentStore::open(&config.store_path, Some(embedder.dimension()))
            .await
            .with_context(|| format!("opening store {}", config.store_path.display()))?;
        tracing::debug!(
            "Using store {} (dimension {:?}) with {}-dimensional embeddings",
            config.store_path.display(),
            store.dimension()?,
            embedder.dimension()
        );

        Ok(Self {
            config,
            embedder,
            store: Arc::new(store),
        })
    }

    fn retriever(&self) -> Retriever {
        Retriever::with_store(
            self.embedder.clone(),
            self.store.clone(),
            RetrievalConfig::from(&self.config),
        )
    }
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.json_logs);

    let config = RagConfig::from_env()?;
    let app = App::from_config(config).await?;

    match cli.command {
        Commands::Ingest { files } => {
            let pipeline =
                IngestionPipeline::from_config(&app.config, app.embedder.clone(), app.store.clone())?;
            let report = pipeline.ingest_paths(&files).await?;
            println!(
                "{} Ingested {} file(s) into {} passage(s)",
                "✅".green(),
                report.files,
                report.inserted
            );
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Search { query, k } => {
            let k = k.unwrap_or(app.config.top_k);
            match app.retriever().retrieve(&query, k).await {
                Retrieval::Relevant(passages) => {
                    let hits: Vec<SearchHit> = passages.iter().map(SearchHit::from).collect();
                    println!("{}", serde_json::to_string_pretty(&hits)?);
                }
                Retrieval::NoRelevantDocuments => {
                    println!("{} No relevant documents found", "⚠️".yellow());
                }
            }
        }
        Commands::Ask { question, model } => {
            let mut client = GroqClient::from_env()?;
            if let Some(model) = model {
                client = client.with_model(model);
            }
            let llm = Arc::new(client);
            let answerer = QuestionAnswerer::new(
                app.retriever(),
                ContextAssembler::from_config(&app.config),
                llm,
            );
            let answer = answerer.answer(&question).await?;
            println!("{}", serde_json::to_string_pretty(&answer)?);
        }
        Commands::Delete { pattern } => {
            let removed = app.store.delete_by_source_pattern(&pattern).await?;
            println!(
                "{} Deleted {} passage(s) matching '{}'",
                "🗑".red(),
                removed,
                pattern
            );
        }
        Commands::Stats => {
            let stats = app.store.stats().await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }

    Ok(())
}
