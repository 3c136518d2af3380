use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use keysearch_core::persist::{load_snapshot, save_snapshot, IndexPaths};
use keysearch_core::tokenizer::query_keywords;
use keysearch_core::{
    BuildOptions, ClickStore, DocId, IndexSnapshot, KeywordSet, Quartile, SearchConfig, SearchEngine, SimilarityTable,
    SledClickStore,
};
use serde::Serialize;
use tracing_subscriber::{fmt, EnvFilter};

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

mod ingest;

#[derive(Parser)]
#[command(name = "keysearch")]
#[command(about = "Build and query a BM25 keyword index", long_about = None)]
struct Cli {
    /// JSON config file with k1, b, limit and corpus_path
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// BM25 term saturation
    #[arg(long, global = true, env = "KEYSEARCH_K1")]
    k1: Option<f64>,
    /// BM25 length normalization
    #[arg(long, global = true, env = "KEYSEARCH_B")]
    b: Option<f64>,
    /// Maximum number of ranked results
    #[arg(long, global = true, env = "KEYSEARCH_LIMIT")]
    limit: Option<usize>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index from JSONL datasets
    Build {
        /// Corpus file or directory (defaults to the config's corpus_path)
        #[arg(long, env = "KEYSEARCH_CORPUS")]
        input: Option<PathBuf>,
        /// Output index directory
        #[arg(long, default_value = "./index")]
        output: PathBuf,
        /// Keep documents without tokens instead of failing
        #[arg(long, default_value_t = false)]
        allow_empty: bool,
        /// Stop after this many documents
        #[arg(long)]
        max_docs: Option<usize>,
        /// Comma-separated terms to track as keywords (default: every term)
        #[arg(long, value_delimiter = ',')]
        keywords: Vec<String>,
        /// JSONL file of precomputed document similarities
        #[arg(long)]
        similarities: Option<PathBuf>,
    },
    /// Rank documents for the accumulated keywords
    Search {
        #[arg(long, default_value = "./index")]
        index: PathBuf,
        #[arg(long, default_value = "./clicks.db")]
        clicks_db: PathBuf,
        /// Only keep results in this entropy quartile
        #[arg(long)]
        quartile: Option<Quartile>,
        /// Query lines, oldest first; stop words are dropped
        #[arg(required = true)]
        queries: Vec<String>,
    },
    /// Pairwise document co-occurrence of keywords
    Cooccur {
        #[arg(long, default_value = "./index")]
        index: PathBuf,
        keywords: Vec<String>,
    },
    /// Record a click on a document for some keywords
    Click {
        #[arg(long, default_value = "./index")]
        index: PathBuf,
        #[arg(long, default_value = "./clicks.db")]
        clicks_db: PathBuf,
        #[arg(long)]
        doc: DocId,
        /// Comma-separated keyword terms
        #[arg(long, value_delimiter = ',', required = true)]
        keywords: Vec<String>,
    },
    /// Show recorded clicks for documents
    Clicks {
        #[arg(long, default_value = "./index")]
        index: PathBuf,
        #[arg(long, default_value = "./clicks.db")]
        clicks_db: PathBuf,
        #[arg(long, value_delimiter = ',', required = true)]
        docs: Vec<DocId>,
    },
    /// Most similar documents from the precomputed table
    Similar {
        #[arg(long, default_value = "./index")]
        index: PathBuf,
        #[arg(long)]
        doc: DocId,
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;

    match cli.command {
        Commands::Build { input, output, allow_empty, max_docs, keywords, similarities } => {
            let input = input.unwrap_or_else(|| config.corpus_path.clone());
            build_index(&input, &output, allow_empty, max_docs, &keywords, similarities.as_deref())
        }
        Commands::Search { index, clicks_db, quartile, queries } => {
            let engine = open_engine(&config, &index, &clicks_db)?;
            let keywords: Vec<String> = queries.iter().flat_map(|q| query_keywords(q)).collect();
            let results = engine.search(&keywords, quartile)?;
            let cooccurrences = engine.cooccur(&keywords);
            print_json(&serde_json::json!({
                "keywords": keywords,
                "results": results,
                "cooccurrences": cooccurrences,
            }))
        }
        Commands::Cooccur { index, keywords } => {
            let snapshot = load_snapshot(&IndexPaths::new(&index))?;
            print_json(&snapshot.cooccur(&keywords))
        }
        Commands::Click { index, clicks_db, doc, keywords } => {
            let engine = open_engine(&config, &index, &clicks_db)?;
            let ids: BTreeSet<_> = engine.resolve_keywords(&keywords)?.into_iter().collect();
            engine.record_click(doc, &ids)?;
            engine.click_store().flush()?;
            let clicks = engine.get_clicks(&BTreeSet::from([doc]))?;
            print_json(&clicks)
        }
        Commands::Clicks { index, clicks_db, docs } => {
            let engine = open_engine(&config, &index, &clicks_db)?;
            print_json(&engine.get_clicks(&docs.into_iter().collect())?)
        }
        Commands::Similar { index, doc, limit } => {
            let engine = open_engine(&config, &index, Path::new(""))?;
            print_json(&engine.similar(doc, limit)?)
        }
    }
}

/// Config file (or defaults), then command-line/environment overrides.
fn resolve_config(cli: &Cli) -> Result<SearchConfig> {
    let mut config = match &cli.config {
        Some(path) => SearchConfig::from_json_file(path).with_context(|| format!("loading {}", path.display()))?,
        None => SearchConfig::default(),
    };
    if let Some(k1) = cli.k1 { config.k1 = k1; }
    if let Some(b) = cli.b { config.b = b; }
    if let Some(limit) = cli.limit { config.limit = limit; }
    config.validate()?;
    Ok(config)
}

fn build_index(
    input: &Path,
    output: &Path,
    allow_empty: bool,
    max_docs: Option<usize>,
    keywords: &[String],
    similarities: Option<&Path>,
) -> Result<()> {
    let loaded = ingest::load_corpus(input, max_docs)?;
    tracing::info!(num_docs = loaded.documents.len(), input = %input.display(), "ingested documents");

    let mut snapshot = IndexSnapshot::build(loaded.documents, &BuildOptions { allow_empty })?;
    if !keywords.is_empty() {
        snapshot.keywords = KeywordSet::designate(&snapshot.corpus.lexicon, keywords)?;
    }
    if let Some(path) = similarities {
        snapshot.similarities =
            SimilarityTable::load_jsonl(path).with_context(|| format!("loading similarities {}", path.display()))?;
    }
    snapshot.generation = 1;

    let meta = save_snapshot(&IndexPaths::new(output), &snapshot)?;
    tracing::info!(output = %output.display(), num_terms = meta.num_terms, "index build complete");
    Ok(())
}

/// Engine over a persisted index. An empty `clicks_db` path gives a
/// throwaway click store.
fn open_engine(config: &SearchConfig, index: &Path, clicks_db: &Path) -> Result<SearchEngine<SledClickStore>> {
    let store = if clicks_db.as_os_str().is_empty() {
        SledClickStore::temporary()?
    } else {
        SledClickStore::open(clicks_db).with_context(|| format!("opening click store {}", clicks_db.display()))?
    };
    let engine = SearchEngine::new(config, store)?;
    let snapshot = load_snapshot(&IndexPaths::new(index)).with_context(|| format!("loading index {}", index.display()))?;
    engine.install(snapshot);
    Ok(engine)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
