use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use engine::{
    ensure_index, BuildOutcome, FsCorpus, IndexFormat, IndexPaths, IndexerConfig, ProximityStrategy, ScorerConfig,
    SearchContext,
};
use engine::config::{DEFAULT_META_TOKEN_CAP, DEFAULT_PROXIMITY_STEP_BUDGET};
use tracing_subscriber::{EnvFilter, fmt};

use std::io::{self, BufRead, Write};

/// Results printed per console query.
const CONSOLE_RESULTS: usize = 20;

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build a TF-IDF inverted index over an HTML corpus and query it", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index unless the artifact already exists
    Build {
        /// Corpus root containing bookkeeping.json and the raw pages
        #[arg(long, default_value = "./WEBPAGES_RAW")]
        corpus: String,
        /// Output index directory
        #[arg(long, default_value = "./index")]
        output: String,
        /// Artifact encoding: json or bincode
        #[arg(long, default_value = "json")]
        format: IndexFormat,
        /// Tokens read from each meta description/keywords field
        #[arg(long, default_value_t = DEFAULT_META_TOKEN_CAP)]
        meta_token_cap: usize,
    },
    /// Interactive console search, one query per line ('q' quits)
    Query {
        #[arg(long, default_value = "./WEBPAGES_RAW")]
        corpus: String,
        #[arg(long, default_value = "./index")]
        index: String,
        #[arg(long, default_value = "json")]
        format: IndexFormat,
        /// Proximity search: greedy or sliding-window
        #[arg(long, default_value = "greedy")]
        proximity: ProximityStrategy,
        #[arg(long, default_value_t = DEFAULT_PROXIMITY_STEP_BUDGET)]
        proximity_budget: usize,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { corpus, output, format, meta_token_cap } => {
            build(&corpus, &output, IndexerConfig { meta_token_cap, format })
        }
        Commands::Query { corpus, index, format, proximity, proximity_budget } => {
            let config = ScorerConfig { proximity, proximity_step_budget: proximity_budget };
            run_console(&corpus, &index, format, config)
        }
    }
}

fn build(corpus_root: &str, output: &str, config: IndexerConfig) -> Result<()> {
    let corpus = FsCorpus::new(corpus_root, config.meta_token_cap);
    let metadata = corpus
        .metadata()
        .with_context(|| format!("reading {}", corpus.bookkeeping_path().display()))?;
    let paths = IndexPaths::new(output);

    match ensure_index(&paths, &corpus, &metadata, &config)? {
        BuildOutcome::Built(report) => {
            for (doc_id, reason) in &report.skipped {
                eprintln!("skipped {doc_id}: {reason}");
            }
            println!(
                "indexed {} documents ({} skipped), {} terms -> {}",
                report.documents_indexed,
                report.skipped.len(),
                report.num_terms,
                paths.artifact(config.format).display()
            );
        }
        BuildOutcome::Skipped => {
            println!(
                "{} already exists; delete it to rebuild",
                paths.artifact(config.format).display()
            );
        }
    }
    Ok(())
}

fn run_console(corpus_root: &str, index: &str, format: IndexFormat, config: ScorerConfig) -> Result<()> {
    let corpus = FsCorpus::new(corpus_root, DEFAULT_META_TOKEN_CAP);
    let metadata = corpus.metadata()?;
    let ctx = SearchContext::load(&IndexPaths::new(index), format, metadata, config)
        .context("loading index (run `indexer build` first)")?;

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    loop {
        write!(stdout, "Please enter a query or 'q/Q' to quit: ")?;
        stdout.flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let query = line.trim();
        if query.eq_ignore_ascii_case("q") {
            break;
        }
        let results = ctx.retrieve(query);
        writeln!(stdout)?;
        if results.is_empty() {
            writeln!(stdout, "no results")?;
        }
        for (_, url) in results.iter().take(CONSOLE_RESULTS) {
            writeln!(stdout, "{url}")?;
        }
        writeln!(stdout)?;
    }
    Ok(())
}
