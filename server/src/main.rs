use anyhow::Result;
use axum::Router;
use clap::Parser;
use engine::config::DEFAULT_PROXIMITY_STEP_BUDGET;
use engine::{IndexFormat, ProximityStrategy, ScorerConfig};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};
use server::{build_app, ServerSettings};
use tokio::net::TcpListener;

#[derive(Parser)]
struct Args {
    /// Index directory path
    #[arg(long, default_value = "./index")]
    index: PathBuf,
    /// Corpus root containing bookkeeping.json
    #[arg(long, default_value = "./WEBPAGES_RAW")]
    corpus: PathBuf,
    /// Artifact encoding: json or bincode
    #[arg(long, default_value = "json")]
    format: IndexFormat,
    /// Proximity search: greedy or sliding-window
    #[arg(long, default_value = "greedy")]
    proximity: ProximityStrategy,
    #[arg(long, default_value_t = DEFAULT_PROXIMITY_STEP_BUDGET)]
    proximity_budget: usize,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    let settings = ServerSettings {
        index_dir: args.index,
        corpus_dir: args.corpus,
        format: args.format,
        scorer: ScorerConfig { proximity: args.proximity, proximity_step_budget: args.proximity_budget },
        admin_token: std::env::var("ADMIN_TOKEN").ok(),
    };
    let app: Router = build_app(settings)?;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
