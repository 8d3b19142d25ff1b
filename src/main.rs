mod api;
mod cli;
mod config;
mod error;
mod matching;
mod model;
mod observer;
mod orchestrator;
mod registry;
mod server;
mod ui;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use api::{MarketApi, MarketClient};
use cli::{Cli, Command};
use config::JobmatchConfig;
use model::JobFilter;
use observer::MatchObserver;
use registry::{MemoryAgentRegistry, MemoryJobRegistry, load_seed};
use server::AppState;
use ui::MatchProgress;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "jobmatch=debug"
    } else {
        "jobmatch=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = JobmatchConfig::load()?;
    if let Some(url) = cli.api_url {
        config.api_base_url = url;
    }

    match cli.command {
        Command::Serve { bind, seed } => {
            if let Some(bind) = bind {
                config.bind_addr = bind;
            }
            if seed.is_some() {
                config.seed_file = seed;
            }
            serve(&config).await
        }
        Command::Match { jobs } => {
            let observer = MatchObserver::new(client(&config)?, config.refresh_delay());
            let progress = MatchProgress::start("Matching jobs with agents...");
            match observer.request_and_observe(&jobs).await {
                Ok(observation) => {
                    progress.complete(&observation);
                    Ok(())
                }
                Err(e) => {
                    progress.abandon();
                    Err(e).context("match request failed")
                }
            }
        }
        Command::Jobs { status } => {
            let filter = JobFilter {
                status: status.map(Into::into),
                ..Default::default()
            };
            let jobs = client(&config)?.list_jobs(&filter).await?;
            ui::print_jobs(&jobs);
            Ok(())
        }
        Command::Status { id, status } => {
            let job = client(&config)?.set_job_status(&id, status.into()).await?;
            ui::print_job(&job);
            Ok(())
        }
        Command::Candidates { id } => {
            let candidates = client(&config)?.candidates(&id).await?;
            ui::print_candidates(&candidates);
            Ok(())
        }
    }
}

fn client(config: &JobmatchConfig) -> Result<MarketClient> {
    MarketClient::new(config.api_base_url.clone(), config.request_timeout())
        .context("failed to build HTTP client")
}

async fn serve(config: &JobmatchConfig) -> Result<()> {
    let addr = config.bind_socket_addr()?;
    let jobs = Arc::new(MemoryJobRegistry::new());
    let agents = Arc::new(MemoryAgentRegistry::new());

    if let Some(path) = &config.seed_file {
        load_seed(path, jobs.as_ref(), agents.as_ref())
            .await
            .with_context(|| format!("failed to load seed {}", path.display()))?;
    }

    let state = Arc::new(AppState::new(jobs, agents));
    info!(%addr, "starting jobmatch server");
    server::run_server(addr, state).await?;
    Ok(())
}
