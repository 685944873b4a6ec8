use std::io::{self, Write};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod ai;
mod cli;
mod config;
mod diff;
mod error;
mod git;
mod models;
mod prompt;
mod render;
mod response;
mod worktree;

#[cfg(test)]
mod test_support;

use ai::{GeminiClient, ReviewService};
use cli::{CheckArgs, Cli, Command, ReportArgs};
use config::Config;
use git::GitAnalyzer;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!("Command failed: {:?}", e);
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| default_level.into());

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(filter))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::from_env().context("Invalid configuration")?;

    match cli.command {
        Command::Check(args) => check(&config, args).await,
        Command::Report(args) => report(&config, args).await,
    }
}

fn review_service(config: &Config) -> Result<ReviewService<GeminiClient>> {
    let client = GeminiClient::new(config).context("Failed to initialize the model client")?;
    Ok(ReviewService::new(client))
}

async fn check(config: &Config, args: CheckArgs) -> Result<()> {
    let analyzer = GitAnalyzer::open_current_dir(config.recent_commits)?;
    let service = review_service(config)?;

    let analysis = if args.uncommitted {
        let changes = analyzer
            .uncommitted_changes()
            .context("Failed to collect uncommitted changes")?;
        if changes.is_empty() {
            render::render_notice(&mut io::stdout(), "No uncommitted changes found to analyze")?;
            return Ok(());
        }

        tracing::info!("Analyzing {} uncommitted changes", changes.len());
        service
            .analyze_changes(&changes)
            .await
            .context("Failed to analyze code changes")?
    } else {
        let commits = analyzer
            .commits_unique_to(&args.target)
            .context("Failed to get branch commits")?;
        if commits.is_empty() {
            render::render_notice(&mut io::stdout(), "No commits found to analyze")?;
            return Ok(());
        }

        tracing::info!("Analyzing {} commits against '{}'", commits.len(), args.target);
        service
            .analyze_commits(&commits)
            .await
            .context("Failed to analyze code changes")?
    };

    let mut stdout = io::stdout().lock();
    render::render_analysis(&mut stdout, &analysis)?;
    stdout.flush()?;
    Ok(())
}

async fn report(config: &Config, args: ReportArgs) -> Result<()> {
    let analyzer = GitAnalyzer::open_current_dir(config.recent_commits)?;
    let service = review_service(config)?;

    let context = analyzer
        .context()
        .context("Failed to get repository context")?;
    let commits = analyzer
        .commits_unique_to(&args.target)
        .context("Failed to get branch commits")?;
    if commits.is_empty() {
        render::render_notice(&mut io::stdout(), "No commits found to generate report")?;
        return Ok(());
    }

    tracing::info!(
        "Generating merge request description for {} commits on '{}'",
        commits.len(),
        context.current_branch
    );
    let report = service
        .generate_mr_description(&commits, &context)
        .await
        .context("Failed to generate merge request description")?;

    let mut stdout = io::stdout().lock();
    render::render_report(&mut stdout, &report)?;
    stdout.flush()?;
    Ok(())
}
