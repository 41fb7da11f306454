use std::{io, process::ExitCode};

use anyhow::Context;
use clap::Parser;
use owo_colors::{OwoColorize, Stream};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::{
    cli::{Cli, Command},
    config::Config,
    digest::Digest,
    fetcher::Fetcher,
    http::HttpClient,
    mailer::SmtpMailer,
    paper::Source,
    runner::{Collected, Outcome},
    store::SeenStore,
};

mod cli;
mod config;
mod digest;
mod feed;
mod fetcher;
mod http;
mod mailer;
mod normalize;
mod paper;
mod runner;
mod store;

fn main() -> ExitCode {
    // A missing .env file is fine; flags and the real environment still apply.
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    // RUST_LOG wins over -q/-v.
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    debug!(config = ?cli.config, "configuration loaded");

    match execute(&cli) {
        Ok(code) => code,
        Err(e) => {
            let chain = format!("{e:#}");
            error!(error = %chain, "fatal error while running digest");
            ExitCode::FAILURE
        }
    }
}

fn execute(cli: &Cli) -> anyhow::Result<ExitCode> {
    let config = &cli.config;
    let http = HttpClient::new(&config.user_agent);
    let fetchers = fetcher::from_config(config, &http);

    match cli.command.unwrap_or(Command::Run) {
        Command::Sources => {
            print_sources(config, &fetchers);
            Ok(ExitCode::SUCCESS)
        }
        Command::Check { json } => {
            warn_without_keywords(config);
            let store = SeenStore::read_only(&config.state_file);
            let collected = runner::collect(&store, &fetchers);
            print_new(&collected, json)?;
            print_summary(&collected, Status::Checked);
            Ok(ExitCode::SUCCESS)
        }
        Command::Run => {
            warn_without_keywords(config);
            let mut store = SeenStore::open(&config.state_file).with_context(|| {
                format!("failed to open state file {}", config.state_file.display())
            })?;
            info!(
                sources = fetchers.len(),
                state = %store.path().display(),
                seen = store.len(),
                "starting digest run"
            );

            let mailer = SmtpMailer::from_config(config);
            let collected = runner::collect(&store, &fetchers);
            let outcome = runner::run_digest(&mut store, &collected, &mailer)
                .context("failed to record sent papers")?;

            print_summary(&collected, Status::Ran(outcome));
            Ok(outcome.exit_code())
        }
    }
}

fn warn_without_keywords(config: &Config) {
    if config.keywords.is_empty() {
        warn!("no keywords configured, no paper can match");
    }
}

fn print_sources(config: &Config, fetchers: &[Box<dyn Fetcher>]) {
    for f in fetchers {
        let source = f.source();
        if source == Source::Nature {
            println!("{:<15} {} ({})", source, f.url(), config.nature_mode);
        } else {
            println!("{:<15} {}", source, f.url());
        }
    }
}

fn print_new(collected: &Collected, json: bool) -> anyhow::Result<()> {
    if json {
        for paper in &collected.new {
            println!("{}", serde_json::to_string(paper)?);
        }
    } else if let Some(digest) = Digest::compose(&collected.new) {
        println!("{}", digest.subject);
        println!();
        println!("{}", digest.plain);
    }
    Ok(())
}

enum Status {
    Checked,
    Ran(Outcome),
}

/// One line on stderr: matches per source, then what happened to the new papers.
fn print_summary(collected: &Collected, status: Status) {
    let per_source = collected
        .per_source
        .iter()
        .map(|(source, count)| {
            format!(
                "{} {} {}",
                source,
                "✓".if_supports_color(Stream::Stderr, |t| t.green()),
                count
            )
        })
        .collect::<Vec<_>>()
        .join("  ");

    let status = match status {
        Status::Checked => "checked, nothing sent"
            .if_supports_color(Stream::Stderr, |t| t.yellow())
            .to_string(),
        Status::Ran(Outcome::NothingNew) => "nothing new"
            .if_supports_color(Stream::Stderr, |t| t.dimmed())
            .to_string(),
        Status::Ran(Outcome::Sent(_)) => "sent"
            .if_supports_color(Stream::Stderr, |t| t.green())
            .to_string(),
        Status::Ran(Outcome::SendFailed) => "✗ send failed"
            .if_supports_color(Stream::Stderr, |t| t.red())
            .to_string(),
    };

    eprintln!(
        "{per_source}  | new {}  | {status}",
        collected.new.len()
    );
}
