mod cli;
mod error;

use crate::cli::{Cli, Command, RunArgs};
use crate::error::{Error, ErrorKind, Result};
use clap::Parser;
use dtz_batch::edit::{EditSettings, RateLimits};
use dtz_batch::report::{Completion, write_events};
use dtz_batch::{BatchRequest, ScanSettings, scan};
use dtz_config::{BatchConfig, Config};
use dtz_store::backend::{MediaWikiOptions, MediaWikiStore, ReadOnlyStore};
use dtz_store::{IdentityProvider, StoreHandle};
use exn::ResultExt;
use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_level());
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::debug!(error = ?err, "Aborted");
            eprintln!("dtz: {err}");
            ExitCode::FAILURE
        },
    }
}

/// Logs go to stderr; stdout carries the outcome lines only.
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_env("DTZ_LOG").unwrap_or_else(|_| EnvFilter::new(level));
    if let Err(err) = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
    {
        eprintln!("dtz: failed to initialize logging: {err}");
    }
}

/// Re-raises an error from another crate, keeping its message.
fn reraise<K>(err: exn::Exn<K>, kind: impl FnOnce(String) -> ErrorKind) -> Error
where
    K: std::error::Error + Send + Sync + 'static,
{
    let reason = err.to_string();
    err.raise(kind(reason))
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref()).map_err(|err| reraise(err, ErrorKind::Config))?;
    let wiki = Arc::new(connect(&config)?);
    match cli.command {
        Command::Whoami => whoami(wiki.as_ref()).await,
        Command::Run(args) => run_batch(&config, wiki, args).await,
    }
}

fn connect(config: &Config) -> Result<MediaWikiStore> {
    let options = MediaWikiOptions {
        api_url: config.wiki.api_url.clone(),
        user_agent: config.wiki.user_agent.clone(),
        access_token: config.wiki.access_token.clone(),
        maxlag: config.wiki.maxlag,
        timeout: config.wiki.timeout(),
    };
    MediaWikiStore::new("commons", options).map_err(|err| reraise(err, ErrorKind::Store))
}

async fn whoami(identity: &dyn IdentityProvider) -> Result<()> {
    let identity = identity
        .resolve_identity()
        .await
        .map_err(|err| reraise(err, ErrorKind::Store))?;
    println!("{} ({})", identity.username, identity.groups.join(", "));
    Ok(())
}

/// Dry runs write nothing, so they are not paced between edits.
fn edit_interval(batch: &BatchConfig, dry_run: bool) -> Duration {
    if dry_run { Duration::ZERO } else { batch.edit_interval() }
}

async fn run_batch(config: &Config, wiki: Arc<MediaWikiStore>, args: RunArgs) -> Result<()> {
    let interval = edit_interval(&config.batch, args.dry_run);
    let store: StoreHandle = if args.dry_run {
        Arc::new(ReadOnlyStore::new(Arc::clone(&wiki)))
    } else {
        wiki.clone()
    };
    let request = BatchRequest::resolve(store.as_ref(), wiki.as_ref(), &args.into())
        .await
        .map_err(|err| reraise(err, ErrorKind::Request))?;

    let mut stdout = std::io::stdout();
    writeln!(stdout, "Editing as user {}", request.identity.username).or_raise(|| ErrorKind::Output)?;

    let limits = RateLimits::new(interval);
    let limiter = limits.for_user(&request.identity.username).await;
    let settings = ScanSettings {
        page_size: config.batch.page_size,
        record_pacing: config.batch.record_pacing(),
        edit: EditSettings {
            max_attempts: config.batch.max_attempts,
            summary: config.batch.summary.clone(),
            template: config.batch.template.clone(),
        },
    };
    match write_events(scan(store.as_ref(), &request, limiter, &settings), &mut stdout).await {
        Completion::Finished(summary) => {
            tracing::info!(records = summary.records(), converted = summary.converted, "Batch complete");
        },
        Completion::Disconnected { lines } => {
            tracing::info!(lines, "Output closed before the batch completed");
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(false, Duration::from_secs(5))]
    #[case(true, Duration::ZERO)]
    fn test_edit_interval(#[case] dry_run: bool, #[case] expected: Duration) {
        assert_eq!(edit_interval(&BatchConfig::default(), dry_run), expected);
    }
}
