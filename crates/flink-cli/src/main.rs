//! `flink-shell` binary entrypoint.

use std::io::{self, IsTerminal};
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tokio::sync::mpsc;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use flink_cli::{Cli, History, HttpGateway, OutputFormat, Readline, Shell, ShellConfig};
use flink_store::{PollProgress, StatementStore};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Returns whether every statement succeeded.
async fn run(cli: Cli) -> anyhow::Result<bool> {
    let mut config = match &cli.config {
        Some(path) => ShellConfig::from_file(path).context("failed to load configuration")?,
        None => ShellConfig::default(),
    };
    config.apply_cli(&cli)?;
    config.validate().context("invalid configuration")?;

    let gateway = HttpGateway::new(&config.gateway_url, config.api_token.clone())
        .context("failed to create statement service client")?;
    debug!(?gateway, "statement service client ready");

    let (progress_tx, progress_rx) = mpsc::unbounded_channel();
    tokio::spawn(report_progress(progress_rx));

    let store = StatementStore::new(gateway, config.session_context(), config.session_properties())
        .with_progress(progress_tx);
    let mut shell = Shell::new(store, OutputFormat::new(cli.format))
        .with_max_pages(config.max_result_pages)
        .with_wait_for_completion(cli.wait)
        .with_interrupts(true);
    if !cli.no_history {
        shell = shell.with_history(History::new(config.history_path(), config.history_size));
    }

    let mut stdout = io::stdout();
    if let Some(statements) = &cli.execute {
        return Ok(shell.run_script(statements, &mut stdout).await?);
    }
    if let Some(path) = &cli.file {
        let script = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        return Ok(shell.run_script(&script, &mut stdout).await?);
    }

    if io::stdin().is_terminal() {
        let mut editor = Readline::start(shell.history_entries())
            .await
            .context("failed to start line editor")?;
        shell.run_prompt(&mut editor, &mut stdout).await?;
    } else {
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        shell.run_interactive(stdin, &mut stdout).await?;
    }
    Ok(true)
}

async fn report_progress(mut progress: mpsc::UnboundedReceiver<PollProgress>) {
    while let Some(update) = progress.recv().await {
        eprintln!(
            "Waiting for statement {} ({}, {}s of {}s)",
            update.statement_name,
            update.phase,
            update.elapsed.as_secs(),
            update.timeout.as_secs()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_script_flags() {
        let cli = Cli::parse_from(["flink-shell", "-f", "init.sql", "--wait", "--no-history"]);
        assert!(cli.file.is_some());
        assert!(cli.wait);
        assert!(cli.no_history);
    }

    #[test]
    fn cli_rejects_file_with_execute() {
        assert!(Cli::try_parse_from(["flink-shell", "-f", "a.sql", "-e", "SELECT 1"]).is_err());
    }
}
