mod cli;
mod config;
mod logging;

use crate::cli::{Args, Command};
use crate::config::load_client_config;
use crate::logging::init_tracing;
use anyhow::Context;
use clap::Parser;
use hackaware_console::view::{
    render_message, render_progress, render_report, render_transcript, TYPING_INDICATOR,
};
use hackaware_console::{
    AnalysisEvent, AnalysisSession, AnalyzeOutcome, ApiClient, ChatEvent, ChatSession,
};
use protocol::config::ClientConfig;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let _log_guard = init_tracing(&args.log_dir, args.log_to_stderr)
        .with_context(|| format!("failed to init logging in {}", args.log_dir.display()))?;

    let config = load_client_config(&args).context("failed to load client config")?;
    info!(
        base_url = %config.base_url,
        chat_failure_policy = ?config.chat_failure_policy,
        "hackaware starting"
    );
    let client = ApiClient::new(&config)?;

    match args.command {
        Command::Chat { questions } => run_chat(client, &config, questions).await,
        Command::Analyze { name, json } => run_analysis(client, &config, &name, json).await,
    }
}

async fn run_chat(
    client: ApiClient,
    config: &ClientConfig,
    questions: Vec<String>,
) -> anyhow::Result<()> {
    let session = Arc::new(ChatSession::new(client, config.chat_failure_policy));
    print!("{}", render_transcript(&session.snapshot().await));
    let printer = spawn_chat_printer(session.subscribe());

    if questions.is_empty() {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
            session.submit(&line).await;
        }
    } else {
        for question in &questions {
            session.submit(question).await;
        }
    }

    session.close().await;
    drop(session);
    let _ = printer.await;
    info!("chat session closed");
    Ok(())
}

fn spawn_chat_printer(mut rx: broadcast::Receiver<ChatEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(ChatEvent::MessageAppended { message }) => {
                    println!("{}", render_message(&message));
                }
                Ok(ChatEvent::ComposingChanged { composing: true }) => {
                    println!("{TYPING_INDICATOR}");
                }
                Ok(ChatEvent::ComposingChanged { composing: false }) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "chat printer lagged behind");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

async fn run_analysis(
    client: ApiClient,
    config: &ClientConfig,
    name: &str,
    json: bool,
) -> anyhow::Result<()> {
    let session = AnalysisSession::new(client, &config.progress);
    let printer = spawn_progress_printer(session.subscribe(), json);

    let outcome = session.analyze(name).await;
    let snapshot = session.snapshot().await;
    drop(session);
    let _ = printer.await;

    if outcome == AnalyzeOutcome::Ignored {
        eprintln!("Enter an app name or website URL to analyze.");
        return Ok(());
    }
    if json {
        let rendered = serde_json::to_string_pretty(&snapshot.report)
            .context("failed to serialize report")?;
        println!("{rendered}");
    } else {
        print!("{}", render_report(&snapshot.subject, snapshot.report.as_ref()));
    }
    Ok(())
}

// Progress goes to stderr so `--json` output stays machine readable.
fn spawn_progress_printer(
    mut rx: broadcast::Receiver<AnalysisEvent>,
    quiet: bool,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(AnalysisEvent::ProgressChanged { progress }) if !quiet => {
                    eprintln!("{}", render_progress(progress));
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}
