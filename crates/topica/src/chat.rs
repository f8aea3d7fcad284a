// SPDX-FileCopyrightText: 2026 Topica Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `topica chat` command implementation.
//!
//! Runs a rustyline REPL over one session. Leaving the loop closes the
//! session, which summarizes the open topic and persists memory.

use std::sync::Arc;

use colored::Colorize;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use topica_agent::{SessionOrchestrator, TurnOutcome};
use topica_config::TopicaConfig;
use topica_core::TopicaError;
use topica_memory::FileStore;
use topica_openai::{OpenAiEmbedder, OpenAiProvider};
use tracing::warn;

const EXIT_WORDS: [&str; 3] = ["exit", "quit", "q"];

pub async fn run_chat(config: &TopicaConfig, username: &str) -> Result<(), TopicaError> {
    let provider = Arc::new(OpenAiProvider::new(&config.provider).inspect_err(|_| {
        eprintln!("error: an API key is required. Set provider.api_key or OPENAI_API_KEY");
    })?);
    let embedder = Arc::new(OpenAiEmbedder::new(&config.provider)?);
    let storage = Arc::new(FileStore::new(&config.storage.data_dir));

    let mut orchestrator = SessionOrchestrator::new(config, provider, embedder, storage);
    let session = orchestrator.start_session(username).await?;
    println!(
        "{} {}",
        "topica".bold().green(),
        format!("session {}", session.session_id).dimmed()
    );
    println!("Type {} to end the session.\n", "exit".yellow());

    let mut rl = DefaultEditor::new()
        .map_err(|e| TopicaError::Internal(format!("failed to initialize readline: {e}")))?;
    let prompt = format!("{}> ", username.cyan());

    loop {
        match rl.readline(&prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if EXIT_WORDS.contains(&trimmed.to_lowercase().as_str()) {
                    break;
                }
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(trimmed);

                match orchestrator.handle_turn(trimmed).await {
                    Ok(outcome) => print_turn(&outcome),
                    Err(e) => eprintln!("{}: {e}", "error".red()),
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("{}: {e}", "error".red());
                break;
            }
        }
    }

    println!("{}", "saving memory...".dimmed());
    match orchestrator.end_session().await {
        Ok(report) => {
            println!(
                "{}",
                format!("{} topic(s) archived for {}", report.topics_archived, report.session_id)
                    .dimmed()
            );
            Ok(())
        }
        Err(e) => {
            warn!(error = %e, "persisting session failed, retrying once");
            orchestrator.persist().await
        }
    }
}

fn print_turn(outcome: &TurnOutcome) {
    println!("{} {}\n", "topica:".green().bold(), outcome.response);
    if !outcome.closed_topics.is_empty() {
        println!("{}", "(new topic started)".dimmed());
    }
}
