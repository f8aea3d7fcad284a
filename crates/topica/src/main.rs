// SPDX-FileCopyrightText: 2026 Topica Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Topica - a chat agent with topic-aware conversational memory.

mod chat;
mod forget;

use clap::{Args, Parser, Subcommand};
use topica_config::TopicaConfig;
use topica_memory::ClearScope;

/// Topica - a chat agent with topic-aware conversational memory.
#[derive(Parser, Debug)]
#[command(name = "topica", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start an interactive chat session for a user.
    Chat {
        /// Whose memory to load and update.
        username: String,
    },
    /// Clear a user's long-term memory.
    Forget {
        username: String,
        #[command(flatten)]
        parts: ForgetParts,
    },
    /// Print the effective configuration as TOML.
    Config,
}

/// Parts of long-term memory to clear; everything when none is given.
#[derive(Args, Debug, Default, Clone, Copy)]
struct ForgetParts {
    /// Clear the fact table.
    #[arg(long)]
    facts: bool,
    /// Clear archived topics and their embeddings.
    #[arg(long)]
    topics: bool,
    /// Clear the notepad.
    #[arg(long)]
    notepad: bool,
}

impl ForgetParts {
    fn scope(self) -> ClearScope {
        if !(self.facts || self.topics || self.notepad) {
            return ClearScope::ALL;
        }
        ClearScope {
            facts: self.facts,
            topics: self.topics,
            notepad: self.notepad,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match topica_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            topica_config::render_errors(&errors);
            std::process::exit(1);
        }
    };
    init_tracing(&config.agent.log_level);

    let result = match cli.command {
        Commands::Chat { username } => chat::run_chat(&config, &username).await,
        Commands::Forget { username, parts } => {
            forget::run_forget(&config, &username, parts.scope()).await
        }
        Commands::Config => print_config(&config),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn print_config(config: &TopicaConfig) -> Result<(), topica_core::TopicaError> {
    let rendered = topica_config::to_toml_string(&redacted(config))
        .map_err(|e| topica_core::TopicaError::Config(e.to_string()))?;
    print!("{rendered}");
    Ok(())
}

/// Copy of `config` safe to print.
fn redacted(config: &TopicaConfig) -> TopicaConfig {
    let mut config = config.clone();
    if config.provider.api_key.is_some() {
        config.provider.api_key = Some("<redacted>".into());
    }
    config
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("topica={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}
