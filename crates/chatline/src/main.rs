// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chatline - a terminal client for streaming agent conversations.
//!
//! This is the binary entry point.

mod chat;
mod render;
mod session;

use std::path::PathBuf;

use chatline_config::ChatlineConfig;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Chatline - talk to a streaming agent from the terminal.
#[derive(Parser, Debug)]
#[command(name = "chatline", version, about, long_about = None)]
struct Cli {
    /// Load configuration from this file instead of the default hierarchy.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Resume an existing conversation instead of creating one.
    #[arg(long, global = true)]
    conversation: Option<String>,

    /// Skip the persistent channel and use plain request/response.
    #[arg(long, global = true)]
    no_stream: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Launch an interactive chat session (default).
    Chat,
    /// Send a single message and print the answer.
    Send {
        /// Message text.
        text: String,
    },
    /// Inspect configuration.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Validate configuration and report errors.
    Check,
    /// Print the effective configuration as TOML.
    Show,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => chatline_config::load_and_validate_path(path),
        None => chatline_config::load_and_validate(),
    };
    let mut config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            chatline_config::render_errors(&errors);
            std::process::exit(1);
        }
    };
    apply_overrides(&mut config, &cli);

    init_tracing(&config.log.level);

    match cli.command {
        Some(Commands::Chat) | None => {
            if let Err(e) = chat::run_chat(config).await {
                eprintln!("error: {e}");
                std::process::exit(1);
            }
        }
        Some(Commands::Send { text }) => match chat::run_send(config, &text).await {
            Ok(true) => {}
            Ok(false) => std::process::exit(2),
            Err(e) => {
                eprintln!("error: {e}");
                std::process::exit(1);
            }
        },
        Some(Commands::Config { action }) => match action {
            ConfigAction::Check => {
                println!("config ok (endpoint={})", config.endpoint.base_url);
            }
            ConfigAction::Show => match toml::to_string_pretty(&config) {
                Ok(text) => print!("{text}"),
                Err(e) => {
                    eprintln!("error: failed to render config: {e}");
                    std::process::exit(1);
                }
            },
        },
    }
}

/// Command-line flags win over file and environment settings.
fn apply_overrides(config: &mut ChatlineConfig, cli: &Cli) {
    if let Some(conversation) = &cli.conversation {
        config.session.conversation_id = Some(conversation.clone());
    }
    if cli.no_stream {
        config.session.streaming = false;
    }
}

/// Logs go to stderr so they never interleave with streamed answers.
fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("chatline={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn binary_loads_config_defaults() {
        let config = chatline_config::load_and_validate_str("")
            .expect("default config should be valid");
        assert!(config.session.streaming);
    }

    #[test]
    fn parses_send_with_global_flags() {
        let cli = Cli::parse_from(["chatline", "send", "hello there", "--no-stream"]);
        assert!(cli.no_stream);
        assert!(matches!(cli.command, Some(Commands::Send { ref text }) if text == "hello there"));
    }

    #[test]
    fn no_subcommand_means_chat() {
        let cli = Cli::parse_from(["chatline"]);
        assert!(cli.command.is_none());
        assert!(cli.config.is_none());
    }

    #[test]
    fn overrides_apply_to_loaded_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[session]\nstreaming = true").unwrap();
        let mut config = chatline_config::load_and_validate_path(file.path()).unwrap();

        let cli = Cli::parse_from(["chatline", "--conversation", "c-9", "--no-stream", "chat"]);
        apply_overrides(&mut config, &cli);
        assert_eq!(config.session.conversation_id.as_deref(), Some("c-9"));
        assert!(!config.session.streaming);
    }
}
