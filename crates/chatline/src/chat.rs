// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `chatline chat` and `chatline send` command implementations.
//!
//! The REPL renders each agent answer while it streams, by watching the
//! message log alongside the in-flight send.

use std::io;

use chatline_config::ChatlineConfig;
use chatline_core::ChatError;
use chatline_pipeline::{MessagePipeline, SendOutcome};
use colored::Colorize;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::warn;

use crate::render::TurnPrinter;
use crate::session;

/// Runs the interactive REPL until `/quit`, Ctrl+C or Ctrl+D.
pub async fn run_chat(config: ChatlineConfig) -> Result<(), ChatError> {
    let pipeline = session::connect(&config).await?;

    let mut rl = DefaultEditor::new()
        .map_err(|e| ChatError::Internal(format!("failed to initialize readline: {e}")))?;

    println!("{}", "chatline".bold().green());
    println!("Type {} to exit.\n", "/quit".yellow());

    let prompt = format!("{}> ", "you".green());
    loop {
        match rl.readline(&prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed == "/quit" || trimmed == "/exit" {
                    break;
                }
                if trimmed.is_empty() {
                    continue;
                }
                if trimmed == "/status" {
                    print_status(&pipeline);
                    continue;
                }

                let _ = rl.add_history_entry(&line);
                match stream_turn(&pipeline, trimmed).await {
                    Ok(SendOutcome::Busy) => {
                        eprintln!("{}", "still answering the previous message".yellow());
                    }
                    Ok(_) => {}
                    Err(e) => {
                        eprintln!("{}: {e}", "error".red());
                    }
                }
            }
            Err(ReadlineError::Interrupted) => break,
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("{}: {e}", "error".red());
                break;
            }
        }
    }

    pipeline.shutdown().await;
    println!("{}", "goodbye".dimmed());
    Ok(())
}

/// Sends one message, prints the answer, and exits.
///
/// Returns `false` when the turn failed.
pub async fn run_send(config: ChatlineConfig, text: &str) -> Result<bool, ChatError> {
    let pipeline = session::connect(&config).await?;
    wait_for_channel(&pipeline, &config).await;
    let outcome = stream_turn(&pipeline, text).await?;
    pipeline.shutdown().await;
    Ok(matches!(outcome, SendOutcome::Completed(_) | SendOutcome::Ignored))
}

/// Sends `text` and renders the answer as it grows.
async fn stream_turn(pipeline: &MessagePipeline, text: &str) -> Result<SendOutcome, ChatError> {
    let mut log = pipeline.subscribe();
    let mut printer = TurnPrinter::new(log.borrow_and_update().len());
    let mut stdout = io::stdout();
    let render_err = |e: io::Error| ChatError::Internal(format!("failed to write output: {e}"));

    print!("{}", "agent> ".cyan());
    let send = pipeline.send_message(text);
    tokio::pin!(send);
    let outcome = loop {
        tokio::select! {
            outcome = &mut send => break outcome,
            changed = log.changed() => {
                if changed.is_err() {
                    break (&mut send).await;
                }
                let snapshot = log.borrow_and_update().clone();
                printer.render(&snapshot, &mut stdout).map_err(render_err)?;
            }
        }
    };
    printer
        .render(&pipeline.log(), &mut stdout)
        .map_err(render_err)?;
    if !printer.has_output() {
        print!("{}", "(no answer)".dimmed());
    }
    println!();

    if let SendOutcome::Failed(e) = &outcome {
        warn!(error = %e, "turn failed");
    }
    Ok(outcome)
}

/// Gives a freshly opened channel a moment to connect so short one-shot
/// sends still stream over it. Falls through to the fallback otherwise.
async fn wait_for_channel(pipeline: &MessagePipeline, config: &ChatlineConfig) {
    if !config.session.streaming {
        return;
    }
    let mut state = pipeline.subscribe_channel();
    let connected = tokio::time::timeout(
        config.transport.connect_timeout(),
        state.wait_for(|s| s.connected || s.is_terminal()),
    )
    .await;
    if connected.is_err() {
        warn!("channel not connected yet, using fallback");
    }
}

fn print_status(pipeline: &MessagePipeline) {
    let state = pipeline.channel_state();
    println!(
        "{} phase={} connected={} reconnect_attempt={} messages={}",
        "status:".dimmed(),
        state.phase,
        state.connected,
        state.reconnect_attempt,
        pipeline.log().len()
    );
}
