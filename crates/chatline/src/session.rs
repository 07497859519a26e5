// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wires the transports and the pipeline from configuration and binds a
//! conversation.

use std::sync::Arc;

use chatline_channel::{ChannelManager, ChannelOptions};
use chatline_config::ChatlineConfig;
use chatline_core::{ChatError, PipelineHooks};
use chatline_fallback::HttpFallback;
use chatline_pipeline::{MessagePipeline, PipelineOptions};
use colored::Colorize;
use tracing::info;

/// Prints side signals to the terminal.
struct ConsoleHooks;

impl PipelineHooks for ConsoleHooks {
    fn on_checkout(&self, url: &str) {
        println!("{} {}", "checkout:".bold().yellow(), url.underline());
    }

    fn on_conversation_started(&self, conversation_id: &str) {
        println!("{}", format!("conversation {conversation_id} started").dimmed());
    }
}

/// Builds a pipeline bound to the configured (or a freshly created)
/// conversation.
pub async fn connect(config: &ChatlineConfig) -> Result<Arc<MessagePipeline>, ChatError> {
    let fallback = HttpFallback::from_config(config)?;
    let channel = ChannelManager::new(ChannelOptions::from_config(config));
    let pipeline = Arc::new(MessagePipeline::new(
        Arc::new(channel),
        Arc::new(fallback.clone()),
        Arc::new(ConsoleHooks),
        PipelineOptions::from_config(config),
    ));

    match &config.session.conversation_id {
        Some(conversation_id) => {
            info!(conversation_id = %conversation_id, "resuming conversation");
            pipeline.set_conversation(conversation_id).await?;
        }
        None => {
            let session_id = config
                .session
                .session_id
                .clone()
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
            pipeline
                .start_conversation(
                    &fallback.conversations(),
                    &session_id,
                    config.session.organization_id.as_deref(),
                )
                .await?;
        }
    }
    Ok(pipeline)
}
