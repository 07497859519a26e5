// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Incremental terminal rendering of one agent turn.

use std::io::{self, Write};

use chatline_core::Role;
use chatline_pipeline::MessageLog;

/// Prints the agent's answer as the log grows, writing only what is new.
///
/// Content normally only grows, so each render writes the unseen suffix.
/// When a message is replaced by one that does not extend it (a failed turn
/// turning into the apology), the replacement is printed on a fresh line.
pub struct TurnPrinter {
    /// Log entries before this index belong to earlier turns.
    base: usize,
    current: Option<String>,
    printed: String,
}

impl TurnPrinter {
    /// Starts rendering after the first `base` log entries.
    pub fn new(base: usize) -> Self {
        Self {
            base,
            current: None,
            printed: String::new(),
        }
    }

    pub fn render(&mut self, log: &MessageLog, out: &mut impl Write) -> io::Result<()> {
        let fresh = log.messages().get(self.base..).unwrap_or_default();
        for message in fresh.iter().filter(|m| m.role == Role::Agent) {
            if self.current.as_deref() != Some(message.id.as_str()) {
                if self.current.is_some() {
                    writeln!(out)?;
                }
                self.current = Some(message.id.clone());
                self.printed.clear();
            }
            match message.content.strip_prefix(self.printed.as_str()) {
                Some(rest) => write!(out, "{rest}")?,
                None => write!(out, "\n{}", message.content)?,
            }
            self.printed.clone_from(&message.content);
        }
        out.flush()
    }

    /// Whether anything was written for this turn.
    pub fn has_output(&self) -> bool {
        self.current.is_some()
    }
}
