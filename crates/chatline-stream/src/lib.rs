// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transport-agnostic stream handling for Chatline.
//!
//! Decodes wire deltas ([`parser`]), describes channel frames ([`frame`]),
//! folds chunks into messages ([`assembler`]), and runs a whole turn with
//! timeout and cancellation ([`drive`]).

pub mod assembler;
pub mod drive;
pub mod frame;
pub mod parser;

pub use assembler::{Fold, StreamAssembler};
pub use drive::{DriveOptions, drive_turn};
pub use frame::{AgentPayload, InboundFrame, OutboundFrame};
pub use parser::{Record, parse_frame, parse_line, parse_record};
