// SPDX-FileCopyrightText: 2026 Topica Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session orchestration for Topica.
//!
//! [`SessionOrchestrator`] owns a user's session and long-term memory and
//! drives the per-turn protocol over the components in `topica-memory`.

pub mod context;
pub mod session;

pub use session::{
    FALLBACK_RESPONSE, Session, SessionOrchestrator, SessionReport, SessionState, TurnContext,
    TurnOutcome,
};
