// SPDX-FileCopyrightText: 2026 Topica Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Response prompt assembly.
//!
//! Long-term context comes first (profile, notepad, past sessions), then the
//! current session from oldest to newest, then the query. Empty sections
//! are left out.

use std::fmt::Write;

use topica_memory::types::format_transcript;
use topica_memory::{LongTermContext, ShortTermContext};

/// Build the prompt for the response-generation call.
pub fn build_response_prompt(
    system_prompt: &str,
    short_term: &ShortTermContext,
    long_term: &LongTermContext,
    query: &str,
) -> String {
    let mut prompt = String::new();
    if !system_prompt.trim().is_empty() {
        prompt.push_str(system_prompt.trim());
        prompt.push_str("\n\n");
    }

    if !long_term.facts.is_empty() {
        prompt.push_str("=== User Profile ===\n");
        for (key, value) in &long_term.facts {
            let _ = writeln!(prompt, "- {key}: {value}");
        }
        prompt.push('\n');
    }

    if !long_term.notepad.trim().is_empty() {
        let _ = writeln!(
            prompt,
            "=== Interaction Guidelines (Notepad) ===\n{}\n",
            long_term.notepad.trim()
        );
    }

    if !long_term.topics.is_empty() {
        prompt.push_str("=== Relevant Past Topics (Previous Sessions) ===\n");
        for topic in &long_term.topics {
            let _ = writeln!(prompt, "- {}: {}", topic.digest.name, topic.digest.summary);
        }
        prompt.push('\n');
    }

    if !short_term.closed.is_empty() {
        prompt.push_str("=== Previous Topics (Current Session) ===\n");
        for digest in &short_term.closed {
            let _ = writeln!(prompt, "- {}: {}", digest.name, digest.summary);
        }
        prompt.push('\n');
    }

    if !short_term.threads.is_empty() {
        prompt.push_str("=== Relevant Topics (Current Session) ===\n");
        for thread in &short_term.threads {
            let _ = writeln!(
                prompt,
                "Topic: {}\nSummary: {}\nConversation thread:\n{}\n",
                thread.digest.name,
                thread.digest.summary,
                format_transcript(&thread.exchanges)
            );
        }
    }

    if !short_term.current.is_empty() {
        let _ = writeln!(
            prompt,
            "=== Recent Conversation ===\n{}\n",
            format_transcript(&short_term.current)
        );
    }

    let _ = write!(prompt, "User: {query}\nAssistant:");
    prompt
}
