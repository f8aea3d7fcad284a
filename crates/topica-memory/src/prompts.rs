// SPDX-FileCopyrightText: 2026 Topica Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prompt templates for the memory engine's LLM calls.

/// Fact extraction from a single user turn.
pub fn extract_facts(user_turn: &str) -> String {
    format!(
        "Extract durable facts about the user from their message.\n\
         Only record concrete values the user actually stated: name, age, location, \
         occupation, employer, relationships, long-term goals, strong preferences, \
         health conditions. Do not invent values and do not record placeholders.\n\
         Rate each fact's importance and permanence from 1 to 10:\n\
         10 = identity-level and stable (name, birthplace)\n\
         7-9 = long-lasting (job, family, chronic conditions, long-term goals)\n\
         4-6 = medium-term (current project, short-term plans)\n\
         1-3 = temporary (today's mood, what they are eating)\n\
         Return an empty list when the message contains no such facts.\n\n\
         User message:\n{user_turn}"
    )
}

/// Combined label and summary for a closed topic.
pub fn close_topic(transcript: &str) -> String {
    format!(
        "Read the conversation below and produce:\n\
         - label: a two to four word name for its subject\n\
         - summary: two to four sentences covering what the user wanted, the key \
         information exchanged, and any conclusion reached.\n\n\
         Conversation:\n{transcript}"
    )
}

/// LLM confirmation of a suspected topic shift.
pub fn topic_switch(recent: &str, message: &str) -> String {
    format!(
        "Decide whether the new message starts a different topic from the recent \
         conversation. Follow-up questions, clarifications, and related sub-questions \
         are the same topic. Set switch to true only when the subject clearly changes; \
         when it does, give the new topic a short name.\n\n\
         Recent conversation:\n{recent}\n\n\
         New message:\n{message}"
    )
}

/// Notepad reflection at session end.
pub fn reflect_notepad(current_notepad: &str, topics: &str) -> String {
    let current = if current_notepad.trim().is_empty() {
        "(empty)"
    } else {
        current_notepad
    };
    format!(
        "You keep a short notepad of guidelines for talking with this user: how they \
         like answers formatted, what level of detail they want, things to avoid. \
         Review the recent conversations and rewrite the notepad. Keep guidelines that \
         still hold, add new ones the conversations support, and drop ones that were \
         contradicted. Do not record facts about the user; those are stored elsewhere. \
         Return plain text.\n\n\
         Current notepad:\n{current}\n\n\
         Recent conversations:\n{topics}"
    )
}

/// Compression of an oversized notepad.
pub fn compress_notepad(notepad: &str, max_chars: usize) -> String {
    format!(
        "The notepad below is too long. Rewrite it in under {max_chars} characters, \
         merging duplicate guidelines and keeping the most useful ones. Return plain \
         text.\n\n\
         Notepad:\n{notepad}"
    )
}
