// SPDX-FileCopyrightText: 2026 Topica Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `topica forget` command implementation.

use topica_config::TopicaConfig;
use topica_core::TopicaError;
use topica_memory::store::validate_username;
use topica_memory::{ClearScope, FileStore, MemoryStorage};
use tracing::info;

/// Clears the selected parts of a user's long-term memory on disk.
pub async fn run_forget(
    config: &TopicaConfig,
    username: &str,
    scope: ClearScope,
) -> Result<(), TopicaError> {
    validate_username(username)?;
    let store = FileStore::new(&config.storage.data_dir);
    store.clear_user(username, scope).await?;
    info!(user = username, ?scope, "long-term memory cleared");
    println!("cleared {} for {username}", describe(scope));
    Ok(())
}

fn describe(scope: ClearScope) -> String {
    if scope == ClearScope::ALL {
        return "all long-term memory".into();
    }
    let mut parts = Vec::new();
    if scope.facts {
        parts.push("facts");
    }
    if scope.topics {
        parts.push("archived topics");
    }
    if scope.notepad {
        parts.push("notepad");
    }
    parts.join(" and ")
}
