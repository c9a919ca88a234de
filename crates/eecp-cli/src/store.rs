use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A workspace this CLI has created or joined, remembered locally purely
/// for the `list` command — the server itself never persists anything
/// about a workspace once it is dropped from the in-memory registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RememberedWorkspace {
    pub workspace_id: Uuid,
    pub link: String,
    pub created_at: i64,
    pub expires_at: i64,
}

fn store_path() -> PathBuf {
    PathBuf::from(".eecp_workspaces.json")
}

pub fn load() -> Vec<RememberedWorkspace> {
    std::fs::read_to_string(store_path())
        .ok()
        .and_then(|contents| serde_json::from_str(&contents).ok())
        .unwrap_or_default()
}

pub fn remember(entry: RememberedWorkspace) -> anyhow::Result<()> {
    let mut all = load();
    all.retain(|w| w.workspace_id != entry.workspace_id);
    all.push(entry);
    std::fs::write(store_path(), serde_json::to_string_pretty(&all)?)?;
    Ok(())
}
