//! JSON snapshots of the full ledger state.
//!
//! A snapshot is written to a sibling temporary file and renamed into place,
//! so a crash mid-write leaves the previous snapshot intact.

use std::path::{Path, PathBuf};

use fundrelay_chain::LedgerState;

use crate::NodeError;

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write `state` to `path`, replacing any previous snapshot.
pub fn save_snapshot(path: &Path, state: &LedgerState) -> Result<(), NodeError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let bytes = serde_json::to_vec(state)?;
    let tmp = temp_path(path);
    std::fs::write(&tmp, &bytes)?;
    std::fs::rename(&tmp, path)?;
    tracing::debug!(
        path = %path.display(),
        bytes = bytes.len(),
        events = state.events.len(),
        "snapshot written"
    );
    Ok(())
}

/// Read a snapshot. `Ok(None)` when no snapshot exists yet.
pub fn load_snapshot(path: &Path) -> Result<Option<LedgerState>, NodeError> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut state: LedgerState = serde_json::from_slice(&bytes)?;
    state.reindex();
    Ok(Some(state))
}
