//! Persisted recalculation snapshot.
//!
//! A full recalculation fetches every done/verified order plus its history,
//! which is expensive against a rate-limited upstream. The result is written
//! to a JSON file and read back on later runs until a recalculation is
//! forced. A missing or unreadable file simply forces the full fetch.

use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

use crate::upstream::types::{Order, StatusEvent};

/// One order together with its fetched history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotEntry {
  pub order: Order,
  pub history: Vec<StatusEvent>,
}

/// Read a previously persisted snapshot. `None` means the caller must do a
/// full recalculation; a corrupt file is treated the same as a missing one.
pub fn load(path: &Path) -> Option<Vec<SnapshotEntry>> {
  let contents = std::fs::read_to_string(path).ok()?;
  match serde_json::from_str(&contents) {
    Ok(entries) => Some(entries),
    Err(err) => {
      warn!(path = %path.display(), %err, "snapshot file unreadable, forcing recalculation");
      None
    }
  }
}

pub fn store(path: &Path, entries: &[SnapshotEntry]) -> Result<()> {
  let contents = serde_json::to_string(entries)
    .map_err(|e| eyre!("Failed to serialize snapshot: {}", e))?;
  std::fs::write(path, contents)
    .map_err(|e| eyre!("Failed to write snapshot {}: {}", path.display(), e))?;
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  fn entry(number: &str) -> SnapshotEntry {
    SnapshotEntry {
      order: Order {
        id: "1".into(),
        number: number.into(),
        created_raw: "2026-01-01T00:00".into(),
        note: String::new(),
        location: String::new(),
        technician: "BUDI".into(),
        status: "DONE".into(),
      },
      history: vec![StatusEvent {
        status: "FOLLOW UP".into(),
        event_time_raw: "2026-01-01T00:00".into(),
        recorded_at_raw: String::new(),
        actor: "tech".into(),
      }],
    }
  }

  #[test]
  fn round_trips_through_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("snapshot.json");

    store(&path, &[entry("SO-1"), entry("SO-2")]).unwrap();
    let loaded = load(&path).unwrap();
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded[0].order.number, "SO-1");
    assert_eq!(loaded[0].history.len(), 1);
  }

  #[test]
  fn missing_file_returns_none() {
    let dir = tempfile::tempdir().unwrap();
    assert!(load(&dir.path().join("absent.json")).is_none());
  }

  #[test]
  fn corrupt_file_returns_none() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("snapshot.json");
    std::fs::write(&path, "{ not json").unwrap();
    assert!(load(&path).is_none());
  }
}
