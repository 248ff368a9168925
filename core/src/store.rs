//! Persistence of the last selected device
//!
//! A single JSON record in the data dir. It holds the device ID in clear
//! text, the same as the child app shows it to the operator.

use std::io;
use std::net::IpAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::protocol::constants::SELECTION_FILE;
use crate::{Error, Result};

/// The device the operator last picked, with the identifier they entered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedDevice {
    pub display_name: String,
    pub address: IpAddr,
    pub device_id: String,
}

/// Reads and writes the selection file
#[derive(Debug, Clone)]
pub struct SelectionStore {
    path: PathBuf,
}

impl SelectionStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(SELECTION_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored selection; a missing file means no selection
    pub fn load(&self) -> Result<Option<SelectedDevice>> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(Error::Store(format!("failed to read {}: {}", self.path.display(), e)))
            }
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    pub fn save(&self, device: &SelectedDevice) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::Store(format!("failed to create {}: {}", parent.display(), e))
            })?;
        }
        let json = serde_json::to_vec_pretty(device)?;
        std::fs::write(&self.path, json)
            .map_err(|e| Error::Store(format!("failed to write {}: {}", self.path.display(), e)))?;
        tracing::debug!("saved device selection to {}", self.path.display());
        Ok(())
    }

    /// Forget the stored selection. Clearing twice is not an error.
    pub fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Store(format!(
                "failed to remove {}: {}",
                self.path.display(),
                e
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SelectedDevice {
        SelectedDevice {
            display_name: "Child Device: 192.168.1.20".to_string(),
            address: "192.168.1.20".parse().unwrap(),
            device_id: "device-42".to_string(),
        }
    }

    #[test]
    fn test_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = SelectionStore::new(dir.path());
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_save_load_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = SelectionStore::new(&dir.path().join("nested"));

        store.save(&sample()).unwrap();
        assert_eq!(store.load().unwrap(), Some(sample()));

        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
        store.clear().unwrap();
    }

    #[test]
    fn test_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = SelectionStore::new(dir.path());
        std::fs::write(store.path(), b"{not json").unwrap();

        assert!(matches!(store.load(), Err(Error::Serialization(_))));
    }
}
