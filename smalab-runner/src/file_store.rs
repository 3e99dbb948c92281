//! JSON file implementation of the session state store.
//!
//! - State: `{dir}/{SYMBOL}_State.json`, pretty JSON
//! - Marker: `{dir}/SESSION`, containing the active symbol
//!
//! Saves write `.tmp`, sync, then rename over the target, so a crash leaves
//! either the old or the new state on disk.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

use smalab_core::state::{SessionState, StateStore, StoreError};

use crate::paths::{marker_path, SessionPaths};

#[derive(Debug, Clone)]
pub struct JsonFileStore {
    paths: SessionPaths,
}

impl JsonFileStore {
    pub fn new(paths: SessionPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &SessionPaths {
        &self.paths
    }

    pub fn exists(&self) -> bool {
        self.paths.state().is_file()
    }
}

impl StateStore for JsonFileStore {
    fn load(&self) -> Result<SessionState, StoreError> {
        let path = self.paths.state();
        let json = match fs::read_to_string(&path) {
            Ok(json) => json,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::Missing(path.display().to_string()));
            }
            Err(e) => return Err(StoreError::Io(e)),
        };
        let state: SessionState = serde_json::from_str(&json)
            .map_err(|e| StoreError::Corrupt(format!("{}: {e}", path.display())))?;
        if state.symbol != self.paths.symbol() {
            return Err(StoreError::Corrupt(format!(
                "{} holds state for '{}', expected '{}'",
                path.display(),
                state.symbol,
                self.paths.symbol()
            )));
        }
        Ok(state)
    }

    fn save(&mut self, state: &SessionState) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(state)
            .map_err(|e| StoreError::Corrupt(format!("cannot serialize state: {e}")))?;
        write_atomic(&self.paths.state(), json.as_bytes())?;
        Ok(())
    }

    fn clear_session_marker(&mut self) -> Result<(), StoreError> {
        // Only clear the marker if it still points at this symbol.
        if read_session_marker(self.paths.dir())?.as_deref() == Some(self.paths.symbol()) {
            remove_if_present(&self.paths.marker())?;
        }
        Ok(())
    }
}

/// Write `bytes` to `path` through a synced temp file and a rename.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = Path::new(&tmp_name);
    {
        let mut file = File::create(tmp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    fs::rename(tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(tmp_path);
        e
    })
}

/// Symbol of the active session, if any.
pub fn read_session_marker(dir: &Path) -> io::Result<Option<String>> {
    match fs::read_to_string(marker_path(dir)) {
        Ok(content) => {
            let symbol = content.trim();
            Ok((!symbol.is_empty()).then(|| symbol.to_string()))
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

pub fn write_session_marker(dir: &Path, symbol: &str) -> io::Result<()> {
    write_atomic(&marker_path(dir), symbol.as_bytes())
}

pub fn remove_if_present(path: &Path) -> io::Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}
