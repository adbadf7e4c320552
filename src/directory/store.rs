//! Directory persistence and the shared snapshot handed to request handlers.

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, RwLock};
use tracing::{info, warn};

use super::DeviceDirectory;

/// Reads and writes the directory document as pretty-printed JSON.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    path: PathBuf,
}

impl DirectoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load the directory, tolerating a missing or corrupt file.
    ///
    /// Anything that cannot be read as a directory document is replaced by
    /// an empty directory. Startup never fails because of this file.
    pub fn load(&self) -> DeviceDirectory {
        if !self.path.exists() {
            info!(path = %self.path.display(), "No directory file, starting empty");
            return DeviceDirectory::default();
        }

        match self.read_document() {
            Ok(directory) => {
                info!(
                    path = %self.path.display(),
                    devices = directory.devices.len(),
                    areas = directory.areas.len(),
                    "Directory loaded"
                );
                directory
            }
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Directory file unreadable, resetting to empty directory"
                );
                DeviceDirectory::default()
            }
        }
    }

    fn read_document(&self) -> Result<DeviceDirectory> {
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        serde_json::from_str(&contents).context("Failed to parse directory JSON")
    }

    /// Write the directory atomically: temp file, fsync, rename.
    pub fn save(&self, directory: &DeviceDirectory) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create directory {}", parent.display())
                })?;
            }
        }

        let json = serde_json::to_string_pretty(directory)
            .context("Failed to serialize directory")?;

        let tmp_path = self.path.with_extension("tmp");
        {
            let mut file =
                File::create(&tmp_path).context("Failed to create temporary directory file")?;
            file.write_all(json.as_bytes())
                .context("Failed to write directory file")?;
            file.sync_all()
                .context("Failed to sync directory file to disk")?;
        }

        fs::rename(&tmp_path, &self.path).context("Failed to rename temporary directory file")?;
        Ok(())
    }
}

/// Copy-on-write directory shared between requests.
///
/// Readers take an `Arc` snapshot and keep it for the whole request, so a
/// concurrent update never shows them a half-written directory. Writers are
/// serialized, persist the modified copy, then swap it in.
pub struct SharedDirectory {
    store: Option<DirectoryStore>,
    current: RwLock<Arc<DeviceDirectory>>,
    writer: Mutex<()>,
}

impl SharedDirectory {
    /// Load from `store` and keep it for write-through.
    pub fn open(store: DirectoryStore) -> Self {
        let directory = store.load();
        Self {
            store: Some(store),
            current: RwLock::new(Arc::new(directory)),
            writer: Mutex::new(()),
        }
    }

    /// Directory with no backing file; updates stay in memory.
    pub fn in_memory(directory: DeviceDirectory) -> Self {
        Self {
            store: None,
            current: RwLock::new(Arc::new(directory)),
            writer: Mutex::new(()),
        }
    }

    pub fn snapshot(&self) -> Arc<DeviceDirectory> {
        Arc::clone(&self.current.read().expect("Directory lock poisoned"))
    }

    /// Re-read the backing file. No-op for in-memory directories.
    pub fn reload(&self) -> Arc<DeviceDirectory> {
        let _guard = self.writer.lock().expect("Directory writer lock poisoned");
        if let Some(store) = &self.store {
            let fresh = Arc::new(store.load());
            *self.current.write().expect("Directory lock poisoned") = Arc::clone(&fresh);
            return fresh;
        }
        self.snapshot()
    }

    /// Apply `change` to a copy, persist it, then publish it.
    ///
    /// If persisting fails the published directory is left unchanged.
    pub fn update<T>(&self, change: impl FnOnce(&mut DeviceDirectory) -> T) -> Result<T> {
        let _guard = self.writer.lock().expect("Directory writer lock poisoned");

        let mut next = (*self.snapshot()).clone();
        let outcome = change(&mut next);

        if let Some(store) = &self.store {
            store.save(&next)?;
        }

        *self.current.write().expect("Directory lock poisoned") = Arc::new(next);
        Ok(outcome)
    }

    pub fn upsert_device(&self, name: &str, entity_id: &str) -> Result<()> {
        self.update(|d| d.upsert_device(name, entity_id))
    }

    pub fn upsert_area(&self, name: &str, area_id: &str) -> Result<()> {
        self.update(|d| d.upsert_area(name, area_id))
    }

    pub fn remove_device(&self, name: &str) -> Result<bool> {
        self.update(|d| d.remove_device(name))
    }

    pub fn remove_area(&self, name: &str) -> Result<bool> {
        self.update(|d| d.remove_area(name))
    }

    pub fn set_presence_entity(&self, entity_id: &str) -> Result<()> {
        self.update(|d| d.presence_entity = Some(entity_id.to_string()))
    }
}
