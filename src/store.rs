//! Last-used settings persistence.
//!
//! Only the settings the user chose away from `config.toml` are kept, as a
//! [`SavedSettings`] overlay. Each run starts from the config, applies the
//! overlay, then the command-line flags, so later config edits still take
//! effect for every field the user never overrode.
//!
//! Persistence is best-effort: [`recall`] and [`persist`] log failures and
//! carry on as if nothing was stored.

use crate::format::FormatChoice;
use crate::imaging::Quality;
use crate::types::{AspectLock, ConversionSettings, ResizeSettings};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default location of the settings file, relative to the working directory.
pub const DEFAULT_STATE_FILE: &str = ".imgbatch-settings.json";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Settings that differ from the config they were chosen against.
///
/// `None` fields follow the config.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SavedSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<FormatChoice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<Quality>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resize: Option<ResizeSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aspect_lock: Option<AspectLock>,
}

impl SavedSettings {
    /// Record every field of `chosen` that differs from `base`.
    pub fn diff(base: &ConversionSettings, chosen: &ConversionSettings) -> Self {
        fn changed<T: PartialEq + Copy>(base: T, chosen: T) -> Option<T> {
            (base != chosen).then_some(chosen)
        }
        Self {
            format: changed(base.format, chosen.format),
            quality: changed(base.quality, chosen.quality),
            resize: changed(base.resize, chosen.resize),
            aspect_lock: changed(base.aspect_lock, chosen.aspect_lock),
        }
    }

    /// Lay the saved fields over `base`.
    pub fn apply(&self, base: ConversionSettings) -> ConversionSettings {
        ConversionSettings {
            format: self.format.unwrap_or(base.format),
            quality: self.quality.unwrap_or(base.quality),
            resize: self.resize.unwrap_or(base.resize),
            aspect_lock: self.aspect_lock.unwrap_or(base.aspect_lock),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Key-value persistence for the last-used settings.
pub trait SettingsStore {
    /// `Ok(None)` when nothing has been stored yet.
    fn load(&self) -> Result<Option<SavedSettings>, StoreError>;
    fn save(&self, settings: &SavedSettings) -> Result<(), StoreError>;
}

/// Stores settings as pretty-printed JSON in one file.
#[derive(Debug, Clone)]
pub struct JsonSettingsStore {
    path: PathBuf,
}

impl JsonSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for JsonSettingsStore {
    fn load(&self) -> Result<Option<SavedSettings>, StoreError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    fn save(&self, settings: &SavedSettings) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(settings)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

/// Load stored settings, treating any failure as nothing stored.
pub fn recall(store: &dyn SettingsStore) -> SavedSettings {
    match store.load() {
        Ok(saved) => saved.unwrap_or_default(),
        Err(e) => {
            tracing::warn!(error = %e, "ignoring unreadable saved settings");
            SavedSettings::default()
        }
    }
}

/// Save the part of `chosen` that differs from `base`, logging a failure
/// instead of returning it.
pub fn persist(store: &dyn SettingsStore, base: &ConversionSettings, chosen: &ConversionSettings) {
    let saved = SavedSettings::diff(base, chosen);
    if let Err(e) = store.save(&saved) {
        tracing::warn!(error = %e, "could not save settings");
    }
}
