//! Converter configuration module.
//!
//! Handles loading, validating, and merging `config.toml`. Stock defaults are
//! overridden by the user's config file, which only needs the keys it wants
//! to change.
//!
//! ## Config File Location
//!
//! `config.toml` in the working directory, or any path given with `--config`.
//! A missing file means stock defaults.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [output]
//! format = "same"        # same | jpeg | png | webp | gif | bmp | tiff | svg | ico
//! quality = 0.9          # Lossy quality (0.1-1.0), JPEG and WebP only
//!
//! [resize]
//! enabled = false
//! # width = 1920         # Omit one side to keep the aspect ratio
//! # height = 1080
//!
//! [delivery]
//! archive_name = "converted_images.zip"
//!
//! [processing]
//! # max_processes = 4    # Thumbnail workers (omit for auto = CPU cores)
//! thumbnail_size = 48    # Queue thumbnail edge in pixels
//! ```
//!
//! ## Settings Precedence
//!
//! ```text
//! stock defaults → config.toml → last-used settings (store) → CLI flags
//! ```
//!
//! Only `[output]` and `[resize]` become [`ConversionSettings`]; the store
//! and CLI layers are applied on top of [`ConverterConfig::to_settings`].
//! The store only holds fields a previous run chose away from the config,
//! so editing a key here takes effect unless a flag overrode it since.
//!
//! Unknown keys are rejected to catch typos early.

use crate::delivery::DEFAULT_ARCHIVE_NAME;
use crate::format::FormatChoice;
use crate::imaging::{DEFAULT_THUMBNAIL_SIZE, Quality};
use crate::types::{AspectLock, ConversionSettings, ResizeSettings};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Default config filename looked up in the working directory.
pub const CONFIG_FILENAME: &str = "config.toml";

/// Lowest quality accepted in `config.toml`.
pub const MIN_QUALITY: f64 = 0.1;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Converter configuration loaded from `config.toml`.
///
/// All fields have defaults. Unknown keys are rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConverterConfig {
    /// Output format and quality.
    pub output: OutputConfig,
    /// Resize policy.
    pub resize: ResizeConfig,
    /// How multi-file results are delivered.
    pub delivery: DeliveryConfig,
    /// Worker and thumbnail settings.
    pub processing: ProcessingConfig,
}

impl ConverterConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_QUALITY..=1.0).contains(&self.output.quality) {
            return Err(ConfigError::Validation(
                "output.quality must be 0.1-1.0".into(),
            ));
        }
        if self.resize.width == Some(0) || self.resize.height == Some(0) {
            return Err(ConfigError::Validation(
                "resize.width and resize.height must be non-zero".into(),
            ));
        }
        if self.delivery.archive_name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "delivery.archive_name must not be empty".into(),
            ));
        }
        if self.processing.thumbnail_size == 0 {
            return Err(ConfigError::Validation(
                "processing.thumbnail_size must be non-zero".into(),
            ));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// The conversion settings this config describes.
    pub fn to_settings(&self) -> ConversionSettings {
        ConversionSettings {
            format: self.output.format,
            quality: Quality::new(self.output.quality),
            resize: ResizeSettings {
                enabled: self.resize.enabled,
                width: self.resize.width,
                height: self.resize.height,
            },
            aspect_lock: AspectLock::default(),
        }
    }
}

/// Output format settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Target format, or `"same"` to keep each source's format.
    pub format: FormatChoice,
    /// Lossy encoding quality, 0.1 (smallest) to 1.0 (best).
    pub quality: f64,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: FormatChoice::SameAsSource,
            quality: Quality::default().value(),
        }
    }
}

/// Resize settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResizeConfig {
    pub enabled: bool,
    /// Target width. Alone, the height follows the aspect ratio.
    pub width: Option<u32>,
    /// Target height. Alone, the width follows the aspect ratio.
    pub height: Option<u32>,
}

/// Delivery settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeliveryConfig {
    /// Filename of the archive used when more than one file is delivered.
    pub archive_name: String,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            archive_name: DEFAULT_ARCHIVE_NAME.to_string(),
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel thumbnail workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
    /// Edge length of the square queue thumbnails.
    pub thumbnail_size: u32,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            max_processes: None,
            thumbnail_size: DEFAULT_THUMBNAIL_SIZE,
        }
    }
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer for merging user overrides on top.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(ConverterConfig::default())
        .map_err(|e| ConfigError::Validation(format!("default config: {e}")))
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<ConverterConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: ConverterConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from the file at `path`.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(path: &Path) -> Result<ConverterConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(path)?;
    let config = resolve_config(base, overlay)?;
    tracing::debug!(path = %path.display(), ?config, "config loaded");
    Ok(config)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# imgbatch Configuration
# ======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Settings are layered, later layers winning:
#   stock defaults -> this file -> last-used settings -> command-line flags
#
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Output format
# ---------------------------------------------------------------------------
[output]
# Target format: same | jpeg | png | webp | gif | bmp | tiff | svg | ico
# "same" keeps each file's own format (unknown formats become JPEG).
format = "same"

# Lossy quality from 0.1 (smallest) to 1.0 (best). Used by JPEG only;
# the other encoders are lossless.
quality = 0.9

# ---------------------------------------------------------------------------
# Resize
# ---------------------------------------------------------------------------
[resize]
enabled = false
# Give both sides to stretch to an exact size, or one side to keep the
# aspect ratio. Applied after crop and rotation.
# width = 1920
# height = 1080

# ---------------------------------------------------------------------------
# Delivery
# ---------------------------------------------------------------------------
[delivery]
# Name of the archive written when more than one file is converted.
archive_name = "converted_images.zip"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel thumbnail workers. Conversion itself is sequential.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4

# Edge length in pixels of the square queue thumbnails.
thumbnail_size = 48
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::OutputFormat;
    use tempfile::TempDir;

    fn write_config(tmp: &TempDir, content: &str) -> std::path::PathBuf {
        let path = tmp.path().join(CONFIG_FILENAME);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn default_config_values() {
        let config = ConverterConfig::default();
        assert_eq!(config.output.format, FormatChoice::SameAsSource);
        assert_eq!(config.output.quality, 0.9);
        assert!(!config.resize.enabled);
        assert_eq!(config.delivery.archive_name, "converted_images.zip");
        assert_eq!(config.processing.thumbnail_size, 48);
        assert_eq!(config.processing.max_processes, None);
    }

    #[test]
    fn parse_partial_config() {
        let toml = r#"
[output]
format = "webp"
"#;
        let config: ConverterConfig = toml::from_str(toml).unwrap();
        // Overridden value
        assert_eq!(
            config.output.format,
            FormatChoice::Explicit(OutputFormat::WebP)
        );
        // Default values preserved
        assert_eq!(config.output.quality, 0.9);
        assert_eq!(config.delivery.archive_name, "converted_images.zip");
    }

    #[test]
    fn parse_resize_settings() {
        let toml = r#"
[resize]
enabled = true
width = 800
"#;
        let config: ConverterConfig = toml::from_str(toml).unwrap();
        assert!(config.resize.enabled);
        assert_eq!(config.resize.width, Some(800));
        assert_eq!(config.resize.height, None);
    }

    #[test]
    fn to_settings_carries_output_and_resize() {
        let config: ConverterConfig = toml::from_str(
            r#"
[output]
format = "png"
quality = 0.5

[resize]
enabled = true
height = 300
"#,
        )
        .unwrap();
        let settings = config.to_settings();
        assert_eq!(settings.format, FormatChoice::Explicit(OutputFormat::Png));
        assert_eq!(settings.quality.value(), 0.5);
        assert!(settings.resize.is_active());
        assert_eq!(settings.resize.height, Some(300));
        assert!(!settings.aspect_lock.locked);
    }

    // =========================================================================
    // load_config tests
    // =========================================================================

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(&tmp.path().join(CONFIG_FILENAME)).unwrap();
        assert_eq!(config, ConverterConfig::default());
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        let path = write_config(
            &tmp,
            r#"
[output]
format = "image/jpeg"
quality = 0.75

[delivery]
archive_name = "batch.zip"
"#,
        );

        let config = load_config(&path).unwrap();
        assert_eq!(
            config.output.format,
            FormatChoice::Explicit(OutputFormat::Jpeg)
        );
        assert_eq!(config.output.quality, 0.75);
        assert_eq!(config.delivery.archive_name, "batch.zip");
        // Unspecified values should be defaults
        assert_eq!(config.processing.thumbnail_size, 48);
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = write_config(&tmp, "this is not valid toml [[[");
        let result = load_config(&path);
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn load_config_unknown_format_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = write_config(&tmp, "[output]\nformat = \"psd\"\n");
        assert!(load_config(&path).is_err());
    }

    // =========================================================================
    // effective_threads tests
    // =========================================================================

    #[test]
    fn effective_threads_auto() {
        let config = ProcessingConfig::default();
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_threads(&config), cores);
    }

    #[test]
    fn effective_threads_clamped_to_cores() {
        let config = ProcessingConfig {
            max_processes: Some(100_000),
            ..Default::default()
        };
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_threads(&config), cores);
    }

    #[test]
    fn effective_threads_user_constrains_down() {
        let config = ProcessingConfig {
            max_processes: Some(1),
            ..Default::default()
        };
        assert_eq!(effective_threads(&config), 1);
    }

    // =========================================================================
    // merge_toml tests
    // =========================================================================

    #[test]
    fn merge_toml_scalar_override() {
        let base: toml::Value = toml::from_str(r#"quality = 0.9"#).unwrap();
        let overlay: toml::Value = toml::from_str(r#"quality = 0.7"#).unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged.get("quality").unwrap().as_float(), Some(0.7));
    }

    #[test]
    fn merge_toml_table_merge() {
        let base: toml::Value = toml::from_str(
            r#"
[output]
format = "same"
quality = 0.9
"#,
        )
        .unwrap();
        let overlay: toml::Value = toml::from_str(
            r#"
[output]
quality = 0.6
"#,
        )
        .unwrap();
        let merged = merge_toml(base, overlay);
        let output = merged.get("output").unwrap();
        assert_eq!(output.get("quality").unwrap().as_float(), Some(0.6));
        // format preserved from base
        assert_eq!(output.get("format").unwrap().as_str(), Some("same"));
    }

    #[test]
    fn merge_toml_adds_new_keys() {
        let base: toml::Value = toml::from_str("[resize]\nenabled = true\n").unwrap();
        let overlay: toml::Value = toml::from_str("[resize]\nwidth = 640\n").unwrap();
        let merged = merge_toml(base, overlay);
        let resize = merged.get("resize").unwrap();
        assert_eq!(resize.get("enabled").unwrap().as_bool(), Some(true));
        assert_eq!(resize.get("width").unwrap().as_integer(), Some(640));
    }

    // =========================================================================
    // Unknown key rejection tests
    // =========================================================================

    #[test]
    fn unknown_key_rejected() {
        let toml_str = r#"
[output]
qualty = 0.9
"#;
        let result: Result<ConverterConfig, _> = toml::from_str(toml_str);
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("unknown field"));
    }

    #[test]
    fn unknown_section_rejected() {
        let toml_str = r#"
[outputs]
quality = 0.9
"#;
        let result: Result<ConverterConfig, _> = toml::from_str(toml_str);
        assert!(result.is_err());
    }

    #[test]
    fn unknown_key_rejected_via_load_config() {
        let tmp = TempDir::new().unwrap();
        let path = write_config(&tmp, "[resize]\nwdth = 100\n");
        assert!(load_config(&path).is_err());
    }

    // =========================================================================
    // Validation tests
    // =========================================================================

    #[test]
    fn validate_quality_boundary_ok() {
        let mut config = ConverterConfig::default();
        config.output.quality = 0.1;
        assert!(config.validate().is_ok());
        config.output.quality = 1.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_quality_out_of_range() {
        let mut config = ConverterConfig::default();
        config.output.quality = 0.05;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
        config.output.quality = 1.5;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validate_zero_resize() {
        let mut config = ConverterConfig::default();
        config.resize.width = Some(0);
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validate_empty_archive_name() {
        let mut config = ConverterConfig::default();
        config.delivery.archive_name = "  ".into();
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validate_processing_values() {
        let mut config = ConverterConfig::default();
        config.processing.thumbnail_size = 0;
        assert!(config.validate().is_err());
        config.processing.thumbnail_size = 48;
        config.processing.max_processes = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_default_config_passes() {
        assert!(ConverterConfig::default().validate().is_ok());
    }

    #[test]
    fn resolve_config_rejects_invalid_values() {
        let base = stock_defaults_value().unwrap();
        let overlay: toml::Value = toml::from_str("[output]\nquality = 2.0\n").unwrap();
        let result = resolve_config(base, Some(overlay));
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    // =========================================================================
    // stock_config_toml tests
    // =========================================================================

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let config: ConverterConfig = toml::from_str(stock_config_toml()).unwrap();
        assert_eq!(config, ConverterConfig::default());
    }

    #[test]
    fn stock_config_toml_contains_all_sections() {
        let content = stock_config_toml();
        assert!(content.contains("[output]"));
        assert!(content.contains("[resize]"));
        assert!(content.contains("[delivery]"));
        assert!(content.contains("[processing]"));
    }

    #[test]
    fn stock_defaults_value_has_all_sections() {
        let val = stock_defaults_value().unwrap();
        assert!(val.is_table());
        assert!(val.get("output").is_some());
        assert!(val.get("resize").is_some());
        assert!(val.get("delivery").is_some());
        assert!(val.get("processing").is_some());
    }
}
