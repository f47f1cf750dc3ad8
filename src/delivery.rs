//! Result delivery.
//!
//! Hands the batch results to a [`DownloadSink`]:
//!
//! | Results | Delivery |
//! |---|---|
//! | 0 | [`DeliveryError::NothingToDeliver`] |
//! | 1 | saved directly under its own filename |
//! | 2+ | packed into one archive, saved under the archive name |
//!
//! Archive entries keep queue order. Repeated filenames are numbered
//! (`a_converted.png`, `a_converted-2.png`) so no entry overwrites another.

use crate::naming::disambiguate;
use crate::types::ConversionResult;
use std::collections::HashSet;
use std::io::{Cursor, Seek, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use zip::CompressionMethod;
use zip::write::{SimpleFileOptions, ZipWriter};

/// Archive filename used when none is configured.
pub const DEFAULT_ARCHIVE_NAME: &str = "converted_images.zip";

#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("no converted images to deliver")]
    NothingToDeliver,
    #[error("multiple results need an archive packager, none is available")]
    PackagerUnavailable,
    #[error("archive error: {0}")]
    Archive(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Where delivered files end up.
pub trait DownloadSink {
    /// Save one file, returning where it was written.
    fn save(&self, filename: &str, data: &[u8]) -> std::io::Result<PathBuf>;
}

/// Packs several results into one archive.
pub trait ArchivePackager {
    /// Pack `entries` in order. Entry names are already unique.
    fn package(&self, entries: &[ConversionResult]) -> Result<Vec<u8>, DeliveryError>;
}

/// Writes files into a directory, creating it on first use.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl DownloadSink for DirectorySink {
    fn save(&self, filename: &str, data: &[u8]) -> std::io::Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        // Only the final component, so a name cannot escape the directory.
        let name = Path::new(filename)
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| DEFAULT_ARCHIVE_NAME.into());
        let path = self.dir.join(name);
        std::fs::write(&path, data)?;
        Ok(path)
    }
}

/// Deflate-compressed ZIP archives.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipPackager;

impl ArchivePackager for ZipPackager {
    fn package(&self, entries: &[ConversionResult]) -> Result<Vec<u8>, DeliveryError> {
        write_zip(Cursor::new(Vec::new()), entries).map(Cursor::into_inner)
    }
}

/// Write `entries` as a ZIP archive into `out`. Every failure, including
/// one from `out` itself, is an [`DeliveryError::Archive`].
fn write_zip<W: Write + Seek>(out: W, entries: &[ConversionResult]) -> Result<W, DeliveryError> {
    let mut writer = ZipWriter::new(out);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for entry in entries {
        let entry_error = |e: &dyn std::fmt::Display| {
            DeliveryError::Archive(format!("{}: {e}", entry.filename))
        };
        writer
            .start_file(entry.filename.as_str(), options)
            .map_err(|e| entry_error(&e))?;
        writer.write_all(&entry.data).map_err(|e| entry_error(&e))?;
    }

    writer
        .finish()
        .map_err(|e| DeliveryError::Archive(e.to_string()))
}

/// What [`deliver`] produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Single {
        filename: String,
        path: PathBuf,
        bytes: u64,
    },
    Archive {
        filename: String,
        path: PathBuf,
        entries: usize,
        bytes: u64,
    },
}

/// Deliver `results` through `sink`, archiving when there is more than one.
pub fn deliver(
    results: &[ConversionResult],
    sink: &dyn DownloadSink,
    packager: Option<&dyn ArchivePackager>,
    archive_name: &str,
) -> Result<Delivery, DeliveryError> {
    match results {
        [] => Err(DeliveryError::NothingToDeliver),
        [only] => {
            let path = sink.save(&only.filename, &only.data)?;
            tracing::info!(file = %only.filename, path = %path.display(), "saved");
            Ok(Delivery::Single {
                filename: only.filename.clone(),
                path,
                bytes: only.data.len() as u64,
            })
        }
        many => {
            let packager = packager.ok_or(DeliveryError::PackagerUnavailable)?;
            let entries = unique_entries(many);
            let archive = packager.package(&entries)?;
            let path = sink.save(archive_name, &archive)?;
            tracing::info!(
                archive = archive_name,
                entries = entries.len(),
                path = %path.display(),
                "archive saved"
            );
            Ok(Delivery::Archive {
                filename: archive_name.to_string(),
                path,
                entries: entries.len(),
                bytes: archive.len() as u64,
            })
        }
    }
}

fn unique_entries(results: &[ConversionResult]) -> Vec<ConversionResult> {
    let mut taken = HashSet::new();
    results
        .iter()
        .map(|r| ConversionResult {
            filename: disambiguate(&r.filename, &mut taken),
            data: r.data.clone(),
        })
        .collect()
}
