//! Source files and decoding.
//!
//! A [`SourceFile`] is the raw input: name, declared MIME type and bytes.
//! [`decode_source`] turns it into a [`DecodedSource`], routing HEIC/HEIF
//! through an external [`HeicDecoder`] first since no pure-Rust decoder for
//! it is compiled in.

use super::backend::{ConvertError, Dimensions};
use crate::format::{self, OutputFormat};
use image::{DynamicImage, GenericImageView, ImageReader};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Files above this size are accepted but logged as a warning.
pub const LARGE_FILE_WARNING_BYTES: u64 = 50 * 1024 * 1024;

/// One input file as handed to the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub name: String,
    /// Declared MIME type. May be empty when the origin did not know it.
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes,
        }
    }

    /// Read a file from disk, guessing the MIME type from its extension.
    pub fn read(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let mime = format::mime_from_filename(&name).unwrap_or_default();
        Ok(Self::new(name, mime, bytes))
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_heic(&self) -> bool {
        format::is_heic(&self.mime, &self.name)
    }

    /// `image/*` MIME type, or a HEIC/HEIF filename.
    pub fn is_valid_image(&self) -> bool {
        self.mime.trim().to_ascii_lowercase().starts_with("image/") || self.is_heic()
    }

    pub fn is_large(&self) -> bool {
        self.size() > LARGE_FILE_WARNING_BYTES
    }

    /// Display label such as `"JPG"` or `"HEIC"`.
    pub fn format_label(&self) -> &'static str {
        if self.mime.trim().is_empty() && self.is_heic() {
            return "HEIC";
        }
        format::source_label(&self.mime)
    }
}

/// Bytes in a format the `image` crate can decode, produced from HEIC/HEIF.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntermediateImage {
    pub bytes: Vec<u8>,
    pub mime: String,
}

/// External HEIC/HEIF pre-converter.
pub trait HeicDecoder: Sync {
    fn to_intermediate(&self, source: &SourceFile) -> Result<IntermediateImage, ConvertError>;
}

/// A source ready for encoding.
///
/// `bytes` and `mime` describe what was actually decoded: the intermediate
/// image for HEIC sources, the original file otherwise.
#[derive(Debug, Clone)]
pub struct DecodedSource {
    pub image: DynamicImage,
    pub bytes: Vec<u8>,
    pub mime: String,
    /// Encodable counterpart of the source format, if any.
    pub source_format: Option<OutputFormat>,
}

impl DecodedSource {
    pub fn dimensions(&self) -> Dimensions {
        let (width, height) = self.image.dimensions();
        Dimensions::new(width, height)
    }
}

/// Decode a source file, pre-converting HEIC/HEIF through `heic`.
pub fn decode_source(
    file: &SourceFile,
    heic: Option<&dyn HeicDecoder>,
) -> Result<DecodedSource, ConvertError> {
    if file.is_heic() {
        let decoder = heic.ok_or_else(|| {
            ConvertError::UnsupportedFormat(format!("{}: no HEIC decoder available", file.name))
        })?;
        let intermediate = decoder.to_intermediate(file)?;
        let image = decode_bytes(&intermediate.bytes, &file.name)?;
        let source_format = OutputFormat::from_mime(&intermediate.mime);
        return Ok(DecodedSource {
            image,
            bytes: intermediate.bytes,
            mime: intermediate.mime,
            source_format,
        });
    }

    let image = decode_bytes(&file.bytes, &file.name)?;
    let mime = if file.mime.trim().is_empty() {
        format::mime_from_filename(&file.name)
            .unwrap_or("application/octet-stream")
            .to_string()
    } else {
        file.mime.clone()
    };
    Ok(DecodedSource {
        image,
        bytes: file.bytes.clone(),
        source_format: format::source_output_format(&file.mime, &file.name),
        mime,
    })
}

fn decode_bytes(bytes: &[u8], name: &str) -> Result<DynamicImage, ConvertError> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| ConvertError::Decode(format!("{name}: {e}")))?
        .decode()
        .map_err(|e| ConvertError::Decode(format!("{name}: {e}")))
}

/// Read dimensions from the header without a full decode.
pub fn probe_dimensions(bytes: &[u8]) -> Result<Dimensions, ConvertError> {
    let (width, height) = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| ConvertError::Decode(e.to_string()))?
        .into_dimensions()
        .map_err(|e| ConvertError::Decode(e.to_string()))?;
    Ok(Dimensions::new(width, height))
}

/// Read every input path into a [`SourceFile`].
///
/// Files are read as given. Directories are walked recursively in filename
/// order, keeping only files whose extension names an image format.
pub fn collect_sources(paths: &[PathBuf]) -> std::io::Result<Vec<SourceFile>> {
    let mut sources = Vec::new();
    for path in paths {
        if path.is_dir() {
            for entry in WalkDir::new(path).sort_by_file_name() {
                let entry = entry.map_err(std::io::Error::other)?;
                if !entry.file_type().is_file() {
                    continue;
                }
                let name = entry.file_name().to_string_lossy();
                if format::mime_from_filename(&name).is_none() {
                    tracing::debug!(path = %entry.path().display(), "not an image, skipped");
                    continue;
                }
                sources.push(SourceFile::read(entry.path())?);
            }
        } else {
            sources.push(SourceFile::read(path)?);
        }
    }
    Ok(sources)
}
