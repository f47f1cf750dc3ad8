//! Image format model: output targets, MIME types, labels and extensions.
//!
//! Two kinds of "format" flow through the converter:
//!
//! - [`OutputFormat`]: a concrete target the encoders can produce.
//! - [`FormatChoice`]: what the user picked, either an explicit target, or
//!   "same as source", which is resolved per item once the source is known.
//!
//! Source images are identified by declared MIME type first and filename
//! extension second. HEIC/HEIF is recognised here but never decoded here:
//! it needs an external decoder (see [`crate::imaging::HeicDecoder`]).
//!
//! | Format | MIME | Extension | Label | Lossy | Opaque background |
//! |---|---|---|---|---|---|
//! | JPEG | `image/jpeg` | `jpg` | JPG | yes | yes |
//! | PNG | `image/png` | `png` | PNG | | |
//! | WebP | `image/webp` | `webp` | WEBP | yes | |
//! | GIF | `image/gif` | `gif` | GIF | | |
//! | BMP | `image/bmp` | `bmp` | BMP | | yes |
//! | TIFF | `image/tiff` | `tiff` | TIFF | | |
//! | SVG | `image/svg+xml` | `svg` | SVG | | |
//! | ICO | `image/x-icon` | `ico` | ICO | | |

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

pub const HEIC_MIME: &str = "image/heic";
pub const HEIF_MIME: &str = "image/heif";

/// Label shown for sources whose MIME type is not recognised.
pub const UNKNOWN_LABEL: &str = "IMG";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("unsupported image format: {0}")]
    Unsupported(String),
}

/// A concrete output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Jpeg,
    Png,
    WebP,
    Gif,
    Bmp,
    Tiff,
    Svg,
    Ico,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 8] = [
        Self::Jpeg,
        Self::Png,
        Self::WebP,
        Self::Gif,
        Self::Bmp,
        Self::Tiff,
        Self::Svg,
        Self::Ico,
    ];

    pub fn mime(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::WebP => "image/webp",
            Self::Gif => "image/gif",
            Self::Bmp => "image/bmp",
            Self::Tiff => "image/tiff",
            Self::Svg => "image/svg+xml",
            Self::Ico => "image/x-icon",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::WebP => "webp",
            Self::Gif => "gif",
            Self::Bmp => "bmp",
            Self::Tiff => "tiff",
            Self::Svg => "svg",
            Self::Ico => "ico",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Jpeg => "JPG",
            Self::Png => "PNG",
            Self::WebP => "WEBP",
            Self::Gif => "GIF",
            Self::Bmp => "BMP",
            Self::Tiff => "TIFF",
            Self::Svg => "SVG",
            Self::Ico => "ICO",
        }
    }

    /// Formats with a quality-controlled lossy mode.
    pub fn is_lossy(self) -> bool {
        matches!(self, Self::Jpeg | Self::WebP)
    }

    /// Formats without an alpha channel. Transparent pixels must be composited
    /// onto white before encoding or they come out black.
    pub fn needs_opaque_background(self) -> bool {
        matches!(self, Self::Jpeg | Self::Bmp)
    }

    pub fn from_mime(mime: &str) -> Option<Self> {
        let mime = mime.trim().to_ascii_lowercase();
        match mime.as_str() {
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            "image/webp" => Some(Self::WebP),
            "image/gif" => Some(Self::Gif),
            "image/bmp" | "image/x-ms-bmp" => Some(Self::Bmp),
            "image/tiff" => Some(Self::Tiff),
            "image/svg+xml" => Some(Self::Svg),
            "image/x-icon" | "image/vnd.microsoft.icon" => Some(Self::Ico),
            _ => None,
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" | "jpe" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "webp" => Some(Self::WebP),
            "gif" => Some(Self::Gif),
            "bmp" => Some(Self::Bmp),
            "tif" | "tiff" => Some(Self::Tiff),
            "svg" => Some(Self::Svg),
            "ico" => Some(Self::Ico),
            _ => None,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for OutputFormat {
    type Err = FormatError;

    /// Accepts a short name (`jpeg`, `jpg`, `webp`, ...) or a MIME type.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Self::from_extension(&normalized)
            .or_else(|| Self::from_mime(&normalized))
            .ok_or(FormatError::Unsupported(normalized))
    }
}

/// The user's format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FormatChoice {
    /// Keep each item's own format.
    #[default]
    SameAsSource,
    Explicit(OutputFormat),
}

impl FormatChoice {
    /// Resolve to a concrete format for one item.
    ///
    /// Sources with no encodable counterpart (unknown MIME) fall back to JPEG.
    pub fn resolve(self, source: Option<OutputFormat>) -> OutputFormat {
        match self {
            Self::Explicit(format) => format,
            Self::SameAsSource => source.unwrap_or(OutputFormat::Jpeg),
        }
    }

    pub fn explicit(self) -> Option<OutputFormat> {
        match self {
            Self::Explicit(format) => Some(format),
            Self::SameAsSource => None,
        }
    }
}

impl fmt::Display for FormatChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SameAsSource => f.write_str("same"),
            Self::Explicit(format) => f.write_str(&format.label().to_ascii_lowercase()),
        }
    }
}

impl FromStr for FormatChoice {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "same" | "original" => Ok(Self::SameAsSource),
            other => other.parse().map(Self::Explicit),
        }
    }
}

impl TryFrom<String> for FormatChoice {
    type Error = FormatError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FormatChoice> for String {
    fn from(choice: FormatChoice) -> Self {
        choice.to_string()
    }
}

fn extension_of(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Whether a source needs the external HEIC/HEIF decoder.
///
/// Checked by MIME type and by extension: browsers and file pickers often
/// report an empty MIME type for HEIC files.
pub fn is_heic(mime: &str, filename: &str) -> bool {
    let mime = mime.trim().to_ascii_lowercase();
    if mime == HEIC_MIME || mime == HEIF_MIME {
        return true;
    }
    matches!(extension_of(filename).as_deref(), Some("heic" | "heif"))
}

/// Short display label for a source MIME type (`"JPG"`, `"HEIC"`, `"IMG"`).
pub fn source_label(mime: &str) -> &'static str {
    match mime.trim().to_ascii_lowercase().as_str() {
        HEIC_MIME => "HEIC",
        HEIF_MIME => "HEIF",
        other => OutputFormat::from_mime(other)
            .map(OutputFormat::label)
            .unwrap_or(UNKNOWN_LABEL),
    }
}

/// Guess a MIME type from a filename extension.
pub fn mime_from_filename(filename: &str) -> Option<&'static str> {
    let ext = extension_of(filename)?;
    match ext.as_str() {
        "heic" => Some(HEIC_MIME),
        "heif" => Some(HEIF_MIME),
        other => OutputFormat::from_extension(other).map(OutputFormat::mime),
    }
}

/// The output format matching a source, used by [`FormatChoice::SameAsSource`].
pub fn source_output_format(mime: &str, filename: &str) -> Option<OutputFormat> {
    OutputFormat::from_mime(mime)
        .or_else(|| extension_of(filename).and_then(|e| OutputFormat::from_extension(&e)))
}
