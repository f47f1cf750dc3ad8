//! High-level image operations.
//!
//! These functions combine the format model with encoder dispatch. They take
//! settings, resolve parameters, and call the encoder.

use super::backend::{ConvertError, Dimensions};
use super::calculations::check_canvas;
use super::encoder::{encode_surface, encoder_for};
use super::params::{EncodeRequest, Quality};
use super::source::DecodedSource;
use crate::format::OutputFormat;
use crate::naming::converted_filename;
use crate::types::{ConversionResult, ConversionSettings, EditState};
use image::imageops::FilterType;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, ConvertError>;

/// Default edge length of queue thumbnails.
pub const DEFAULT_THUMBNAIL_SIZE: u32 = 48;

/// Resolve the target format for one source.
pub fn target_format(settings: &ConversionSettings, source: &DecodedSource) -> OutputFormat {
    settings.format.resolve(source.source_format)
}

/// Convert a decoded source with a settings snapshot and the shared edits.
///
/// `original_name` is the queue item's filename; the output name is derived
/// from it and the resolved target format.
pub fn convert_decoded(
    source: &DecodedSource,
    original_name: &str,
    settings: &ConversionSettings,
    edit: &EditState,
) -> Result<ConversionResult> {
    let format = target_format(settings, source);
    let request = EncodeRequest {
        source,
        edit,
        resize: &settings.resize,
        format,
        quality: settings.quality,
    };
    let data = encoder_for(format).encode(&request)?;

    Ok(ConversionResult {
        data,
        filename: converted_filename(original_name, format.mime()),
    })
}

/// Square PNG thumbnail: resize to fill, then centre-crop.
pub fn create_thumbnail(source: &DecodedSource, size: u32) -> Result<Vec<u8>> {
    if size == 0 {
        return Err(ConvertError::Dimension("thumbnail size is 0".into()));
    }
    check_canvas(Dimensions::new(size, size))?;
    let thumb = source
        .image
        .resize_to_fill(size, size, FilterType::Lanczos3)
        .to_rgba8();
    encode_surface(thumb, OutputFormat::Png, Quality::default())
}
