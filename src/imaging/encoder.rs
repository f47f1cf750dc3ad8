//! The three [`Encoder`] implementations and format dispatch.
//!
//! | Encoder | Formats | Edits applied |
//! |---|---|---|
//! | [`RasterEncoder`] | JPEG, PNG, WebP, GIF, BMP, TIFF | crop, flip, rotate, resize |
//! | [`VectorWrapperEncoder`] | SVG | resize only (declared size) |
//! | [`IconEncoder`] | ICO | none, always 32×32 |
//!
//! Quality reaches the JPEG encoder only. The pure-Rust WebP encoder in the
//! `image` crate is lossless, so WebP output ignores it.

use super::backend::{ConvertError, Encoder};
use super::calculations::{compute_render_plan, resized_dimensions};
use super::params::{EncodeRequest, Quality};
use super::render::{WHITE, flatten, render};
use crate::format::OutputFormat;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, RgbaImage};
use std::io::Cursor;

/// Side length of ICO output.
pub const ICON_SIZE: u32 = 32;

/// Pick the encoder for a target format.
pub fn encoder_for(format: OutputFormat) -> &'static dyn Encoder {
    match format {
        OutputFormat::Svg => &VectorWrapperEncoder,
        OutputFormat::Ico => &IconEncoder,
        _ => &RasterEncoder,
    }
}

/// Renders through the transform engine and encodes with the `image` crate.
pub struct RasterEncoder;

impl Encoder for RasterEncoder {
    fn encode(&self, request: &EncodeRequest<'_>) -> Result<Vec<u8>, ConvertError> {
        let plan = compute_render_plan(request.source.dimensions(), request.edit, request.resize)?;
        let background = request.format.needs_opaque_background().then_some(WHITE);
        let surface = render(&request.source.image, &plan, background)?;
        encode_surface(surface, request.format, request.quality)
    }
}

/// Wraps the original bytes in a minimal SVG without rasterising.
///
/// The declared size follows the same resize rules as raster output, so a
/// lone width or height derives the other side from the source aspect ratio
/// and an SVG matches the PNG the same settings would produce. Edits are not
/// applied; the size comes from the unrotated source.
pub struct VectorWrapperEncoder;

impl Encoder for VectorWrapperEncoder {
    fn encode(&self, request: &EncodeRequest<'_>) -> Result<Vec<u8>, ConvertError> {
        let size = resized_dimensions(request.source.dimensions(), request.resize)?;
        let data_uri = format!(
            "data:{};base64,{}",
            request.source.mime,
            STANDARD.encode(&request.source.bytes)
        );
        let svg = format!(
            concat!(
                "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n",
                "<svg xmlns=\"http://www.w3.org/2000/svg\" ",
                "xmlns:xlink=\"http://www.w3.org/1999/xlink\" ",
                "width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">\n",
                "  <image width=\"{w}\" height=\"{h}\" preserveAspectRatio=\"none\" ",
                "xlink:href=\"{href}\"/>\n",
                "</svg>\n"
            ),
            w = size.width,
            h = size.height,
            href = data_uri
        );
        Ok(svg.into_bytes())
    }
}

/// 32×32 icon on white, PNG-compressed inside an ICO container.
pub struct IconEncoder;

impl Encoder for IconEncoder {
    fn encode(&self, request: &EncodeRequest<'_>) -> Result<Vec<u8>, ConvertError> {
        let scaled = request
            .source
            .image
            .resize_exact(ICON_SIZE, ICON_SIZE, FilterType::Lanczos3)
            .to_rgba8();
        let icon = flatten(&scaled, WHITE);
        encode_surface(icon, OutputFormat::Ico, request.quality)
    }
}

/// Encode a rendered surface into `format`.
///
/// JPEG and BMP are written from RGB since neither carries alpha; callers
/// flatten onto a background first.
pub fn encode_surface(
    surface: RgbaImage,
    format: OutputFormat,
    quality: Quality,
) -> Result<Vec<u8>, ConvertError> {
    let image = DynamicImage::ImageRgba8(surface);
    let mut buf = Cursor::new(Vec::new());

    match format {
        OutputFormat::Jpeg => {
            let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
            let encoder = JpegEncoder::new_with_quality(&mut buf, quality.percent());
            rgb.write_with_encoder(encoder)
                .map_err(|e| ConvertError::Encode(format!("JPEG: {e}")))?;
        }
        OutputFormat::Bmp => {
            DynamicImage::ImageRgb8(image.to_rgb8())
                .write_to(&mut buf, ImageFormat::Bmp)
                .map_err(|e| ConvertError::Encode(format!("BMP: {e}")))?;
        }
        OutputFormat::Svg => {
            return Err(ConvertError::UnsupportedFormat(
                "SVG cannot be encoded from pixels".into(),
            ));
        }
        other => {
            let target = image_format(other);
            image
                .write_to(&mut buf, target)
                .map_err(|e| ConvertError::Encode(format!("{other}: {e}")))?;
        }
    }

    Ok(buf.into_inner())
}

fn image_format(format: OutputFormat) -> ImageFormat {
    match format {
        OutputFormat::Jpeg => ImageFormat::Jpeg,
        OutputFormat::Png => ImageFormat::Png,
        OutputFormat::WebP => ImageFormat::WebP,
        OutputFormat::Gif => ImageFormat::Gif,
        OutputFormat::Bmp => ImageFormat::Bmp,
        OutputFormat::Tiff => ImageFormat::Tiff,
        OutputFormat::Ico => ImageFormat::Ico,
        // Never rasterised; `encode_surface` rejects it before this point.
        OutputFormat::Svg => ImageFormat::Png,
    }
}
