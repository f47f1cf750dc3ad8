//! Image processing in pure Rust, built on the `image` crate.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::ImageReader` with guessed format |
//! | **HEIC/HEIF** | external [`HeicDecoder`] to an intermediate image |
//! | **Crop / flip / rotate** | `crop_imm` + `imageops::{flip_*, rotate*}` |
//! | **Resize** | `resize_exact` with Lanczos3 |
//! | **Encode** | `image` encoders, JPEG quality via `JpegEncoder` |
//! | **SVG** | `base64` data URI inside a minimal SVG |
//! | **Thumbnail** | `resize_to_fill` → PNG |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`Encoder`] trait, [`ConvertError`], [`Dimensions`]
//! - **Render**: Pixel work for a render plan
//! - **Source**: Input files, decoding, HEIC pre-conversion
//! - **Encoder**: The raster, vector-wrapper and icon encoders
//! - **Operations**: High-level functions combining the above

pub mod backend;
mod calculations;
pub mod encoder;
pub mod operations;
mod params;
mod render;
pub mod source;

pub use backend::{ConvertError, Dimensions, Encoder, FailureKind};
pub use calculations::{
    MAX_CANVAS_BYTES, RenderPlan, calculate_resize_dimensions, check_canvas, compute_render_plan,
    resized_dimensions,
};
pub use encoder::{IconEncoder, RasterEncoder, VectorWrapperEncoder, encoder_for};
pub use operations::{DEFAULT_THUMBNAIL_SIZE, convert_decoded, create_thumbnail};
pub use params::{EncodeRequest, Quality};
pub use render::{WHITE, render};
pub use source::{
    DecodedSource, HeicDecoder, IntermediateImage, SourceFile, collect_sources, decode_source,
    probe_dimensions,
};
