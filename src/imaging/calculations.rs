//! Pure calculation functions for output geometry.
//!
//! All functions here are pure and testable without any I/O or images.
//!
//! The render plan applies edits in a fixed order:
//!
//! ```text
//! crop  →  rotate (swap w/h on quarter turns)  →  resize
//! ```
//!
//! Drawing mirrors a 2D canvas: translate to the canvas centre, rotate, scale
//! by `(±1, ±1)` for flips, then draw the cropped source centred at the
//! pre-rotation size. [`RenderPlan::draw`] is that pre-rotation size, so the
//! rotated drawing exactly fills [`RenderPlan::canvas`].

use super::backend::{ConvertError, Dimensions};
use crate::types::{CropRect, EditState, ResizeSettings, Rotation};

/// Largest RGBA surface a plan may ask for, in bytes (1 GiB).
pub const MAX_CANVAS_BYTES: u64 = 1 << 30;

/// Geometry for rendering one image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderPlan {
    /// Final output size.
    pub canvas: Dimensions,
    /// Region of the source that is sampled.
    pub source_rect: CropRect,
    /// Size the sampled region is scaled to before rotation.
    pub draw: Dimensions,
    pub rotation: Rotation,
    pub flip_horizontal: bool,
    pub flip_vertical: bool,
}

/// Calculate resize target dimensions.
///
/// - both given → used as-is (aspect ratio not preserved)
/// - only width → `height = round(width × h / w)`
/// - only height → `width = round(height × w / h)`
/// - neither → `current` unchanged
///
/// # Examples
/// ```
/// # use imgbatch::imaging::calculate_resize_dimensions;
/// assert_eq!(calculate_resize_dimensions((4000, 3000), Some(800), None), (800, 600));
/// assert_eq!(calculate_resize_dimensions((4000, 3000), None, Some(300)), (400, 300));
/// assert_eq!(calculate_resize_dimensions((4000, 3000), Some(10), Some(10)), (10, 10));
/// ```
pub fn calculate_resize_dimensions(
    current: (u32, u32),
    width: Option<u32>,
    height: Option<u32>,
) -> (u32, u32) {
    let (cur_w, cur_h) = current;

    match (width, height) {
        (Some(w), Some(h)) => (w, h),
        (Some(w), None) => {
            let h = (w as f64 * cur_h as f64 / cur_w as f64).round() as u32;
            (w, h)
        }
        (None, Some(h)) => {
            let w = (h as f64 * cur_w as f64 / cur_h as f64).round() as u32;
            (w, h)
        }
        (None, None) => (cur_w, cur_h),
    }
}

/// Apply resize settings to `current`, rejecting zero-sized results.
pub fn resized_dimensions(
    current: Dimensions,
    resize: &ResizeSettings,
) -> Result<Dimensions, ConvertError> {
    if !resize.enabled {
        return Ok(current);
    }
    if resize.width == Some(0) || resize.height == Some(0) {
        return Err(ConvertError::Dimension(format!(
            "resize target {}x{} has a zero side",
            resize.width.unwrap_or(current.width),
            resize.height.unwrap_or(current.height)
        )));
    }

    let (width, height) = calculate_resize_dimensions(
        (current.width, current.height),
        resize.width,
        resize.height,
    );
    let target = Dimensions::new(width, height);
    if target.is_empty() {
        return Err(ConvertError::Dimension(format!(
            "resizing {current} gives {target}"
        )));
    }
    Ok(target)
}

/// Compute the full render plan for a source of the given size.
///
/// Zero-sized sources, crops, or resize targets fail with
/// [`ConvertError::Dimension`]. A crop reaching past the source edge is
/// accepted here and clamped when rendering.
pub fn compute_render_plan(
    source: Dimensions,
    edit: &EditState,
    resize: &ResizeSettings,
) -> Result<RenderPlan, ConvertError> {
    if source.is_empty() {
        return Err(ConvertError::Dimension(format!("source image is {source}")));
    }

    let source_rect = match edit.crop {
        Some(crop) => {
            if crop.width == 0 || crop.height == 0 {
                return Err(ConvertError::Dimension(format!("crop {crop} is empty")));
            }
            crop
        }
        None => CropRect {
            x: 0,
            y: 0,
            width: source.width,
            height: source.height,
        },
    };

    let mut working = Dimensions::new(source_rect.width, source_rect.height);
    if edit.rotation.swaps_dimensions() {
        working = working.swapped();
    }

    let canvas = resized_dimensions(working, resize)?;
    check_canvas(canvas)?;
    let draw = if edit.rotation.swaps_dimensions() {
        canvas.swapped()
    } else {
        canvas
    };

    Ok(RenderPlan {
        canvas,
        source_rect,
        draw,
        rotation: edit.rotation,
        flip_horizontal: edit.flip_horizontal,
        flip_vertical: edit.flip_vertical,
    })
}

/// Reject surfaces whose RGBA buffer would exceed [`MAX_CANVAS_BYTES`].
pub fn check_canvas(canvas: Dimensions) -> Result<(), ConvertError> {
    let bytes = canvas.width as u64 * canvas.height as u64 * 4;
    if bytes > MAX_CANVAS_BYTES {
        return Err(ConvertError::Dimension(format!(
            "{canvas} needs {bytes} bytes, limit is {MAX_CANVAS_BYTES}"
        )));
    }
    Ok(())
}

/// Intersect a crop rectangle with the source bounds.
///
/// Returns `None` when nothing of the rectangle lies inside the source.
pub fn clamp_rect(rect: CropRect, bounds: Dimensions) -> Option<CropRect> {
    if rect.x >= bounds.width || rect.y >= bounds.height {
        return None;
    }
    let width = rect.width.min(bounds.width - rect.x);
    let height = rect.height.min(bounds.height - rect.y);
    if width == 0 || height == 0 {
        return None;
    }
    Some(CropRect {
        x: rect.x,
        y: rect.y,
        width,
        height,
    })
}
