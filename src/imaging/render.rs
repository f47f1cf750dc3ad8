//! Pixel rendering for a [`RenderPlan`].
//!
//! Mirrors what a 2D canvas does with the plan's transform: sample the source
//! rectangle, scale it to the pre-rotation draw size, flip in the image's own
//! frame, then rotate clockwise onto the canvas. Scaling uses Lanczos3.

use super::backend::{ConvertError, Dimensions};
use super::calculations::{RenderPlan, clamp_rect};
use crate::types::Rotation;
use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, Rgba, RgbaImage};

/// Opaque white, the fill for formats without transparency.
pub const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Render `image` according to `plan`.
///
/// With a `background`, the surface is filled with it first and the image
/// composited on top, so transparent source pixels show the fill colour.
pub fn render(
    image: &DynamicImage,
    plan: &RenderPlan,
    background: Option<Rgba<u8>>,
) -> Result<RgbaImage, ConvertError> {
    let (width, height) = image.dimensions();
    let rect = clamp_rect(plan.source_rect, Dimensions::new(width, height)).ok_or_else(|| {
        ConvertError::Dimension(format!(
            "crop {} lies outside the {width}x{height} source",
            plan.source_rect
        ))
    })?;
    if plan.draw.is_empty() {
        return Err(ConvertError::Dimension(format!(
            "cannot draw at {}",
            plan.draw
        )));
    }

    let sampled = image.crop_imm(rect.x, rect.y, rect.width, rect.height);
    let scaled = if sampled.dimensions() == (plan.draw.width, plan.draw.height) {
        sampled
    } else {
        sampled.resize_exact(plan.draw.width, plan.draw.height, FilterType::Lanczos3)
    };

    let mut surface = scaled.to_rgba8();
    if plan.flip_horizontal {
        imageops::flip_horizontal_in_place(&mut surface);
    }
    if plan.flip_vertical {
        imageops::flip_vertical_in_place(&mut surface);
    }

    let surface = match plan.rotation {
        Rotation::Deg0 => surface,
        Rotation::Deg90 => imageops::rotate90(&surface),
        Rotation::Deg180 => imageops::rotate180(&surface),
        Rotation::Deg270 => imageops::rotate270(&surface),
    };

    Ok(match background {
        Some(color) => flatten(&surface, color),
        None => surface,
    })
}

/// Composite `surface` onto a solid `background` of the same size.
pub fn flatten(surface: &RgbaImage, background: Rgba<u8>) -> RgbaImage {
    let mut out = RgbaImage::from_pixel(surface.width(), surface.height(), background);
    imageops::overlay(&mut out, surface, 0, 0);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::calculations::compute_render_plan;
    use crate::types::{CropRect, EditState, ResizeSettings};

    /// 2x1 image: red on the left, blue on the right.
    fn red_blue() -> DynamicImage {
        let mut img = RgbaImage::new(2, 1);
        img.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        img.put_pixel(1, 0, Rgba([0, 0, 255, 255]));
        DynamicImage::ImageRgba8(img)
    }

    fn plan_for(image: &DynamicImage, edit: EditState) -> RenderPlan {
        let (w, h) = image.dimensions();
        compute_render_plan(Dimensions::new(w, h), &edit, &ResizeSettings::default()).unwrap()
    }

    #[test]
    fn identity_render_preserves_pixels() {
        let img = red_blue();
        let out = render(&img, &plan_for(&img, EditState::default()), None).unwrap();
        assert_eq!(out.get_pixel(0, 0), &Rgba([255, 0, 0, 255]));
        assert_eq!(out.get_pixel(1, 0), &Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn horizontal_flip_mirrors() {
        let img = red_blue();
        let edit = EditState {
            flip_horizontal: true,
            ..Default::default()
        };
        let out = render(&img, &plan_for(&img, edit), None).unwrap();
        assert_eq!(out.get_pixel(0, 0), &Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn quarter_turn_is_clockwise() {
        let img = red_blue();
        let edit = EditState {
            rotation: Rotation::Deg90,
            ..Default::default()
        };
        let out = render(&img, &plan_for(&img, edit), None).unwrap();
        assert_eq!(out.dimensions(), (1, 2));
        // Clockwise: the left (red) edge ends up on top.
        assert_eq!(out.get_pixel(0, 0), &Rgba([255, 0, 0, 255]));
        assert_eq!(out.get_pixel(0, 1), &Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn crop_samples_only_the_rectangle() {
        let img = red_blue();
        let edit = EditState {
            crop: Some(CropRect {
                x: 1,
                y: 0,
                width: 1,
                height: 1,
            }),
            ..Default::default()
        };
        let out = render(&img, &plan_for(&img, edit), None).unwrap();
        assert_eq!(out.dimensions(), (1, 1));
        assert_eq!(out.get_pixel(0, 0), &Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn crop_outside_source_is_dimension_error() {
        let img = red_blue();
        let edit = EditState {
            crop: Some(CropRect {
                x: 5,
                y: 5,
                width: 1,
                height: 1,
            }),
            ..Default::default()
        };
        let result = render(&img, &plan_for(&img, edit), None);
        assert!(matches!(result, Err(ConvertError::Dimension(_))));
    }

    #[test]
    fn resize_scales_to_canvas() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(40, 20, Rgba([9, 9, 9, 255])));
        let resize = ResizeSettings {
            enabled: true,
            width: Some(10),
            height: None,
        };
        let plan =
            compute_render_plan(Dimensions::new(40, 20), &EditState::default(), &resize).unwrap();
        let out = render(&img, &plan, None).unwrap();
        assert_eq!(out.dimensions(), (10, 5));
    }

    #[test]
    fn background_replaces_transparency() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(3, 3, Rgba([0, 0, 0, 0])));
        let out = render(&img, &plan_for(&img, EditState::default()), Some(WHITE)).unwrap();
        assert!(out.pixels().all(|p| *p == WHITE));
    }

    #[test]
    fn flatten_keeps_opaque_pixels() {
        let mut surface = RgbaImage::from_pixel(2, 1, Rgba([0, 0, 0, 0]));
        surface.put_pixel(1, 0, Rgba([10, 20, 30, 255]));
        let out = flatten(&surface, WHITE);
        assert_eq!(out.get_pixel(0, 0), &WHITE);
        assert_eq!(out.get_pixel(1, 0), &Rgba([10, 20, 30, 255]));
    }
}
