//! Output size estimation.
//!
//! A rough, advisory guess shown before converting. Not a prediction of the
//! encoder's real output: each format scales the source size by a fixed
//! multiplier, lossy formats also by quality.
//!
//! | Target | Estimate |
//! |---|---|
//! | JPEG | size × quality × 0.6 |
//! | WebP | size × quality × 0.5 |
//! | PNG | size × 1.2 |
//! | BMP | size × 3 |
//! | GIF | size × 0.9 |
//! | TIFF | size × 2 |
//! | SVG | size × 0.3 |
//! | ICO | 5000 bytes |
//! | same as source | size |
//!
//! An active resize multiplies the result by 0.7.

use crate::format::{FormatChoice, OutputFormat};
use crate::types::ConversionSettings;

/// Fixed estimate for ICO output.
pub const ICO_ESTIMATE_BYTES: f64 = 5000.0;

/// Factor applied when resize is enabled with a dimension.
pub const RESIZE_FACTOR: f64 = 0.7;

/// Estimate the converted size of a `source_bytes`-long file.
pub fn estimate_output_size(source_bytes: u64, settings: &ConversionSettings) -> u64 {
    let size = source_bytes as f64;
    let quality = settings.quality.value();

    let mut estimate = match settings.format {
        FormatChoice::SameAsSource => size,
        FormatChoice::Explicit(format) => match format {
            OutputFormat::Jpeg => size * quality * 0.6,
            OutputFormat::WebP => size * quality * 0.5,
            OutputFormat::Png => size * 1.2,
            OutputFormat::Bmp => size * 3.0,
            OutputFormat::Gif => size * 0.9,
            OutputFormat::Tiff => size * 2.0,
            OutputFormat::Svg => size * 0.3,
            OutputFormat::Ico => ICO_ESTIMATE_BYTES,
        },
    };

    if settings.resize.is_active() {
        estimate *= RESIZE_FACTOR;
    }

    estimate.round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::Quality;
    use crate::types::ResizeSettings;

    fn settings(format: OutputFormat, quality: f64) -> ConversionSettings {
        ConversionSettings {
            format: FormatChoice::Explicit(format),
            quality: Quality::new(quality),
            ..Default::default()
        }
    }

    #[test]
    fn jpeg_at_0_9() {
        assert_eq!(
            estimate_output_size(10_000_000, &settings(OutputFormat::Jpeg, 0.9)),
            5_400_000
        );
    }

    #[test]
    fn jpeg_at_0_9_with_resize() {
        let mut s = settings(OutputFormat::Jpeg, 0.9);
        s.resize = ResizeSettings {
            enabled: true,
            width: Some(800),
            height: None,
        };
        assert_eq!(estimate_output_size(10_000_000, &s), 3_780_000);
    }

    #[test]
    fn resize_without_dimensions_does_not_shrink() {
        let mut s = settings(OutputFormat::Png, 0.9);
        s.resize.enabled = true;
        assert_eq!(estimate_output_size(1000, &s), 1200);
    }

    #[test]
    fn lossless_multipliers_ignore_quality() {
        for (format, expected) in [
            (OutputFormat::Png, 1200),
            (OutputFormat::Bmp, 3000),
            (OutputFormat::Gif, 900),
            (OutputFormat::Tiff, 2000),
            (OutputFormat::Svg, 300),
        ] {
            assert_eq!(estimate_output_size(1000, &settings(format, 0.1)), expected);
            assert_eq!(estimate_output_size(1000, &settings(format, 1.0)), expected);
        }
    }

    #[test]
    fn webp_scales_with_quality() {
        assert_eq!(
            estimate_output_size(1000, &settings(OutputFormat::WebP, 0.5)),
            250
        );
    }

    #[test]
    fn ico_is_fixed() {
        assert_eq!(estimate_output_size(1, &settings(OutputFormat::Ico, 0.9)), 5000);
        assert_eq!(
            estimate_output_size(99_999_999, &settings(OutputFormat::Ico, 0.9)),
            5000
        );
    }

    #[test]
    fn same_as_source_keeps_size() {
        assert_eq!(
            estimate_output_size(4321, &ConversionSettings::default()),
            4321
        );
    }
}
