//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They sit between
//! the orchestrator (which decides what to convert) and the encoders (which
//! do the pixel work).
//!
//! - [`Quality`]: lossy encoding quality in `[0, 1]`, default 0.9. Clamped on construction.
//! - [`EncodeRequest`]: everything an [`Encoder`](super::Encoder) needs for one item.

use super::source::DecodedSource;
use crate::format::OutputFormat;
use crate::types::{EditState, ResizeSettings};
use serde::{Deserialize, Serialize};

/// Quality setting for lossy encoding, `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "f64", into = "f64")]
pub struct Quality(f64);

impl Quality {
    pub fn new(value: f64) -> Self {
        if value.is_nan() {
            return Self::default();
        }
        Self(value.clamp(0.0, 1.0))
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// Quality on the 1-100 scale used by the JPEG encoder.
    pub fn percent(self) -> u8 {
        ((self.0 * 100.0).round() as u8).clamp(1, 100)
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(0.9)
    }
}

impl From<f64> for Quality {
    fn from(value: f64) -> Self {
        Self::new(value)
    }
}

impl From<Quality> for f64 {
    fn from(quality: Quality) -> Self {
        quality.0
    }
}

/// Everything needed to encode one decoded source.
#[derive(Debug, Clone, Copy)]
pub struct EncodeRequest<'a> {
    pub source: &'a DecodedSource,
    pub edit: &'a EditState,
    pub resize: &'a ResizeSettings,
    pub format: OutputFormat,
    pub quality: Quality,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_clamps_to_valid_range() {
        assert_eq!(Quality::new(-0.5).value(), 0.0);
        assert_eq!(Quality::new(0.42).value(), 0.42);
        assert_eq!(Quality::new(1.5).value(), 1.0);
        assert_eq!(Quality::new(f64::NAN), Quality::default());
    }

    #[test]
    fn quality_default_is_0_9() {
        assert_eq!(Quality::default().value(), 0.9);
        assert_eq!(Quality::default().percent(), 90);
    }

    #[test]
    fn percent_never_drops_to_zero() {
        assert_eq!(Quality::new(0.0).percent(), 1);
        assert_eq!(Quality::new(1.0).percent(), 100);
        assert_eq!(Quality::new(0.76).percent(), 76);
    }

    #[test]
    fn deserializing_clamps() {
        let q: Quality = serde_json::from_str("3.0").unwrap();
        assert_eq!(q.value(), 1.0);
    }
}
