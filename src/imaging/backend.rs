//! Encoder trait and shared imaging types.
//!
//! The [`Encoder`] trait is the single capability every output path
//! implements. Three implementations live in
//! [`encoder`](super::encoder), selected per target format:
//!
//! | Encoder | Formats | Path |
//! |---|---|---|
//! | `RasterEncoder` | JPEG, PNG, WebP, GIF, BMP, TIFF | render plan → pixels → `image` encoder |
//! | `VectorWrapperEncoder` | SVG | original bytes wrapped in an SVG `<image>` |
//! | `IconEncoder` | ICO | 32×32 on white, PNG inside an ICO container |
//!
//! Errors from every stage of a conversion use [`ConvertError`]; the
//! orchestrator keeps the [`FailureKind`] on the failed queue item.

use super::params::EncodeRequest;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConvertError {
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Invalid dimensions: {0}")]
    Dimension(String),
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("Encode failed: {0}")]
    Encode(String),
}

impl ConvertError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Decode(_) => FailureKind::Decode,
            Self::Dimension(_) => FailureKind::Dimension,
            Self::UnsupportedFormat(_) => FailureKind::UnsupportedFormat,
            Self::Encode(_) => FailureKind::Encode,
        }
    }
}

/// Category of a per-item conversion failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Decode,
    Dimension,
    UnsupportedFormat,
    Encode,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Decode => "decode",
            Self::Dimension => "dimension",
            Self::UnsupportedFormat => "unsupported format",
            Self::Encode => "encode",
        })
    }
}

/// Pixel dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn swapped(self) -> Self {
        Self {
            width: self.height,
            height: self.width,
        }
    }

    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Produces encoded bytes for one decoded source.
///
/// `Sync` so a single static instance can serve every item.
pub trait Encoder: Sync {
    fn encode(&self, request: &EncodeRequest<'_>) -> Result<Vec<u8>, ConvertError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kinds_map_one_to_one() {
        assert_eq!(ConvertError::Decode("x".into()).kind(), FailureKind::Decode);
        assert_eq!(
            ConvertError::Dimension("x".into()).kind(),
            FailureKind::Dimension
        );
        assert_eq!(
            ConvertError::UnsupportedFormat("x".into()).kind(),
            FailureKind::UnsupportedFormat
        );
        assert_eq!(ConvertError::Encode("x".into()).kind(), FailureKind::Encode);
    }

    #[test]
    fn error_messages_are_prefixed_by_stage() {
        let err = ConvertError::Dimension("crop is 0x10".into());
        assert_eq!(err.to_string(), "Invalid dimensions: crop is 0x10");
    }

    #[test]
    fn dimensions_swap_and_emptiness() {
        let d = Dimensions::new(800, 600);
        assert_eq!(d.swapped(), Dimensions::new(600, 800));
        assert!(!d.is_empty());
        assert!(Dimensions::new(0, 600).is_empty());
        assert_eq!(d.to_string(), "800x600");
    }
}
