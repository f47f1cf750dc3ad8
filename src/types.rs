//! Shared types passed between the queue, the orchestrator and the imaging
//! layer.
//!
//! The settings fields are also what [`store`](crate::store) persists, so
//! everything here is serde-serializable.

use crate::format::FormatChoice;
use crate::imaging::Quality;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    #[error("rotation must be a multiple of 90 degrees, got {0}")]
    Rotation(i32),
    #[error("crop must be X,Y,WIDTH,HEIGHT, got {0:?}")]
    Crop(String),
}

/// Clockwise rotation by a right angle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    pub fn degrees(self) -> u32 {
        match self {
            Self::Deg0 => 0,
            Self::Deg90 => 90,
            Self::Deg180 => 180,
            Self::Deg270 => 270,
        }
    }

    /// Quarter turns swap the canvas width and height.
    pub fn swaps_dimensions(self) -> bool {
        matches!(self, Self::Deg90 | Self::Deg270)
    }
}

impl TryFrom<i32> for Rotation {
    type Error = EditError;

    /// Any multiple of 90 is accepted and normalised (`-90` → `270`).
    fn try_from(degrees: i32) -> Result<Self, Self::Error> {
        if degrees % 90 != 0 {
            return Err(EditError::Rotation(degrees));
        }
        Ok(match degrees.rem_euclid(360) {
            0 => Self::Deg0,
            90 => Self::Deg90,
            180 => Self::Deg180,
            _ => Self::Deg270,
        })
    }
}

impl From<Rotation> for i32 {
    fn from(rotation: Rotation) -> Self {
        rotation.degrees() as i32
    }
}

/// Crop rectangle in source-pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl FromStr for CropRect {
    type Err = EditError;

    /// Parses `X,Y,WIDTH,HEIGHT`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<u32> = s
            .split(',')
            .map(|p| p.trim().parse::<u32>())
            .collect::<Result<_, _>>()
            .map_err(|_| EditError::Crop(s.to_string()))?;
        match parts.as_slice() {
            &[x, y, width, height] => Ok(Self {
                x,
                y,
                width,
                height,
            }),
            _ => Err(EditError::Crop(s.to_string())),
        }
    }
}

impl fmt::Display for CropRect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}+{}+{}", self.width, self.height, self.x, self.y)
    }
}

/// Geometric edits applied to every item of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EditState {
    pub rotation: Rotation,
    pub flip_horizontal: bool,
    pub flip_vertical: bool,
    pub crop: Option<CropRect>,
}

impl EditState {
    pub fn has_edits(&self) -> bool {
        self.rotation != Rotation::Deg0
            || self.flip_horizontal
            || self.flip_vertical
            || self.crop.is_some()
    }
}

/// Target dimensions. With one side missing the other is derived from the
/// image's aspect ratio; with both given the image is stretched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResizeSettings {
    pub enabled: bool,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl ResizeSettings {
    /// Enabled and at least one dimension given.
    pub fn is_active(&self) -> bool {
        self.enabled && (self.width.is_some() || self.height.is_some())
    }
}

/// Aspect-ratio lock for the resize inputs. `ratio` is width / height.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AspectLock {
    pub locked: bool,
    pub ratio: Option<f64>,
}

/// Output settings for a batch. One snapshot is taken per batch run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionSettings {
    pub format: FormatChoice,
    pub quality: Quality,
    pub resize: ResizeSettings,
    pub aspect_lock: AspectLock,
}

impl Default for ConversionSettings {
    fn default() -> Self {
        Self {
            format: FormatChoice::SameAsSource,
            quality: Quality::default(),
            resize: ResizeSettings::default(),
            aspect_lock: AspectLock::default(),
        }
    }
}

impl ConversionSettings {
    /// Lock the aspect ratio (width / height). Non-finite or non-positive
    /// ratios lock without a ratio, so nothing is derived.
    pub fn lock_aspect(&mut self, ratio: Option<f64>) {
        self.aspect_lock = AspectLock {
            locked: true,
            ratio: ratio.filter(|r| r.is_finite() && *r > 0.0),
        };
    }

    pub fn unlock_aspect(&mut self) {
        self.aspect_lock = AspectLock::default();
    }

    /// Set the resize width; with a locked ratio the height follows.
    pub fn set_width(&mut self, width: u32) {
        self.resize.width = Some(width);
        if let (true, Some(ratio)) = (self.aspect_lock.locked, self.aspect_lock.ratio) {
            self.resize.height = Some((width as f64 / ratio).round() as u32);
        }
    }

    /// Set the resize height; with a locked ratio the width follows.
    pub fn set_height(&mut self, height: u32) {
        self.resize.height = Some(height);
        if let (true, Some(ratio)) = (self.aspect_lock.locked, self.aspect_lock.ratio) {
            self.resize.width = Some((height as f64 * ratio).round() as u32);
        }
    }
}

/// One converted file, ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionResult {
    pub data: Vec<u8>,
    pub filename: String,
}
