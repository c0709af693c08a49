use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::contour::DEFAULT_THRESHOLD;
use crate::normalize::{CANONICAL_EXTENT, ContourPolicy, PolygonNormalizer};
use crate::render::{DEFAULT_RESOLUTION, RenderSettings};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("canonical extent must be finite and positive, got {extent}")]
    InvalidExtent { extent: f64 },
    #[error("initial depth must be finite and positive, got {depth}")]
    InvalidInitialDepth { depth: f64 },
}

/// Settings for one scene-to-monster generation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Side length of the square shadow mask.
    pub resolution: u32,
    /// Mask pixels darker than this are shadow.
    pub threshold: u8,
    /// Depth of freshly extruded solids.
    pub initial_depth: f64,
    pub canonical_extent: f64,
    pub contour_policy: ContourPolicy,
    pub render: RenderSettings,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            resolution: DEFAULT_RESOLUTION,
            threshold: DEFAULT_THRESHOLD,
            initial_depth: 1.0,
            canonical_extent: CANONICAL_EXTENT,
            contour_policy: ContourPolicy::LargestOnly,
            render: RenderSettings::default(),
        }
    }
}

impl PipelineConfig {
    /// Low-resolution mask for quick previews.
    pub fn preview() -> Self {
        Self {
            resolution: 512,
            ..Self::default()
        }
    }

    /// Every outer contour becomes its own part.
    pub fn compound() -> Self {
        Self {
            contour_policy: ContourPolicy::AllOuter,
            ..Self::default()
        }
    }

    /// Reject settings that would produce a collapsed or mirrored monster.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let extent = self.canonical_extent;
        if !(extent.is_finite() && extent > 0.0) {
            return Err(ConfigError::InvalidExtent { extent });
        }
        let depth = self.initial_depth;
        if !(depth.is_finite() && depth > 0.0) {
            return Err(ConfigError::InvalidInitialDepth { depth });
        }
        Ok(())
    }

    pub fn normalizer(&self) -> PolygonNormalizer {
        PolygonNormalizer::new(self.canonical_extent, self.contour_policy)
    }
}
