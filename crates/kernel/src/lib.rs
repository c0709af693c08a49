pub mod geometry;
pub mod scene;
pub mod render;
pub mod mask;
pub mod contour;
pub mod normalize;
pub mod extrude;
pub mod depth;
pub mod parts;
pub mod config;
pub mod pipeline;
pub mod worker;

// Re-export the pipeline surface at crate root for convenience.
pub use config::{ConfigError, PipelineConfig};
pub use contour::{BorderKind, Contour, ContourSet, extract};
pub use depth::{set_depth, set_tree_depth};
pub use extrude::{ExtrudeError, ExtrusionHandle, Solid, build_solid, extrude};
pub use mask::Mask;
pub use normalize::{CanonicalPolygon, ContourPolicy, PolygonNormalizer, normalize};
pub use parts::{DecorationSlot, Part, PartId, PartKind, PartTree};
pub use pipeline::{Generation, Monster, MonsterPipeline, PipelineError};
pub use render::{CancelToken, RenderError, RenderSettings, SceneRenderer};
pub use scene::SceneConfig;
pub use worker::{GenerationResult, GenerationWorker, RequestId};

/// Global tolerance configuration for geometric comparisons.
#[derive(Debug, Clone, Copy)]
pub struct Tolerance {
    /// Directions closer than this (radians) to parallel are treated as parallel.
    pub angular: f64,
    /// Enclosed areas at or below this (square pixels) are treated as empty.
    pub area: f64,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            angular: 1e-6,
            area: 1e-9,
        }
    }
}

impl Tolerance {
    pub fn is_zero_area(&self, area: f64) -> bool {
        area.abs() <= self.area
    }

    pub fn is_parallel(&self, a: &geometry::vector::Vec3, b: &geometry::vector::Vec3) -> bool {
        a.is_parallel_to(b, self.angular)
    }
}

/// Default tolerance.
pub fn default_tolerance() -> Tolerance {
    Tolerance::default()
}
