//! Scene-to-monster coordinator.
//!
//! Runs render, extract, normalize and extrude strictly in order. A stage never
//! sees a failed or empty result from the previous one.

use thiserror::Error;
use tracing::{info, instrument};

use crate::config::{ConfigError, PipelineConfig};
use crate::contour::extract;
use crate::extrude::{ExtrudeError, ExtrusionHandle, extrude};
use crate::mask::Mask;
use crate::parts::{Part, PartKind, PartTree};
use crate::render::{CancelToken, RenderError, SceneRenderer};
use crate::scene::SceneConfig;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PipelineError {
    #[error("invalid pipeline config: {0}")]
    Config(#[from] ConfigError),
    #[error("render failed: {0}")]
    Render(#[from] RenderError),
    #[error("extrusion failed: {0}")]
    Extrude(#[from] ExtrudeError),
    #[error("generation cancelled")]
    Cancelled,
}

/// A generated monster. The body is also the root of `parts`.
#[derive(Debug, Clone)]
pub struct Monster {
    pub parts: PartTree,
    pub body: ExtrusionHandle,
    /// Contours traced in the mask, including ones not turned into parts.
    pub contour_count: usize,
}

#[derive(Debug, Clone)]
pub enum Generation {
    Monster(Monster),
    /// The scene cast no usable shadow.
    NoSilhouetteFound,
}

impl Generation {
    pub fn monster(self) -> Option<Monster> {
        match self {
            Generation::Monster(m) => Some(m),
            Generation::NoSilhouetteFound => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MonsterPipeline {
    config: PipelineConfig,
    renderer: SceneRenderer,
}

impl MonsterPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            renderer: SceneRenderer::new(config.render),
            config,
        }
    }

    /// Pipeline reusing an existing renderer and its geometry cache.
    pub fn with_renderer(config: PipelineConfig, renderer: SceneRenderer) -> Self {
        Self { config, renderer }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn renderer(&self) -> &SceneRenderer {
        &self.renderer
    }

    pub fn generate(&self, scene: &SceneConfig) -> Result<Generation, PipelineError> {
        self.generate_cancellable(scene, &CancelToken::new())
    }

    #[instrument(skip(self, scene, token), fields(resolution = self.config.resolution))]
    pub fn generate_cancellable(&self, scene: &SceneConfig, token: &CancelToken) -> Result<Generation, PipelineError> {
        self.config.validate()?;
        let mask = self
            .renderer
            .render_cancellable(scene, self.config.resolution, token)
            .map_err(|e| match e {
                RenderError::Cancelled => PipelineError::Cancelled,
                other => PipelineError::Render(other),
            })?;
        self.from_mask(&mask, token)
    }

    /// Run the stages after rendering on an existing mask.
    pub fn generate_from_mask(&self, mask: &Mask) -> Result<Generation, PipelineError> {
        self.from_mask(mask, &CancelToken::new())
    }

    fn from_mask(&self, mask: &Mask, token: &CancelToken) -> Result<Generation, PipelineError> {
        self.config.validate()?;
        check(token)?;
        let contours = extract(mask, self.config.threshold);
        if contours.is_empty() {
            info!("mask has no shadow");
            return Ok(Generation::NoSilhouetteFound);
        }

        check(token)?;
        let mut polygons = self.config.normalizer().normalize_parts(&contours).into_iter();
        let Some(primary) = polygons.next() else {
            info!(contours = contours.len(), "every contour is degenerate");
            return Ok(Generation::NoSilhouetteFound);
        };

        check(token)?;
        let body = extrude(primary, self.config.initial_depth)?;
        let mut parts = PartTree::with_body(body.clone());
        let root = parts.root();
        for (i, polygon) in polygons.enumerate() {
            let handle = extrude(polygon, self.config.initial_depth)?;
            parts.attach(root, Part::new(format!("part{}", i + 1), PartKind::Extruded(handle)));
        }

        info!(
            contours = contours.len(),
            parts = parts.len(),
            body_vertices = body.with_solid(|s| s.vertex_count()),
            "generated monster"
        );
        Ok(Generation::Monster(Monster {
            parts,
            body,
            contour_count: contours.len(),
        }))
    }
}

fn check(token: &CancelToken) -> Result<(), PipelineError> {
    if token.is_cancelled() {
        Err(PipelineError::Cancelled)
    } else {
        Ok(())
    }
}
