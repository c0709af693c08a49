//! Off-screen shadow capture.
//!
//! [`SceneRenderer`] casts one ray per pixel from a camera that faces the
//! backdrop. Everything is flat white except backdrop points the shadow light
//! cannot reach, which darken towards the shadow luma. The result is a grayscale
//! [`Mask`] whose dark region is the silhouette.

pub mod cache;
pub mod camera;
pub mod raycast;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use image::GrayImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::default_tolerance;
use crate::geometry::point::Point3d;
use crate::geometry::vector::Vec3;
use crate::mask::Mask;
use crate::scene::{LightKind, SceneConfig, ShadowLight};
use cache::GeometryCache;
use camera::CaptureCamera;
use raycast::{Instance, PreparedMesh, Ray};

/// Largest accepted mask side length.
pub const MAX_RESOLUTION: u32 = 8192;

/// Mask side length used when the caller has no preference.
pub const DEFAULT_RESOLUTION: u32 = 2048;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("scene has no shadow-casting light")]
    MissingShadowCaster,
    #[error("scene has no backdrop to receive the shadow")]
    MissingBackdrop,
    #[error("invalid mask resolution {0} (expected 1..={MAX_RESOLUTION})")]
    InvalidResolution(u32),
    #[error("render cancelled")]
    Cancelled,
}

/// Shading parameters of the capture pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Radius of the light's sampling disk. Zero gives hard shadows.
    pub softness: f64,
    pub lit_luma: u8,
    pub shadow_luma: u8,
    /// Luma of rays that hit nothing.
    pub background_luma: u8,
    pub fov_degrees: f64,
    pub near: f64,
    pub far: f64,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            softness: 0.1,
            lit_luma: 255,
            shadow_luma: 0,
            background_luma: 255,
            fov_degrees: 60.0,
            near: 0.1,
            far: 100.0,
        }
    }
}

impl RenderSettings {
    /// Single shadow sample per pixel; every shadowed pixel is fully dark.
    pub fn hard_shadows() -> Self {
        Self {
            softness: 0.0,
            ..Self::default()
        }
    }
}

/// Cooperative cancellation flag shared between a request and its owner.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Renders scenes to masks. Clones share the geometry cache.
#[derive(Debug, Clone, Default)]
pub struct SceneRenderer {
    settings: RenderSettings,
    cache: Arc<GeometryCache>,
}

/// Scene state owned by a single render request.
struct PreparedScene {
    camera: CaptureCamera,
    light: ShadowLight,
    backdrop: Instance,
    /// Every solid element; all of them block the camera.
    objects: Vec<Instance>,
}

enum Hit {
    Backdrop(Point3d),
    Object,
    Nothing,
}

impl SceneRenderer {
    pub fn new(settings: RenderSettings) -> Self {
        Self {
            settings,
            cache: Arc::new(GeometryCache::new()),
        }
    }

    pub fn with_cache(settings: RenderSettings, cache: Arc<GeometryCache>) -> Self {
        Self { settings, cache }
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    pub fn cache(&self) -> &Arc<GeometryCache> {
        &self.cache
    }

    pub fn render(&self, config: &SceneConfig, resolution: u32) -> Result<Mask, RenderError> {
        self.render_cancellable(config, resolution, &CancelToken::new())
    }

    /// Render, polling `token` before every row.
    #[instrument(skip(self, config, token))]
    pub fn render_cancellable(
        &self,
        config: &SceneConfig,
        resolution: u32,
        token: &CancelToken,
    ) -> Result<Mask, RenderError> {
        let scene = self.prepare(config, resolution)?;
        let taps = light_taps(&scene.light, self.settings.softness);

        let mut image = GrayImage::new(resolution, resolution);
        for py in 0..resolution {
            if token.is_cancelled() {
                debug!(row = py, "render cancelled");
                return Err(RenderError::Cancelled);
            }
            for px in 0..resolution {
                let ray = scene.camera.pixel_ray(px, py, resolution);
                let luma = match scene.trace(&ray, self.settings.far) {
                    Hit::Nothing => self.settings.background_luma,
                    Hit::Object => self.settings.lit_luma,
                    Hit::Backdrop(p) => self.shade_backdrop(&scene, &p, &taps),
                };
                image.put_pixel(px, py, image::Luma([luma]));
            }
        }

        let mask = Mask::from_image(image);
        info!(
            resolution,
            shadow_pixels = mask.count_below(self.settings.lit_luma),
            cached_shapes = self.cache.len(),
            "rendered shadow mask"
        );
        Ok(mask)
    }

    fn prepare(&self, config: &SceneConfig, resolution: u32) -> Result<PreparedScene, RenderError> {
        let light = *config.shadow_light().ok_or(RenderError::MissingShadowCaster)?;
        let backdrop = config.backdrop().ok_or(RenderError::MissingBackdrop)?;
        if resolution == 0 || resolution > MAX_RESOLUTION {
            return Err(RenderError::InvalidResolution(resolution));
        }

        let backdrop_mesh = Arc::new(PreparedMesh::from_shape(&backdrop.shape()));
        let backdrop_instance =
            Instance::new(backdrop_mesh, &backdrop.transform(), false).ok_or(RenderError::MissingBackdrop)?;

        let camera = CaptureCamera::looking_along(
            config.camera().position,
            -backdrop.normal(),
            self.settings.fov_degrees,
            self.settings.near,
            self.settings.far,
        )
        .ok_or(RenderError::MissingBackdrop)?;

        let mut objects = Vec::new();
        for element in config.elements() {
            let Some(obj) = element.object() else {
                continue;
            };
            let mesh = self.cache.get_or_prepare(&obj.shape);
            match Instance::new(mesh, &obj.pose.to_transform(), obj.casts_shadow) {
                Some(instance) => objects.push(instance),
                None => warn!(name = %obj.name, "skipping element with singular pose"),
            }
        }

        Ok(PreparedScene {
            camera,
            light,
            backdrop: backdrop_instance,
            objects,
        })
    }

    fn shade_backdrop(&self, scene: &PreparedScene, p: &Point3d, taps: &[Point3d]) -> u8 {
        let lit = self.settings.lit_luma;
        if !scene.light.illuminates(p) {
            return lit;
        }
        let blocked = taps
            .iter()
            .filter(|tap| {
                let ray = Ray::new(*p, **tap - *p);
                scene
                    .objects
                    .iter()
                    .any(|o| o.casts_shadow && o.occludes(&ray, 1.0))
            })
            .count();
        if blocked == 0 {
            return lit;
        }
        let fraction = blocked as f64 / taps.len() as f64;
        let shadow = self.settings.shadow_luma;
        let luma = f64::from(lit) - fraction * (f64::from(lit) - f64::from(shadow));
        luma.round().clamp(0.0, 255.0) as u8
    }
}

impl PreparedScene {
    fn trace(&self, ray: &Ray, far: f64) -> Hit {
        let mut nearest = far;
        let mut hit = Hit::Nothing;
        if let Some(t) = self.backdrop.intersect(ray, nearest) {
            nearest = t;
            hit = Hit::Backdrop(ray.at(t));
        }
        for object in &self.objects {
            if let Some(t) = object.intersect(ray, nearest) {
                nearest = t;
                hit = Hit::Object;
            }
        }
        hit
    }
}

/// Sample points on the light: its center plus four points on a disk of radius
/// `softness` perpendicular to the light's axis.
fn light_taps(light: &ShadowLight, softness: f64) -> Vec<Point3d> {
    if softness <= 0.0 {
        return vec![light.position];
    }
    let axis = match light.kind {
        LightKind::Spot { direction, .. } => direction.normalized().unwrap_or(-Vec3::Z),
        LightKind::Omni => -Vec3::Z,
    };
    let helper = if default_tolerance().is_parallel(&axis, &Vec3::Y) { Vec3::X } else { Vec3::Y };
    let u = axis.cross(&helper).normalized().unwrap_or(Vec3::X);
    let v = axis.cross(&u);
    let c = light.position;
    vec![c, c + u * softness, c - u * softness, c + v * softness, c - v * softness]
}
