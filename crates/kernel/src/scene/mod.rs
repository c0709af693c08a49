//! Scene description handed to the renderer.
//!
//! A [`SceneConfig`] is an immutable value snapshot of the room: the camera, one
//! shadow-casting light, the backdrop that receives the shadow, and the room's
//! elements. It is built by the caller and never mutated by rendering.

pub mod element;
pub mod room;
pub mod shape;

use serde::{Deserialize, Serialize};

use crate::geometry::point::Point3d;
use crate::geometry::transform::Transform;
use crate::geometry::vector::Vec3;
use element::{Pose, SceneElement, SceneObject};
use shape::Shape;

pub use element::DecorativeLight;
pub use room::{CanvasPlacement, PROP_TARGET_SIZE};

/// Viewpoint of the room. The capture camera only uses the position; it always
/// looks straight at the backdrop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraPose {
    pub position: Point3d,
    pub euler_angles: Vec3,
}

impl CameraPose {
    pub fn at(position: Point3d) -> Self {
        Self {
            position,
            euler_angles: Vec3::ZERO,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LightKind {
    /// Cone light. `outer_angle_degrees` is the full opening angle of the cone.
    Spot { direction: Vec3, outer_angle_degrees: f64 },
    /// Point light shadowing in every direction.
    Omni,
}

/// The single light whose shadow becomes the silhouette.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShadowLight {
    pub position: Point3d,
    pub kind: LightKind,
}

impl ShadowLight {
    pub fn spot(position: Point3d, direction: Vec3, outer_angle_degrees: f64) -> Self {
        Self {
            position,
            kind: LightKind::Spot {
                direction,
                outer_angle_degrees,
            },
        }
    }

    pub fn omni(position: Point3d) -> Self {
        Self {
            position,
            kind: LightKind::Omni,
        }
    }

    /// Whether `p` lies inside the light's cone. Omni lights reach everything,
    /// and so does a spot whose direction has no length.
    pub fn illuminates(&self, p: &Point3d) -> bool {
        match self.kind {
            LightKind::Omni => true,
            LightKind::Spot {
                direction,
                outer_angle_degrees,
            } => {
                let Some(direction) = direction.normalized() else {
                    return true;
                };
                let to_point = *p - self.position;
                if to_point.length_squared() < 1e-24 {
                    return true;
                }
                let half = (outer_angle_degrees * 0.5).to_radians();
                direction.angle_to(&to_point) <= half
            }
        }
    }
}

/// Flat rectangle receiving the shadow: the local XY plane of `pose`, facing +Z.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Backdrop {
    pub pose: Pose,
    pub width: f64,
    pub height: f64,
}

impl Backdrop {
    pub fn new(pose: Pose, width: f64, height: f64) -> Self {
        Self { pose, width, height }
    }

    pub fn center(&self) -> Point3d {
        self.pose.position
    }

    /// Unit normal pointing into the room.
    pub fn normal(&self) -> Vec3 {
        self.pose
            .to_transform()
            .transform_vector(&Vec3::Z)
            .normalized()
            .unwrap_or(Vec3::Z)
    }

    pub fn shape(&self) -> Shape {
        Shape::Plane {
            width: self.width,
            height: self.height,
        }
    }

    pub fn transform(&self) -> Transform {
        self.pose.to_transform()
    }
}

/// Immutable snapshot of a room, consumed by value-borrow during rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneConfig {
    camera: CameraPose,
    shadow_light: Option<ShadowLight>,
    backdrop: Option<Backdrop>,
    elements: Vec<SceneElement>,
}

impl SceneConfig {
    pub fn new(camera: CameraPose) -> Self {
        Self {
            camera,
            shadow_light: None,
            backdrop: None,
            elements: Vec::new(),
        }
    }

    pub fn with_shadow_light(mut self, light: ShadowLight) -> Self {
        self.shadow_light = Some(light);
        self
    }

    pub fn with_backdrop(mut self, backdrop: Backdrop) -> Self {
        self.backdrop = Some(backdrop);
        self
    }

    pub fn with_element(mut self, element: SceneElement) -> Self {
        self.elements.push(element);
        self
    }

    pub fn with_prop(self, prop: SceneObject) -> Self {
        self.with_element(SceneElement::MovableProp(prop))
    }

    pub fn camera(&self) -> &CameraPose {
        &self.camera
    }

    pub fn shadow_light(&self) -> Option<&ShadowLight> {
        self.shadow_light.as_ref()
    }

    pub fn backdrop(&self) -> Option<&Backdrop> {
        self.backdrop.as_ref()
    }

    pub fn elements(&self) -> &[SceneElement] {
        &self.elements
    }

    pub fn movable_props(&self) -> impl Iterator<Item = &SceneObject> {
        self.elements.iter().filter_map(|e| match e {
            SceneElement::MovableProp(obj) => Some(obj),
            _ => None,
        })
    }
}
