use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::shape::Shape;
use crate::geometry::point::Point3d;
use crate::geometry::transform::Transform;
use crate::geometry::vector::Vec3;

/// Placement of an element in the room.
///
/// Euler angles are in radians (pitch about X, yaw about Y, roll about Z) and are
/// applied roll first, then yaw, then pitch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Point3d,
    pub euler_angles: Vec3,
    pub scale: f64,
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            position: Point3d::ORIGIN,
            euler_angles: Vec3::ZERO,
            scale: 1.0,
        }
    }
}

impl Pose {
    pub fn at(position: Point3d) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    pub fn with_euler(mut self, pitch: f64, yaw: f64, roll: f64) -> Self {
        self.euler_angles = Vec3::new(pitch, yaw, roll);
        self
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    /// World-from-local transform.
    pub fn to_transform(&self) -> Transform {
        let p = self.position;
        Transform::translation(p.x, p.y, p.z)
            .then(&Transform::rotation_x(self.euler_angles.x))
            .then(&Transform::rotation_y(self.euler_angles.y))
            .then(&Transform::rotation_z(self.euler_angles.z))
            .then(&Transform::uniform_scaling(self.scale))
    }
}

/// An opaque piece of geometry in the room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneObject {
    pub id: Uuid,
    pub name: String,
    pub shape: Shape,
    pub pose: Pose,
    /// Whether the object blocks the shadow light. Objects that do not still hide
    /// whatever lies behind them from the camera.
    pub casts_shadow: bool,
}

impl SceneObject {
    pub fn new(name: impl Into<String>, shape: Shape, pose: Pose) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            shape,
            pose,
            casts_shadow: true,
        }
    }

    pub fn without_shadow(mut self) -> Self {
        self.casts_shadow = false;
        self
    }
}

/// A light that decorates the room but never takes part in shadow capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecorativeLight {
    pub id: Uuid,
    pub name: String,
    pub position: Point3d,
    pub intensity: f64,
}

impl DecorativeLight {
    pub fn new(name: impl Into<String>, position: Point3d, intensity: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            position,
            intensity,
        }
    }
}

/// Everything the room UI can place in a scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SceneElement {
    /// Part of the room itself (walls, furniture); never dragged by the user.
    FixedRoomElement(SceneObject),
    /// A prop the user placed and may move.
    MovableProp(SceneObject),
    DecorativeLight(DecorativeLight),
}

impl SceneElement {
    pub fn id(&self) -> Uuid {
        match self {
            SceneElement::FixedRoomElement(obj) | SceneElement::MovableProp(obj) => obj.id,
            SceneElement::DecorativeLight(light) => light.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            SceneElement::FixedRoomElement(obj) | SceneElement::MovableProp(obj) => &obj.name,
            SceneElement::DecorativeLight(light) => &light.name,
        }
    }

    /// The opaque geometry of this element, if it has any.
    pub fn object(&self) -> Option<&SceneObject> {
        match self {
            SceneElement::FixedRoomElement(obj) | SceneElement::MovableProp(obj) => Some(obj),
            SceneElement::DecorativeLight(_) => None,
        }
    }

    pub fn is_movable(&self) -> bool {
        matches!(self, SceneElement::MovableProp(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_pose_transform_order() {
        // Scale, then yaw a quarter turn, then translate.
        let pose = Pose::at(Point3d::new(1.0, 0.0, 0.0))
            .with_euler(0.0, FRAC_PI_2, 0.0)
            .with_scale(2.0);
        let p = pose.to_transform().transform_point(&Point3d::new(1.0, 0.0, 0.0));
        assert!((p.x - 1.0).abs() < 1e-12);
        assert!((p.z + 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_element_dispatch() {
        let prop = SceneElement::MovableProp(SceneObject::new(
            "lamp",
            Shape::Sphere { radius: 1.0 },
            Pose::default(),
        ));
        let light = SceneElement::DecorativeLight(DecorativeLight::new("hallway", Point3d::ORIGIN, 0.0));
        assert!(prop.is_movable());
        assert!(prop.object().is_some());
        assert!(!light.is_movable());
        assert!(light.object().is_none());
        assert_eq!(light.name(), "hallway");
    }
}
