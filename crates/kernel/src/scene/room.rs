use std::f64::consts::FRAC_PI_2;

use serde::{Deserialize, Serialize};

use super::element::{DecorativeLight, Pose, SceneElement, SceneObject};
use super::shape::Shape;
use super::{Backdrop, CameraPose, SceneConfig, ShadowLight};
use crate::geometry::point::Point3d;
use crate::geometry::vector::Vec3;

/// Largest bounding dimension a dropped prop is normalized to, in scene units.
pub const PROP_TARGET_SIZE: f64 = 3.0;

/// Side length of the square room canvas props are dropped onto.
pub const CANVAS_SIZE: f64 = 400.0;

/// Canvas pixels per scene unit.
const CANVAS_PIXELS_PER_UNIT: f64 = 20.0;

impl SceneConfig {
    /// The stock bedroom: a white back wall receiving the flashlight's shadow, two
    /// side walls, a bed, a door and a window.
    pub fn bedroom() -> Self {
        let wall = Shape::Box {
            width: 10.0,
            height: 12.0,
            length: 1.0,
        };
        let yawed = |x, y, z| Pose::at(Point3d::new(x, y, z)).with_euler(0.0, FRAC_PI_2, 0.0);

        SceneConfig::new(CameraPose {
            position: Point3d::new(0.0, 5.0, 10.0),
            euler_angles: Vec3::new(-0.1, 0.0, 0.0),
        })
        .with_shadow_light(ShadowLight::spot(Point3d::new(0.0, 5.0, 10.0), -Vec3::Z, 60.0))
        // Front face of the 1-unit-thick back wall centered at z = -6.
        .with_backdrop(Backdrop::new(Pose::at(Point3d::new(0.0, 0.5, -5.5)), 20.0, 12.0))
        .with_element(SceneElement::FixedRoomElement(
            SceneObject::new(
                "floor",
                Shape::Plane {
                    width: 40.0,
                    height: 40.0,
                },
                Pose::default().with_euler(-FRAC_PI_2, 0.0, 0.0),
            )
            .without_shadow(),
        ))
        .with_element(SceneElement::FixedRoomElement(
            SceneObject::new("wall_left", wall.clone(), yawed(-8.0, 0.5, -1.0)).without_shadow(),
        ))
        .with_element(SceneElement::FixedRoomElement(
            SceneObject::new("wall_right", wall, yawed(8.0, 0.5, -1.0)).without_shadow(),
        ))
        .with_element(SceneElement::FixedRoomElement(SceneObject::new(
            "bed",
            Shape::Box {
                width: 4.0,
                height: 1.0,
                length: 2.0,
            },
            yawed(-4.0, 1.0, 0.0),
        )))
        .with_element(SceneElement::FixedRoomElement(SceneObject::new(
            "door",
            Shape::Box {
                width: 2.0,
                height: 4.0,
                length: 0.1,
            },
            yawed(7.5, 2.0, 0.0),
        )))
        .with_element(SceneElement::FixedRoomElement(SceneObject::new(
            "window",
            Shape::Plane {
                width: 3.0,
                height: 2.0,
            },
            yawed(-7.25, 3.0, -1.0),
        )))
        .with_element(SceneElement::DecorativeLight(DecorativeLight::new(
            "hallway",
            Point3d::new(4.0, 0.2, 1.0),
            0.0,
        )))
    }
}

/// Where a prop was dropped on the room canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanvasPlacement {
    /// Canvas coordinates, origin top-left, `CANVAS_SIZE` on each side.
    pub position: (f64, f64),
    pub rotation_degrees: f64,
    pub scale: f64,
}

impl Default for CanvasPlacement {
    fn default() -> Self {
        Self {
            position: (CANVAS_SIZE / 2.0, CANVAS_SIZE / 2.0),
            rotation_degrees: 0.0,
            scale: 1.0,
        }
    }
}

impl CanvasPlacement {
    /// Floor position in the room. The canvas center maps to the room origin.
    pub fn room_position(&self) -> Point3d {
        let half = CANVAS_SIZE / 2.0;
        Point3d::new(
            (self.position.0 - half) / CANVAS_PIXELS_PER_UNIT,
            0.0,
            (self.position.1 - half) / CANVAS_PIXELS_PER_UNIT,
        )
    }

    /// Turn a prop shape into a movable room object. The shape is first resized so
    /// its largest dimension is `PROP_TARGET_SIZE`, then by the placement scale.
    pub fn place_prop(&self, name: impl Into<String>, shape: Shape) -> SceneObject {
        let max_dim = shape.local_bounds().max_dimension();
        let fit = if max_dim.is_finite() && max_dim > 0.0 {
            PROP_TARGET_SIZE / max_dim
        } else {
            1.0
        };
        let pose = Pose::at(self.room_position())
            .with_euler(0.0, self.rotation_degrees.to_radians(), 0.0)
            .with_scale(fit * self.scale);
        SceneObject::new(name, shape, pose)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bedroom_is_renderable() {
        let room = SceneConfig::bedroom();
        assert!(room.shadow_light().is_some());
        let backdrop = room.backdrop().unwrap();
        assert!((backdrop.center().z + 5.5).abs() < 1e-12);
        assert!((backdrop.normal().z - 1.0).abs() < 1e-12);
        assert_eq!(room.movable_props().count(), 0);

        let shadowless: Vec<&str> = room
            .elements()
            .iter()
            .filter_map(|e| e.object())
            .filter(|o| !o.casts_shadow)
            .map(|o| o.name.as_str())
            .collect();
        assert_eq!(shadowless, vec!["floor", "wall_left", "wall_right"]);
    }

    #[test]
    fn test_canvas_mapping() {
        let placement = CanvasPlacement {
            position: (260.0, 100.0),
            rotation_degrees: 90.0,
            scale: 1.0,
        };
        let p = placement.room_position();
        assert!((p.x - 3.0).abs() < 1e-12);
        assert!(p.y.abs() < 1e-12);
        assert!((p.z + 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_place_prop_normalizes_size() {
        let placement = CanvasPlacement {
            scale: 2.0,
            ..CanvasPlacement::default()
        };
        let obj = placement.place_prop(
            "crate",
            Shape::Box {
                width: 6.0,
                height: 1.0,
                length: 1.0,
            },
        );
        assert!((obj.pose.scale - 1.0).abs() < 1e-12);
        assert!(obj.casts_shadow);
    }

    #[test]
    fn test_place_prop_zero_size_left_unscaled() {
        let obj = CanvasPlacement::default().place_prop("speck", Shape::Sphere { radius: 0.0 });
        assert!((obj.pose.scale - 1.0).abs() < 1e-12);
    }
}
