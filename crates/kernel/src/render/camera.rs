use nalgebra::{Isometry3, Perspective3, Point3, Vector3};

use super::raycast::Ray;
use crate::default_tolerance;
use crate::geometry::point::Point3d;
use crate::geometry::vector::Vec3;

/// Square-image pinhole camera used for shadow capture.
#[derive(Debug, Clone)]
pub struct CaptureCamera {
    view: Isometry3<f64>,
    projection: Perspective3<f64>,
}

impl CaptureCamera {
    /// Camera at `eye` looking along `forward`, with a vertical field of view in
    /// degrees. Returns None if `forward` has no length.
    pub fn looking_along(eye: Point3d, forward: Vec3, fov_degrees: f64, near: f64, far: f64) -> Option<Self> {
        let forward = forward.normalized()?;
        let up = if default_tolerance().is_parallel(&forward, &Vec3::Y) {
            Vector3::z()
        } else {
            Vector3::y()
        };
        let eye_na = Point3::new(eye.x, eye.y, eye.z);
        let target = eye_na + Vector3::new(forward.x, forward.y, forward.z);
        Some(Self {
            view: Isometry3::look_at_rh(&eye_na, &target, &up),
            projection: Perspective3::new(1.0, fov_degrees.to_radians(), near, far),
        })
    }

    /// Ray through the center of pixel (`px`, `py`) of a `resolution`² image.
    /// Rows grow downwards.
    pub fn pixel_ray(&self, px: u32, py: u32, resolution: u32) -> Ray {
        let n = f64::from(resolution);
        let ndc_x = 2.0 * (f64::from(px) + 0.5) / n - 1.0;
        let ndc_y = 1.0 - 2.0 * (f64::from(py) + 0.5) / n;

        let near = self.projection.unproject_point(&Point3::new(ndc_x, ndc_y, -1.0));
        let far = self.projection.unproject_point(&Point3::new(ndc_x, ndc_y, 1.0));
        let near = self.view.inverse_transform_point(&near);
        let far = self.view.inverse_transform_point(&far);

        let dir = far - near;
        Ray::new(
            Point3d::new(near.x, near.y, near.z),
            Vec3::new(dir.x, dir.y, dir.z).normalized().unwrap_or(Vec3::Z),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_center_ray_follows_forward() {
        let cam = CaptureCamera::looking_along(Point3d::new(0.0, 5.0, 10.0), -Vec3::Z, 60.0, 0.1, 100.0).unwrap();
        // Even resolution: average the four center pixels.
        let rays = [
            cam.pixel_ray(49, 49, 100),
            cam.pixel_ray(50, 49, 100),
            cam.pixel_ray(49, 50, 100),
            cam.pixel_ray(50, 50, 100),
        ];
        let sum = rays.iter().fold(Vec3::ZERO, |acc, r| acc + r.dir);
        let mean = sum.normalized().unwrap();
        assert!((mean.z + 1.0).abs() < 1e-9);
        assert!((rays[0].origin.z - 9.9).abs() < 1e-6);
    }

    #[test]
    fn test_top_row_looks_up() {
        let cam = CaptureCamera::looking_along(Point3d::ORIGIN, -Vec3::Z, 60.0, 0.1, 100.0).unwrap();
        let top = cam.pixel_ray(50, 0, 101);
        let bottom = cam.pixel_ray(50, 100, 101);
        assert!(top.dir.y > 0.0);
        assert!(bottom.dir.y < 0.0);
        // Half the vertical field of view, less half a pixel.
        let half = top.dir.angle_to(&-Vec3::Z);
        assert!(half < 30f64.to_radians() && half > 29f64.to_radians());
    }

    #[test]
    fn test_vertical_view_uses_z_up() {
        assert!(CaptureCamera::looking_along(Point3d::ORIGIN, -Vec3::Y, 60.0, 0.1, 100.0).is_some());
        assert!(CaptureCamera::looking_along(Point3d::ORIGIN, Vec3::ZERO, 60.0, 0.1, 100.0).is_none());
    }
}
