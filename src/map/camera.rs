use glam::{DQuat, DVec3};
use std::f64::consts::FRAC_PI_2;

use crate::map::projection::{project, unproject};

/// Closest the camera may dolly towards the globe centre
pub const MIN_DISTANCE: f64 = 150.0;
/// Farthest the camera may dolly away
pub const MAX_DISTANCE: f64 = 500.0;
pub const DEFAULT_DISTANCE: f64 = 300.0;
/// Vertical field of view in degrees
pub const FOV_Y_DEG: f64 = 45.0;
const ZOOM_STEP: f64 = 1.1;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: DVec3,
    pub dir: DVec3,
}

impl Ray {
    pub fn at(&self, t: f64) -> DVec3 {
        self.origin + self.dir * t
    }
}

/// Perspective camera on +z looking at the origin, plus the rotation of the
/// globe's scene graph. Screen coordinates are braille pixels, which are
/// close enough to square that no extra aspect correction is applied.
#[derive(Clone, Debug)]
pub struct Camera {
    /// Scene rotation about x (pitch), clamped to ±π/2
    pub rotation_x: f64,
    /// Scene rotation about y (spin)
    pub rotation_y: f64,
    pub distance: f64,
    pub width: usize,
    pub height: usize,
}

impl Camera {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            rotation_x: 0.0,
            rotation_y: 0.0,
            distance: DEFAULT_DISTANCE,
            width,
            height,
        }
    }

    pub fn set_size(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
    }

    /// Scene-graph orientation: spin first, then pitch
    pub fn orientation(&self) -> DQuat {
        DQuat::from_rotation_x(self.rotation_x) * DQuat::from_rotation_y(self.rotation_y)
    }

    pub fn position(&self) -> DVec3 {
        DVec3::new(0.0, 0.0, self.distance)
    }

    pub fn to_world(&self, local: DVec3) -> DVec3 {
        self.orientation() * local
    }

    pub fn to_local(&self, world: DVec3) -> DVec3 {
        self.orientation().inverse() * world
    }

    /// Rotate the scene by (spin, pitch) radians
    pub fn rotate(&mut self, d_spin: f64, d_pitch: f64) {
        self.rotation_y += d_spin;
        self.rotation_x = (self.rotation_x + d_pitch).clamp(-FRAC_PI_2, FRAC_PI_2);
    }

    pub fn zoom_in(&mut self) {
        self.distance = (self.distance / ZOOM_STEP).max(MIN_DISTANCE);
    }

    pub fn zoom_out(&mut self) {
        self.distance = (self.distance * ZOOM_STEP).min(MAX_DISTANCE);
    }

    /// Zoom normalised so the default distance reads as 1.0x
    pub fn zoom_factor(&self) -> f64 {
        DEFAULT_DISTANCE / self.distance
    }

    fn tan_half_fov(&self) -> f64 {
        (FOV_Y_DEG.to_radians() / 2.0).tan()
    }

    fn aspect(&self) -> f64 {
        self.width.max(1) as f64 / self.height.max(1) as f64
    }

    /// Project a scene-local point to screen pixels.
    /// Returns `None` for points at or behind the camera plane.
    pub fn project_local(&self, local: DVec3) -> Option<(i32, i32)> {
        let view = self.to_world(local) - self.position();
        if view.z > -1e-9 {
            return None;
        }
        let depth = -view.z;
        let ndc_x = view.x / depth / (self.tan_half_fov() * self.aspect());
        let ndc_y = view.y / depth / self.tan_half_fov();

        let px = (ndc_x + 1.0) * 0.5 * self.width as f64;
        let py = (1.0 - ndc_y) * 0.5 * self.height as f64;
        Some((px.round() as i32, py.round() as i32))
    }

    /// World-space ray from the camera through a screen pixel
    pub fn ray(&self, px: i32, py: i32) -> Ray {
        let ndc_x = px as f64 / self.width.max(1) as f64 * 2.0 - 1.0;
        let ndc_y = 1.0 - py as f64 / self.height.max(1) as f64 * 2.0;
        let dir = DVec3::new(
            ndc_x * self.tan_half_fov() * self.aspect(),
            ndc_y * self.tan_half_fov(),
            -1.0,
        )
        .normalize();
        Ray { origin: self.position(), dir }
    }

    /// The same ray expressed in the globe's local frame, where geometry lives
    pub fn local_ray(&self, px: i32, py: i32) -> Ray {
        let world = self.ray(px, py);
        Ray {
            origin: self.to_local(world.origin),
            dir: self.to_local(world.dir),
        }
    }

    /// Cosine between a local surface direction and the direction to the camera.
    /// Positive on the visible hemisphere.
    pub fn facing(&self, local: DVec3) -> f64 {
        let world = self.to_world(local);
        let to_camera = (self.position() - world).normalize_or_zero();
        world.normalize_or_zero().dot(to_camera)
    }

    /// False when a local point lies beyond its own horizon, i.e. behind the planet
    pub fn sees(&self, local: DVec3) -> bool {
        let eye = self.to_local(self.position());
        local.dot(eye - local) > 0.0
    }

    /// On-screen radius in pixels of a sphere of `radius` centred at the origin
    pub fn screen_radius(&self, radius: f64) -> f64 {
        let angular = (radius / self.distance).clamp(0.0, 1.0).asin();
        angular.tan() / self.tan_half_fov() * self.height as f64 / 2.0
    }

    /// Screen pixel of the globe centre
    pub fn center_pixel(&self) -> (i32, i32) {
        ((self.width / 2) as i32, (self.height / 2) as i32)
    }

    /// Rotate so that (lat, lon) faces the camera
    pub fn focus_on(&mut self, lat: f64, lon: f64) {
        let p = project(lat, lon, 1.0);
        let horizontal = (p.x * p.x + p.z * p.z).sqrt();
        self.rotation_y = (-p.x).atan2(p.z);
        self.rotation_x = p.y.atan2(horizontal);
    }

    /// (lat, lon) currently facing the camera
    pub fn center_latlon(&self) -> (f64, f64) {
        unproject(self.to_local(DVec3::Z))
    }

    pub fn reset(&mut self) {
        self.rotation_x = 0.0;
        self.rotation_y = 0.0;
        self.distance = DEFAULT_DISTANCE;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_center_ray_hits_globe_center() {
        let cam = Camera::new(200, 100);
        let ray = cam.ray(100, 50);
        assert_abs_diff_eq!(ray.dir.x, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(ray.dir.y, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(ray.dir.z, -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_project_then_ray_round_trip() {
        let mut cam = Camera::new(160, 120);
        cam.rotate(0.7, -0.3);
        let local = project(20.0, 30.0, 100.0);
        let (px, py) = cam.project_local(local).unwrap();
        let ray = cam.local_ray(px, py);
        // the ray passes within a pixel's worth of the point
        let to_point = local - ray.origin;
        let closest = to_point - ray.dir * to_point.dot(ray.dir);
        assert!(closest.length() < 3.0);
    }

    #[test]
    fn test_focus_on_brings_point_to_front() {
        let mut cam = Camera::new(100, 100);
        for &(lat, lon) in &[(48.0, 2.0), (-33.0, 151.0), (64.0, -150.0)] {
            cam.focus_on(lat, lon);
            let (clat, clon) = cam.center_latlon();
            assert_abs_diff_eq!(clat, lat, epsilon = 1e-6);
            assert_abs_diff_eq!(clon, lon, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_zoom_clamped() {
        let mut cam = Camera::new(100, 100);
        for _ in 0..100 {
            cam.zoom_in();
        }
        assert_eq!(cam.distance, MIN_DISTANCE);
        for _ in 0..100 {
            cam.zoom_out();
        }
        assert_eq!(cam.distance, MAX_DISTANCE);
    }

    #[test]
    fn test_pitch_clamped_and_facing() {
        let mut cam = Camera::new(100, 100);
        cam.rotate(0.0, 10.0);
        assert_eq!(cam.rotation_x, FRAC_PI_2);

        cam.reset();
        assert!(cam.facing(DVec3::Z) > 0.99);
        assert!(cam.facing(-DVec3::Z) < -0.99);
    }
}
