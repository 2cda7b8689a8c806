use std::time::{Duration, Instant};

use crate::map::camera::Camera;
use crate::map::projection::BORDER_RADIUS;
use crate::map::scene::Scene;

const FPS_WINDOW: Duration = Duration::from_secs(1);

/// Frame timing: delta per frame, FPS resampled once per second
#[derive(Clone, Debug)]
pub struct FrameClock {
    started: Instant,
    last_frame: Instant,
    window_start: Instant,
    frames: u32,
    fps: f64,
}

impl FrameClock {
    pub fn new(now: Instant) -> Self {
        Self {
            started: now,
            last_frame: now,
            window_start: now,
            frames: 0,
            fps: 0.0,
        }
    }

    /// Register a frame and return seconds since the previous one
    pub fn tick(&mut self, now: Instant) -> f64 {
        let dt = now.saturating_duration_since(self.last_frame).as_secs_f64();
        self.last_frame = now;
        self.frames += 1;

        let window = now.saturating_duration_since(self.window_start);
        if window >= FPS_WINDOW {
            self.fps = self.frames as f64 / window.as_secs_f64();
            self.frames = 0;
            self.window_start = now;
        }
        dt
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    /// Seconds since the clock started
    pub fn elapsed(&self, now: Instant) -> f64 {
        now.saturating_duration_since(self.started).as_secs_f64()
    }
}

/// Pulse of marker `index` at time `t` seconds, in [0.5, 1.0]
pub fn glow(t: f64, index: usize) -> f64 {
    0.75 + 0.25 * (t * 3.0 + index as f64).sin()
}

/// Opacity multiplier for a border whose normal has cosine `dot` to the camera
pub fn facing_factor(dot: f64) -> f64 {
    0.25 + 0.75 * dot.max(0.0)
}

/// Constant spin applied while the user is not dragging
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AutoRotate {
    pub enabled: bool,
    /// Radians per second
    pub speed: f64,
}

impl AutoRotate {
    pub fn step(&self, camera: &mut Camera, dt: f64, dragging: bool) {
        if self.enabled && !dragging {
            camera.rotate(self.speed * dt, 0.0);
        }
    }
}

/// Per-frame scene update: border back-face dimming and marker glow
pub fn animate_scene(scene: &mut Scene, camera: &Camera, t: f64) {
    for border in &mut scene.borders {
        border.facing = facing_factor(camera.facing(border.normal * BORDER_RADIUS));
    }
    for (i, marker) in scene.markers.iter_mut().enumerate() {
        marker.glow = glow(t, i);
    }
}
