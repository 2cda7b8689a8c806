use crate::braille::BrailleCanvas;
use crate::color::Rgb;
use crate::map::camera::Camera;
use crate::map::geometry::{draw_circle, draw_line, draw_ring, fill_triangle};
use crate::map::projection::GLOBE_RADIUS;
use crate::map::scene::Scene;

/// Display settings for globe layers
#[derive(Clone)]
pub struct DisplaySettings {
    pub show_borders: bool,
    pub show_markers: bool,
    pub show_labels: bool,
    pub inner_glow: bool,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            show_borders: true,
            show_markers: true,
            show_labels: true,
            inner_glow: false,
        }
    }
}

/// Rendered braille layers, drawn back to front by the UI
pub struct GlobeLayers {
    pub surface: BrailleCanvas,
    pub fills: BrailleCanvas,
    pub borders: BrailleCanvas,
    pub overlay: BrailleCanvas,
    /// (column, row, text) in character cells
    pub labels: Vec<(u16, u16, String)>,
}

/// Rasterises a [`Scene`] through a [`Camera`] into braille layers
pub struct GlobeRenderer {
    pub settings: DisplaySettings,
    pub globe_color: Rgb,
}

impl GlobeRenderer {
    pub fn new(globe_color: Rgb) -> Self {
        Self {
            settings: DisplaySettings::default(),
            globe_color,
        }
    }

    /// Render every layer for a canvas of `cols` x `rows` characters
    pub fn render(&self, scene: &Scene, camera: &Camera, cols: usize, rows: usize) -> GlobeLayers {
        let mut layers = GlobeLayers {
            surface: BrailleCanvas::new(cols, rows),
            fills: BrailleCanvas::new(cols, rows),
            borders: BrailleCanvas::new(cols, rows),
            overlay: BrailleCanvas::new(cols, rows),
            labels: Vec::new(),
        };

        self.draw_surface(&mut layers.surface, camera);
        self.draw_fills(&mut layers.fills, scene, camera);
        if self.settings.show_borders {
            self.draw_borders(&mut layers.borders, scene, camera);
        }
        if self.settings.show_markers {
            self.draw_connections(&mut layers.overlay, scene, camera);
            self.draw_markers(&mut layers, scene, camera);
        }
        layers
    }

    /// Globe limb, plus an inner rim when glow is on
    fn draw_surface(&self, canvas: &mut BrailleCanvas, camera: &Camera) {
        let (cx, cy) = camera.center_pixel();
        let radius = camera.screen_radius(GLOBE_RADIUS);
        draw_ring(canvas, cx, cy, radius.round() as i32, self.globe_color);
        if self.settings.inner_glow {
            let glow = self.globe_color.mix(Rgb::WHITE, 0.3).scaled(0.6);
            draw_ring(canvas, cx, cy, (radius * 0.96).round() as i32, glow);
            draw_ring(canvas, cx, cy, (radius * 0.92).round() as i32, glow.scaled(0.6));
        }
    }

    /// Only hovered/selected countries have a visible fill
    fn draw_fills(&self, canvas: &mut BrailleCanvas, scene: &Scene, camera: &Camera) {
        for mesh in scene.meshes.iter().filter(|m| m.opacity > 0.0) {
            if camera.facing(mesh.mesh.center) <= 0.0 {
                continue;
            }
            let color = mesh.color.scaled(mesh.opacity);
            let screen: Vec<Option<(i32, i32)>> = mesh
                .mesh
                .vertices
                .iter()
                .map(|&v| camera.project_local(v))
                .collect();
            for tri in &mesh.mesh.triangles {
                let [a, b, c] = tri.map(|i| screen[i as usize]);
                if let (Some(a), Some(b), Some(c)) = (a, b, c) {
                    fill_triangle(canvas, a, b, c, color);
                }
            }
        }
    }

    /// Far-side segments first so near-side cells win
    fn draw_borders(&self, canvas: &mut BrailleCanvas, scene: &Scene, camera: &Camera) {
        let mut order: Vec<usize> = (0..scene.borders.len()).collect();
        order.sort_by(|&a, &b| scene.borders[a].facing.total_cmp(&scene.borders[b].facing));

        for idx in order {
            let border = &scene.borders[idx];
            let color = border.color.scaled(border.effective_opacity());
            self.draw_polyline(canvas, border.points.iter().map(|&p| camera.project_local(p)), camera, color);
        }
    }

    fn draw_connections(&self, canvas: &mut BrailleCanvas, scene: &Scene, camera: &Camera) {
        for connection in &scene.connections {
            let points = connection
                .points
                .iter()
                .map(|&p| if camera.sees(p) { camera.project_local(p) } else { None });
            self.draw_polyline(canvas, points, camera, connection.color.scaled(0.7));
        }
    }

    fn draw_markers(&self, layers: &mut GlobeLayers, scene: &Scene, camera: &Camera) {
        let pixels_per_unit = camera.screen_radius(GLOBE_RADIUS) / GLOBE_RADIUS;
        let show_labels = self.settings.show_labels && camera.zoom_factor() >= 1.5;

        for marker in &scene.markers {
            let position = marker.position();
            if !camera.sees(position) {
                continue;
            }
            let Some((px, py)) = camera.project_local(position) else {
                continue;
            };
            let radius = ((marker.size * pixels_per_unit).round() as i32).max(1);
            draw_circle(&mut layers.overlay, px, py, radius, marker.color.scaled(marker.glow));

            if show_labels && px >= 0 && py >= 0 {
                let char_x = ((px + radius) / 2) as u16;
                let char_y = (py / 4) as u16;
                if let Some(label_x) = char_x.checked_add(1) {
                    layers.labels.push((label_x, char_y, marker.label.clone()));
                }
            }
        }
    }

    /// Connect consecutive projected points, breaking at hidden ones and at
    /// jumps wider than the canvas
    fn draw_polyline(
        &self,
        canvas: &mut BrailleCanvas,
        points: impl Iterator<Item = Option<(i32, i32)>>,
        camera: &Camera,
        color: Rgb,
    ) {
        let mut prev: Option<(i32, i32)> = None;
        for point in points {
            if let (Some((x0, y0)), Some((x1, y1))) = (prev, point) {
                let dist = ((x1 - x0).abs() + (y1 - y0).abs()) as usize;
                if dist < camera.width && line_might_be_visible(camera, (x0, y0), (x1, y1)) {
                    draw_line(canvas, x0, y0, x1, y1, color);
                }
            }
            prev = point;
        }
    }

    pub fn toggle_borders(&mut self) {
        self.settings.show_borders = !self.settings.show_borders;
    }

    pub fn toggle_glow(&mut self) {
        self.settings.inner_glow = !self.settings.inner_glow;
    }

    pub fn toggle_markers(&mut self) {
        self.settings.show_markers = !self.settings.show_markers;
    }

    pub fn toggle_labels(&mut self) {
        self.settings.show_labels = !self.settings.show_labels;
    }
}

/// Rough bounding-box check against the canvas
fn line_might_be_visible(camera: &Camera, p1: (i32, i32), p2: (i32, i32)) -> bool {
    let min_x = p1.0.min(p2.0);
    let max_x = p1.0.max(p2.0);
    let min_y = p1.1.min(p2.1);
    let max_y = p1.1.max(p2.1);

    max_x >= 0 && min_x < camera.width as i32 && max_y >= 0 && min_y < camera.height as i32
}
