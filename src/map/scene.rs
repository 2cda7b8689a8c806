use glam::DVec3;
use std::fmt;

use crate::color::Rgb;
use crate::map::dedup::BorderIndex;
use crate::map::projection::{arc_points, project, GLOBE_RADIUS, MARKER_RADIUS};
use crate::map::registry::Country;
use crate::map::shape::{FillMesh, Shape};

/// Opacity borders are drawn with when nothing is highlighting them
pub const BORDER_BASE_OPACITY: f64 = 0.8;

/// One ring of one country, kept only if no neighbour already drew it
#[derive(Clone, Debug)]
pub struct BorderSegment {
    pub country: String,
    pub points: Vec<DVec3>,
    /// Unit direction of the segment's centroid, for back-face dimming
    pub normal: DVec3,
    pub base_color: Rgb,
    pub base_opacity: f64,
    pub color: Rgb,
    pub opacity: f64,
    /// Selected borders are exempt from back-face dimming
    pub emphasized: bool,
    /// Camera-facing factor written by the animation loop, 1.0 = facing
    pub facing: f64,
}

impl BorderSegment {
    /// Opacity after back-face dimming
    pub fn effective_opacity(&self) -> f64 {
        if self.emphasized {
            self.opacity
        } else {
            self.opacity * self.facing
        }
    }
}

/// Triangulated fill owned by exactly one country
#[derive(Clone, Debug)]
pub struct CountryMesh {
    pub country: String,
    pub mesh: FillMesh,
    pub base_color: Rgb,
    pub color: Rgb,
    pub opacity: f64,
}

/// Which kind of research record a marker stands for
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResearchKind {
    Subfield,
    Funder,
    Topic,
}

impl ResearchKind {
    pub const ALL: [ResearchKind; 3] = [ResearchKind::Subfield, ResearchKind::Funder, ResearchKind::Topic];

    /// Fixed per-type marker colour
    pub fn color(self) -> Rgb {
        match self {
            ResearchKind::Subfield => Rgb::from_hex(0x4fc3f7),
            ResearchKind::Funder => Rgb::from_hex(0xba68c8),
            ResearchKind::Topic => Rgb::from_hex(0xffb74d),
        }
    }
}

impl fmt::Display for ResearchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResearchKind::Subfield => "Subfield",
            ResearchKind::Funder => "Funder",
            ResearchKind::Topic => "Topic",
        })
    }
}

/// Research record attached to a filter-driven marker
#[derive(Clone, Debug, PartialEq)]
pub struct ResearchPayload {
    pub kind: ResearchKind,
    pub metric: u64,
    pub record: serde_json::Value,
}

#[derive(Clone, Debug)]
pub struct Marker {
    pub lat: f64,
    pub lon: f64,
    pub label: String,
    pub color: Rgb,
    pub size: f64,
    pub research: Option<ResearchPayload>,
    /// Pulse factor written by the animation loop
    pub glow: f64,
}

impl Marker {
    pub fn new(lat: f64, lon: f64, label: impl Into<String>, color: Rgb, size: f64) -> Self {
        Self {
            lat,
            lon,
            label: label.into(),
            color,
            size,
            research: None,
            glow: 1.0,
        }
    }

    pub fn position(&self) -> DVec3 {
        project(self.lat, self.lon, MARKER_RADIUS)
    }

    /// Tooltip text: plain label, or "label (Type: N works)" for research markers
    pub fn tooltip(&self) -> String {
        match &self.research {
            Some(payload) => format!("{} ({}: {} works)", self.label, payload.kind, payload.metric),
            None => self.label.clone(),
        }
    }
}

/// Arced polyline between two markers
#[derive(Clone, Debug)]
pub struct Connection {
    pub points: Vec<DVec3>,
    pub color: Rgb,
}

/// Everything drawable on the globe
#[derive(Default)]
pub struct Scene {
    pub borders: Vec<BorderSegment>,
    pub meshes: Vec<CountryMesh>,
    pub markers: Vec<Marker>,
    pub connections: Vec<Connection>,
    border_index: BorderIndex,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_borders(&self) -> bool {
        !self.borders.is_empty()
    }

    /// Add a country's fills and whichever of its borders are not shared with
    /// an already added neighbour. Returns the number of borders kept.
    pub fn add_country_shape(&mut self, country: &Country, shape: Shape) -> usize {
        for mesh in shape.fills {
            self.meshes.push(CountryMesh {
                country: country.id.clone(),
                mesh,
                base_color: country.color,
                color: country.color,
                opacity: 0.0,
            });
        }

        let mut kept = 0;
        for points in shape.borders {
            if !self.border_index.insert(&points) {
                continue;
            }
            let centroid = points.iter().copied().sum::<DVec3>() / points.len() as f64;
            self.borders.push(BorderSegment {
                country: country.id.clone(),
                normal: centroid.normalize_or_zero(),
                points,
                base_color: country.color,
                base_opacity: BORDER_BASE_OPACITY,
                color: country.color,
                opacity: BORDER_BASE_OPACITY,
                emphasized: false,
                facing: 1.0,
            });
            kept += 1;
        }
        kept
    }

    /// Current fill opacity of a country (first mesh), if it has any mesh
    pub fn fill_opacity(&self, country: &str) -> Option<f64> {
        self.meshes.iter().find(|m| m.country == country).map(|m| m.opacity)
    }

    /// Mean direction of a country's fills, scaled to the globe surface
    pub fn country_center(&self, country: &str) -> Option<DVec3> {
        let mut sum = DVec3::ZERO;
        let mut count = 0;
        for mesh in self.meshes.iter().filter(|m| m.country == country) {
            sum += mesh.mesh.center.normalize_or_zero();
            count += 1;
        }
        (count > 0 && sum.length_squared() > 0.0).then(|| sum.normalize() * GLOBE_RADIUS)
    }

    pub fn set_fill(&mut self, country: &str, opacity: f64, color: Rgb) {
        for mesh in self.meshes.iter_mut().filter(|m| m.country == country) {
            mesh.opacity = opacity;
            mesh.color = color;
        }
    }

    /// Hide the fill and restore its palette colour
    pub fn reset_fill(&mut self, country: &str) {
        for mesh in self.meshes.iter_mut().filter(|m| m.country == country) {
            mesh.opacity = 0.0;
            mesh.color = mesh.base_color;
        }
    }

    pub fn emphasize_borders(&mut self, country: &str, color: Rgb, opacity: f64) {
        for border in self.borders.iter_mut().filter(|b| b.country == country) {
            border.color = color;
            border.opacity = opacity;
            border.emphasized = true;
        }
    }

    pub fn reset_borders(&mut self, country: &str) {
        for border in self.borders.iter_mut().filter(|b| b.country == country) {
            border.color = border.base_color;
            border.opacity = border.base_opacity;
            border.emphasized = false;
        }
    }

    /// Replace all markers and drop connections that referred to the old set
    pub fn set_markers(&mut self, markers: Vec<Marker>) {
        self.markers = markers;
        self.connections.clear();
    }

    pub fn clear_markers(&mut self) {
        self.markers.clear();
        self.connections.clear();
    }

    /// Arc between two existing markers; out-of-range indices are ignored
    pub fn connect(&mut self, from: usize, to: usize, color: Rgb) {
        let (Some(a), Some(b)) = (self.markers.get(from), self.markers.get(to)) else {
            return;
        };
        let (pa, pb) = (a.position(), b.position());
        let lift = pa.distance(pb) * 0.25;
        self.connections.push(Connection {
            points: arc_points(pa, pb, lift, 32),
            color,
        });
    }
}
