use geojson::{JsonObject, Value};
use glam::DVec3;
use rayon::prelude::*;

use crate::map::projection::{project, BORDER_RADIUS, FILL_RADIUS};

/// Closed contour of (longitude, latitude) pairs
pub type Ring = Vec<(f64, f64)>;

/// Country outline, one variant per supported GeoJSON geometry type
#[derive(Clone, Debug, PartialEq)]
pub enum Geometry {
    Polygon(Vec<Ring>),
    MultiPolygon(Vec<Vec<Ring>>),
}

impl Geometry {
    /// Convert a GeoJSON geometry value. Anything other than
    /// Polygon/MultiPolygon is not a country outline and yields `None`.
    pub fn from_geojson(value: &Value) -> Option<Self> {
        match value {
            Value::Polygon(rings) => Some(Geometry::Polygon(rings.iter().map(|r| to_ring(r)).collect())),
            Value::MultiPolygon(polygons) => Some(Geometry::MultiPolygon(
                polygons
                    .iter()
                    .map(|rings| rings.iter().map(|r| to_ring(r)).collect())
                    .collect(),
            )),
            _ => None,
        }
    }

    /// Each constituent polygon as its ring list (outer ring first)
    pub fn polygons(&self) -> Vec<&[Ring]> {
        match self {
            Geometry::Polygon(rings) => vec![rings.as_slice()],
            Geometry::MultiPolygon(polygons) => polygons.iter().map(|p| p.as_slice()).collect(),
        }
    }
}

/// Positions with fewer than two ordinates are dropped
fn to_ring(positions: &[Vec<f64>]) -> Ring {
    positions
        .iter()
        .filter(|p| p.len() >= 2)
        .map(|p| (p[0], p[1]))
        .collect()
}

/// One feature of the border collection
#[derive(Clone, Debug)]
pub struct GeoFeature {
    pub geometry: Geometry,
    pub properties: JsonObject,
    pub id: Option<String>,
}

/// Fan-triangulated fill for one outer ring
#[derive(Clone, Debug)]
pub struct FillMesh {
    pub vertices: Vec<DVec3>,
    pub triangles: Vec<[u32; 3]>,
    /// Centre and radius of a sphere enclosing every vertex (picking broad phase)
    pub center: DVec3,
    pub bound_radius: f64,
}

/// Renderable geometry built from one feature
#[derive(Clone, Debug, Default)]
pub struct Shape {
    pub fills: Vec<FillMesh>,
    pub borders: Vec<Vec<DVec3>>,
}

/// Triangles of a fan anchored at vertex 0: (0, i, i+1) for i in 1..=n-2.
/// Exact only for convex rings; concave outlines may overfill.
pub fn fan_triangulate(n: usize) -> Vec<[u32; 3]> {
    if n < 3 {
        return Vec::new();
    }
    (1..n - 1).map(|i| [0, i as u32, i as u32 + 1]).collect()
}

/// Project a ring onto the fill sphere and triangulate it.
/// Rings with fewer than three points are skipped.
pub fn build_fill(ring: &[(f64, f64)], radius: f64) -> Option<FillMesh> {
    if ring.len() < 3 {
        return None;
    }
    let vertices: Vec<DVec3> = ring.iter().map(|&(lon, lat)| project(lat, lon, radius)).collect();

    let mean = vertices.iter().copied().sum::<DVec3>() / vertices.len() as f64;
    let center = mean.normalize_or_zero() * radius;
    let bound_radius = vertices
        .iter()
        .map(|v| v.distance(center))
        .fold(0.0_f64, f64::max);

    Some(FillMesh {
        triangles: fan_triangulate(vertices.len()),
        vertices,
        center,
        bound_radius,
    })
}

/// Project a ring onto the border sphere as a polyline.
/// Rings with fewer than three points are skipped.
pub fn build_border(ring: &[(f64, f64)], radius: f64) -> Option<Vec<DVec3>> {
    if ring.len() < 3 {
        return None;
    }
    Some(ring.iter().map(|&(lon, lat)| project(lat, lon, radius)).collect())
}

/// Build fills from the first ring of every polygon and borders from every ring
pub fn build_shape(geometry: &Geometry) -> Shape {
    let mut shape = Shape::default();
    for rings in geometry.polygons() {
        if let Some(fill) = rings.first().and_then(|outer| build_fill(outer, FILL_RADIUS)) {
            shape.fills.push(fill);
        }
        shape
            .borders
            .extend(rings.iter().filter_map(|ring| build_border(ring, BORDER_RADIUS)));
    }
    shape
}

/// Build every feature's shape in parallel, preserving input order
pub fn build_all(features: &[GeoFeature]) -> Vec<Shape> {
    features.par_iter().map(|f| build_shape(&f.geometry)).collect()
}
