use glam::DVec3;

use crate::map::camera::Ray;
use crate::map::projection::GLOBE_RADIUS;
use crate::map::scene::Scene;

/// Result of a priority hit test: markers, then country fills, then the globe
#[derive(Clone, Debug, PartialEq)]
pub enum Pick {
    Marker(usize),
    Country(String),
    Globe,
    Empty,
}

/// Nearest non-negative intersection distance of a ray with a sphere
pub fn ray_sphere(ray: &Ray, center: DVec3, radius: f64) -> Option<f64> {
    let oc = ray.origin - center;
    let b = oc.dot(ray.dir);
    let c = oc.length_squared() - radius * radius;
    let disc = b * b - c;
    if disc < 0.0 {
        return None;
    }
    let sq = disc.sqrt();
    let t0 = -b - sq;
    let t1 = -b + sq;
    if t0 >= 0.0 {
        Some(t0)
    } else if t1 >= 0.0 {
        Some(t1)
    } else {
        None
    }
}

/// Möller–Trumbore, double-sided
pub fn ray_triangle(ray: &Ray, a: DVec3, b: DVec3, c: DVec3) -> Option<f64> {
    const EPS: f64 = 1e-12;
    let e1 = b - a;
    let e2 = c - a;
    let p = ray.dir.cross(e2);
    let det = e1.dot(p);
    if det.abs() < EPS {
        return None;
    }
    let inv = 1.0 / det;
    let s = ray.origin - a;
    let u = s.dot(p) * inv;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let q = s.cross(e1);
    let v = ray.dir.dot(q) * inv;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = e2.dot(q) * inv;
    (t >= 0.0).then_some(t)
}

/// A hit is behind the planet when it lies past its own horizon as seen from
/// the ray origin. Flat fan triangles sag below the globe surface, so this is
/// tested per hit point instead of against the globe sphere.
fn hidden(ray: &Ray, t: f64) -> bool {
    let p = ray.at(t);
    p.dot(ray.origin - p) <= 0.0
}

/// Closest marker along the ray. Ties go to the lower index.
pub fn pick_marker(scene: &Scene, ray: &Ray) -> Option<usize> {
    let mut best: Option<(f64, usize)> = None;
    for (idx, marker) in scene.markers.iter().enumerate() {
        let Some(t) = ray_sphere(ray, marker.position(), marker.size) else {
            continue;
        };
        if hidden(ray, t) {
            continue;
        }
        if best.map_or(true, |(bt, _)| t < bt) {
            best = Some((t, idx));
        }
    }
    best.map(|(_, idx)| idx)
}

/// Country whose fill the ray enters first on the visible side of the globe
pub fn pick_country<'a>(scene: &'a Scene, ray: &Ray) -> Option<&'a str> {
    let mut best: Option<(f64, &str)> = None;

    for mesh in &scene.meshes {
        let fill = &mesh.mesh;
        if ray_sphere(ray, fill.center, fill.bound_radius.max(1e-6)).is_none() {
            continue;
        }
        for tri in &fill.triangles {
            let [a, b, c] = tri.map(|i| fill.vertices[i as usize]);
            let Some(t) = ray_triangle(ray, a, b, c) else {
                continue;
            };
            if hidden(ray, t) {
                continue;
            }
            if best.map_or(true, |(bt, _)| t < bt) {
                best = Some((t, mesh.country.as_str()));
            }
        }
    }
    best.map(|(_, id)| id)
}

/// Full priority hit test
pub fn pick(scene: &Scene, ray: &Ray) -> Pick {
    if let Some(idx) = pick_marker(scene, ray) {
        return Pick::Marker(idx);
    }
    if let Some(id) = pick_country(scene, ray) {
        return Pick::Country(id.to_string());
    }
    if ray_sphere(ray, DVec3::ZERO, GLOBE_RADIUS).is_some() {
        return Pick::Globe;
    }
    Pick::Empty
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgb;
    use crate::map::registry::Country;
    use crate::map::scene::Marker;
    use crate::map::shape::{build_shape, Geometry};

    fn down_z() -> Ray {
        Ray { origin: DVec3::new(0.0, 0.0, 300.0), dir: DVec3::NEG_Z }
    }

    fn country(id: &str) -> Country {
        Country {
            id: id.to_string(),
            name: id.to_string(),
            code: String::new(),
            region: String::new(),
            subregion: String::new(),
            population: 0,
            gdp_billions: 0.0,
            color: Rgb::WHITE,
        }
    }

    /// Square of `size` degrees centred on (lat, lon)
    fn patch(lat: f64, lon: f64, size: f64) -> Geometry {
        let h = size / 2.0;
        Geometry::Polygon(vec![vec![
            (lon - h, lat - h),
            (lon + h, lat - h),
            (lon + h, lat + h),
            (lon - h, lat + h),
            (lon - h, lat - h),
        ]])
    }

    #[test]
    fn test_ray_sphere() {
        let t = ray_sphere(&down_z(), DVec3::ZERO, 100.0).unwrap();
        assert!((t - 200.0).abs() < 1e-9);
        let miss = Ray { origin: DVec3::new(0.0, 200.0, 300.0), dir: DVec3::NEG_Z };
        assert!(ray_sphere(&miss, DVec3::ZERO, 100.0).is_none());
    }

    #[test]
    fn test_ray_triangle_both_windings() {
        let (a, b, c) = (DVec3::new(-1.0, -1.0, 0.0), DVec3::new(1.0, -1.0, 0.0), DVec3::new(0.0, 1.0, 0.0));
        assert!(ray_triangle(&down_z(), a, b, c).is_some());
        assert!(ray_triangle(&down_z(), a, c, b).is_some());
        let off = Ray { origin: DVec3::new(5.0, 0.0, 300.0), dir: DVec3::NEG_Z };
        assert!(ray_triangle(&off, a, b, c).is_none());
    }

    #[test]
    fn test_front_country_beats_back_country() {
        // lon = -90 faces +z, lon = 90 faces -z under the projection convention;
        // patches are offset so the ray misses the fan diagonals
        let mut scene = Scene::new();
        scene.add_country_shape(&country("front"), build_shape(&patch(0.0, -85.0, 20.0)));
        scene.add_country_shape(&country("back"), build_shape(&patch(0.0, 90.0, 20.0)));
        assert_eq!(pick_country(&scene, &down_z()), Some("front"));

        let mut only_back = Scene::new();
        only_back.add_country_shape(&country("back"), build_shape(&patch(0.0, 90.0, 20.0)));
        assert_eq!(pick_country(&only_back, &down_z()), None);
        assert_eq!(pick(&only_back, &down_z()), Pick::Globe);
    }

    #[test]
    fn test_marker_has_priority() {
        let mut scene = Scene::new();
        scene.add_country_shape(&country("front"), build_shape(&patch(0.0, -85.0, 20.0)));
        scene.set_markers(vec![Marker::new(0.0, -90.0, "here", Rgb::WHITE, 3.0)]);
        assert_eq!(pick(&scene, &down_z()), Pick::Marker(0));
    }

    #[test]
    fn test_empty_space() {
        let scene = Scene::new();
        let miss = Ray { origin: DVec3::new(0.0, 250.0, 300.0), dir: DVec3::NEG_Z };
        assert_eq!(pick(&scene, &miss), Pick::Empty);
    }
}
