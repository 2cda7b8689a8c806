use glam::DVec3;
use std::f64::consts::PI;

/// Radius of the globe surface in world units
pub const GLOBE_RADIUS: f64 = 100.0;
/// Country fills float just above the surface
pub const FILL_RADIUS: f64 = GLOBE_RADIUS + 0.5;
/// Borders sit above the fills to avoid z-fighting
pub const BORDER_RADIUS: f64 = GLOBE_RADIUS + 1.0;
/// Marker centres
pub const MARKER_RADIUS: f64 = GLOBE_RADIUS + 2.0;

/// Map (latitude, longitude) in degrees onto a sphere of `radius`.
///
/// Longitude is offset by 180° and x is negated so that lon = 0 faces +x
/// and the visual front of the globe matches the camera on +z.
#[inline(always)]
pub fn project(lat: f64, lon: f64, radius: f64) -> DVec3 {
    let phi = (90.0 - lat) * PI / 180.0;
    let theta = (lon + 180.0) * PI / 180.0;
    DVec3::new(
        -radius * phi.sin() * theta.cos(),
        radius * phi.cos(),
        radius * phi.sin() * theta.sin(),
    )
}

/// Inverse of [`project`]: recover (lat, lon) in degrees from a point on any sphere.
pub fn unproject(point: DVec3) -> (f64, f64) {
    let r = point.length();
    if r < 1e-12 {
        return (0.0, 0.0);
    }
    let phi = (point.y / r).clamp(-1.0, 1.0).acos();
    let theta = point.z.atan2(-point.x);
    let lat = 90.0 - phi.to_degrees();
    let lon = theta.to_degrees().rem_euclid(360.0) - 180.0;
    (lat, lon)
}

/// Sample an arc between two surface points, lifted away from the sphere by
/// `lift * sin(pi * t)` so connections read as flight paths.
/// Directions are slerped; the radius is interpolated between the endpoints.
pub fn arc_points(a: DVec3, b: DVec3, lift: f64, steps: usize) -> Vec<DVec3> {
    let steps = steps.max(1);
    let (ra, rb) = (a.length(), b.length());
    let (ua, ub) = (a.normalize_or_zero(), b.normalize_or_zero());

    let angle = ua.dot(ub).clamp(-1.0, 1.0).acos();
    let sin_angle = angle.sin();

    (0..=steps)
        .map(|i| {
            let t = i as f64 / steps as f64;
            let dir = if sin_angle.abs() < 1e-10 {
                // Nearly identical or antipodal: fall back to a straight blend
                ua.lerp(ub, t).normalize_or_zero()
            } else {
                let sa = ((1.0 - t) * angle).sin() / sin_angle;
                let sb = (t * angle).sin() / sin_angle;
                ua * sa + ub * sb
            };
            let radius = ra + (rb - ra) * t + lift * (PI * t).sin();
            dir * radius
        })
        .collect()
}
