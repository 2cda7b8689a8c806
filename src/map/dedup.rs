use glam::DVec3;
use std::collections::HashSet;

/// Remembers the endpoints of every border polyline already kept so the
/// shared edge of two neighbouring countries is only drawn once.
///
/// Only the first and last point are compared (after snapping to a 1/1000
/// lattice), so two different borders that happen to share both endpoints
/// collapse into one. Good enough for Natural Earth scale data.
#[derive(Default)]
pub struct BorderIndex {
    seen: HashSet<String>,
}

impl BorderIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// `"x1,y1,z1-x2,y2,z2"` over the first and last point
    pub fn endpoint_key(points: &[DVec3]) -> Option<String> {
        let (first, last) = (points.first()?, points.last()?);
        let (a, b) = (lattice(*first), lattice(*last));
        Some(format!("{},{},{}-{},{},{}", a.0, a.1, a.2, b.0, b.1, b.2))
    }

    /// Record `points` unless it (or its reverse) is already known.
    /// Returns `true` when the polyline should be kept.
    pub fn insert(&mut self, points: &[DVec3]) -> bool {
        let Some(forward) = Self::endpoint_key(points) else {
            return false;
        };
        let reversed: Vec<DVec3> = points.iter().rev().copied().collect();
        let backward = Self::endpoint_key(&reversed).unwrap_or_default();

        if self.seen.contains(&forward) || self.seen.contains(&backward) {
            return false;
        }
        self.seen.insert(forward);
        true
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[inline(always)]
fn lattice(p: DVec3) -> (i64, i64, i64) {
    (
        (p.x * 1000.0).round() as i64,
        (p.y * 1000.0).round() as i64,
        (p.z * 1000.0).round() as i64,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::projection::{project, BORDER_RADIUS};

    fn line(coords: &[(f64, f64)]) -> Vec<DVec3> {
        coords.iter().map(|&(lon, lat)| project(lat, lon, BORDER_RADIUS)).collect()
    }

    #[test]
    fn test_key_format() {
        let key = BorderIndex::endpoint_key(&[DVec3::new(1.0, -0.0004, 2.5), DVec3::new(0.0012, 3.0, -4.0)]).unwrap();
        assert_eq!(key, "1000,0,2500-1,3000,-4000");
    }

    #[test]
    fn test_reversed_ring_is_dropped() {
        let mut index = BorderIndex::new();
        let forward = line(&[(0.0, 0.0), (5.0, 1.0), (10.0, 0.0)]);
        let backward: Vec<DVec3> = forward.iter().rev().copied().collect();

        assert!(index.insert(&forward));
        assert!(!index.insert(&backward));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_identical_ring_is_dropped() {
        let mut index = BorderIndex::new();
        let a = line(&[(0.0, 0.0), (5.0, 1.0), (10.0, 0.0)]);
        assert!(index.insert(&a));
        assert!(!index.insert(&a));
    }

    #[test]
    fn test_tiny_jitter_still_matches() {
        let mut index = BorderIndex::new();
        let a = vec![DVec3::new(1.0, 2.0, 3.0), DVec3::new(4.0, 5.0, 6.0)];
        let b = vec![DVec3::new(4.0001, 5.0, 6.0), DVec3::new(1.0, 2.0002, 3.0)];
        assert!(index.insert(&a));
        assert!(!index.insert(&b));
    }

    #[test]
    fn test_distinct_borders_kept() {
        let mut index = BorderIndex::new();
        assert!(index.insert(&line(&[(0.0, 0.0), (10.0, 0.0)])));
        assert!(index.insert(&line(&[(0.0, 0.0), (0.0, 10.0)])));
        assert!(!index.insert(&[]));
        assert_eq!(index.len(), 2);
    }
}
