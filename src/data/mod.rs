use geojson::feature::Id;
use geojson::{Feature, GeoJson};
use std::fs;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::Duration;

use crate::color::Rgb;
use crate::error::{FetchError, FetchResult};
use crate::map::shape::{build_all, Shape};
use crate::map::{GeoFeature, Geometry, Marker};

/// Where the country outlines come from
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GeoSource {
    File(PathBuf),
    Url(String),
}

impl GeoSource {
    /// `http://` and `https://` locations are URLs, anything else a path
    pub fn parse(location: &str) -> Self {
        if location.starts_with("http://") || location.starts_with("https://") {
            GeoSource::Url(location.to_string())
        } else {
            GeoSource::File(PathBuf::from(location))
        }
    }

    fn read(&self, timeout: Duration) -> FetchResult<Vec<u8>> {
        match self {
            GeoSource::File(path) => Ok(fs::read(path)?),
            GeoSource::Url(url) => {
                let client = reqwest::blocking::Client::builder().timeout(timeout).build()?;
                let resp = client.get(url).send()?;
                let status = resp.status();
                if !status.is_success() {
                    return Err(FetchError::Status {
                        status: status.as_u16(),
                        url: url.clone(),
                    });
                }
                Ok(resp.bytes()?.to_vec())
            }
        }
    }
}

impl std::fmt::Display for GeoSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GeoSource::File(path) => write!(f, "{}", path.display()),
            GeoSource::Url(url) => f.write_str(url),
        }
    }
}

fn to_feature(feature: Feature) -> Option<GeoFeature> {
    let geometry = Geometry::from_geojson(&feature.geometry?.value)?;
    let id = feature.id.map(|id| match id {
        Id::String(s) => s,
        Id::Number(n) => n.to_string(),
    });
    Some(GeoFeature {
        geometry,
        properties: feature.properties.unwrap_or_default(),
        id,
    })
}

/// Decode a GeoJSON document, keeping Polygon and MultiPolygon features
pub fn parse_features(bytes: &mut [u8]) -> FetchResult<Vec<GeoFeature>> {
    let value: serde_json::Value = simd_json::serde::from_slice(bytes)?;
    let features = match GeoJson::from_json_value(value)? {
        GeoJson::FeatureCollection(fc) => fc.features.into_iter().filter_map(to_feature).collect(),
        GeoJson::Feature(f) => to_feature(f).into_iter().collect(),
        GeoJson::Geometry(geometry) => Geometry::from_geojson(&geometry.value)
            .map(|geometry| GeoFeature {
                geometry,
                properties: Default::default(),
                id: None,
            })
            .into_iter()
            .collect(),
    };
    Ok(features)
}

/// Features and their shapes, index-aligned
#[derive(Debug)]
pub struct LoadedGeo {
    pub features: Vec<GeoFeature>,
    pub shapes: Vec<Shape>,
}

/// Read, parse and build shapes for every feature
pub fn load(source: &GeoSource, timeout: Duration) -> FetchResult<LoadedGeo> {
    let mut bytes = source.read(timeout)?;
    let features = parse_features(&mut bytes)?;
    let shapes = build_all(&features);
    tracing::info!("built {} shapes from {source}", shapes.len());
    Ok(LoadedGeo { features, shapes })
}

/// Loads country outlines on a worker thread so the globe stays interactive
pub struct GeoLoader {
    rx: Receiver<FetchResult<LoadedGeo>>,
}

impl GeoLoader {
    pub fn spawn(source: GeoSource, timeout: Duration) -> Self {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let _ = tx.send(load(&source, timeout));
        });
        Self { rx }
    }

    /// The load result, once it is ready
    pub fn poll(&self) -> Option<FetchResult<LoadedGeo>> {
        self.rx.try_recv().ok()
    }

    pub fn wait(&self, timeout: Duration) -> Option<FetchResult<LoadedGeo>> {
        self.rx.recv_timeout(timeout).ok()
    }
}

pub const HUB_COLOR: Rgb = Rgb::from_hex(0xffd54f);
const HUB_SIZE: f64 = 2.0;

/// Major US research hubs, shown until the first filter pass
const RESEARCH_HUBS: [(&str, f64, f64); 8] = [
    ("Cambridge, MA", 42.3601, -71.0942),
    ("Stanford", 37.4275, -122.1697),
    ("Berkeley", 37.8719, -122.2585),
    ("Pasadena", 34.1377, -118.1253),
    ("Chicago", 41.7886, -87.5987),
    ("Princeton", 40.3431, -74.6551),
    ("Seattle", 47.6553, -122.3035),
    ("Austin", 30.2849, -97.7341),
];

/// Hub markers plus the index pairs to connect; every hub links to the first
pub fn sample_markers() -> (Vec<Marker>, Vec<(usize, usize)>) {
    let markers = RESEARCH_HUBS
        .iter()
        .map(|&(name, lat, lon)| Marker::new(lat, lon, name, HUB_COLOR, HUB_SIZE))
        .collect();
    let links = (1..RESEARCH_HUBS.len()).map(|i| (0, i)).collect();
    (markers, links)
}
