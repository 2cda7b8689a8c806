pub mod camera;
pub mod dedup;
mod geometry;
pub mod pick;
pub mod projection;
pub mod registry;
mod renderer;
pub mod scene;
pub mod shape;

pub use camera::Camera;
pub use registry::{Country, CountryRegistry};
pub use renderer::{DisplaySettings, GlobeLayers, GlobeRenderer};
pub use scene::{Marker, ResearchKind, ResearchPayload, Scene};
pub use shape::{GeoFeature, Geometry};
