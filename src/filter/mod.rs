//! Cascading field → subfield → funder → topic filter and the markers it
//! produces.

pub mod api;
mod fetch;
#[cfg(test)]
pub(crate) mod mock;
mod state;
pub mod visual;

pub use api::{HttpResearchApi, ResearchApi};
pub use fetch::{execute, Fetcher};
pub use state::{CountUnit, FetchRequest, FetchResponse, FilterLevel, FilterOption, FilterState, LevelState, Query};
pub use visual::{MarkerStyle, VisualItem};
