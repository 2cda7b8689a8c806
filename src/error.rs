use thiserror::Error;

/// Failures while pulling data from a collaborator: the REST service or a
/// GeoJSON source
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} returned HTTP {status}")]
    Status { status: u16, url: String },

    #[error("malformed response body: {0}")]
    Decode(#[from] simd_json::Error),

    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid GeoJSON: {0}")]
    GeoJson(#[from] geojson::Error),
}

pub type FetchResult<T> = Result<T, FetchError>;
