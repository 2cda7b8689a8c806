use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{FetchError, FetchResult};

/// Accept numeric or string identifiers and keep them as strings
fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Int(i64),
        Float(f64),
        Text(String),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Int(n) => n.to_string(),
        RawId::Float(f) if f.fract() == 0.0 => format!("{}", f as i64),
        RawId::Float(f) => f.to_string(),
        RawId::Text(s) => s,
    })
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldRecord {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub total_works: u64,
    #[serde(default)]
    pub total_funders: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SubfieldRecord {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub works_count: u64,
    /// Funders within the parent field
    #[serde(default)]
    pub funder_count: u64,
    /// Funders across every field
    #[serde(default)]
    pub total_funders: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FunderRecord {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub works_count: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TopicRecord {
    #[serde(rename = "topic_id", deserialize_with = "id_string")]
    pub id: String,
    #[serde(rename = "topic_name")]
    pub name: String,
    #[serde(rename = "topic_works_count", default)]
    pub works_count: u64,
}

/// Every list endpoint wraps its records as `{"count": n, "data": [...]}`
#[derive(Deserialize)]
struct Envelope<T> {
    data: Vec<T>,
}

/// Read side of the research REST service
pub trait ResearchApi: Send + Sync {
    fn fields(&self) -> FetchResult<Vec<FieldRecord>>;
    fn subfields(&self, field_id: &str) -> FetchResult<Vec<SubfieldRecord>>;
    fn funders(&self, subfield_id: &str) -> FetchResult<Vec<FunderRecord>>;
    fn topics(&self, funder_id: &str, subfield_id: &str) -> FetchResult<Vec<TopicRecord>>;
    fn health(&self) -> FetchResult<serde_json::Value>;
}

/// Blocking HTTP client for the research service, used from worker threads
pub struct HttpResearchApi {
    base: String,
    client: reqwest::blocking::Client,
}

impl HttpResearchApi {
    pub fn new(base: impl Into<String>, timeout: Duration) -> FetchResult<Self> {
        let client = reqwest::blocking::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base: base.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> FetchResult<T> {
        let url = format!("{}/{}", self.base, path);
        tracing::debug!("GET {url} {query:?}");

        let resp = self.client.get(&url).query(query).send()?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url,
            });
        }

        let mut body = resp.bytes()?.to_vec();
        Ok(simd_json::serde::from_slice(&mut body)?)
    }

    fn list<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> FetchResult<Vec<T>> {
        let envelope: Envelope<T> = self.get(path, query)?;
        Ok(envelope.data)
    }
}

impl ResearchApi for HttpResearchApi {
    fn fields(&self) -> FetchResult<Vec<FieldRecord>> {
        self.list("fields", &[])
    }

    fn subfields(&self, field_id: &str) -> FetchResult<Vec<SubfieldRecord>> {
        self.list("subfields", &[("field_id", field_id)])
    }

    fn funders(&self, subfield_id: &str) -> FetchResult<Vec<FunderRecord>> {
        self.list("funders", &[("subfield_id", subfield_id)])
    }

    fn topics(&self, funder_id: &str, subfield_id: &str) -> FetchResult<Vec<TopicRecord>> {
        self.list("topics", &[("funder_id", funder_id), ("subfield_id", subfield_id)])
    }

    fn health(&self) -> FetchResult<serde_json::Value> {
        self.get("health", &[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode<T: DeserializeOwned>(text: &str) -> Vec<T> {
        let mut bytes = text.as_bytes().to_vec();
        let envelope: Envelope<T> = simd_json::serde::from_slice(&mut bytes).unwrap();
        envelope.data
    }

    #[test]
    fn test_numeric_and_string_ids() {
        let fields: Vec<FieldRecord> = decode(
            r#"{"count": 2, "data": [
                {"id": 31, "name": "Physics and Astronomy", "total_works": 900, "total_funders": 12},
                {"id": "17", "name": "Computer Science", "total_works": 5, "total_funders": 1}
            ]}"#,
        );
        assert_eq!(fields[0].id, "31");
        assert_eq!(fields[1].id, "17");
        assert_eq!(fields[0].total_funders, 12);
    }

    #[test]
    fn test_funder_string_ids() {
        let funders: Vec<FunderRecord> =
            decode(r#"{"data": [{"id": "https://openalex.org/F4320306076", "name": "NSF", "works_count": 42}]}"#);
        assert_eq!(funders[0].id, "https://openalex.org/F4320306076");
        assert_eq!(funders[0].works_count, 42);
    }

    #[test]
    fn test_topic_field_names() {
        let topics: Vec<TopicRecord> = decode(
            r#"{"count": 1, "data": [{"topic_id": "T10", "topic_name": "Exoplanets", "topic_works_count": 77}]}"#,
        );
        assert_eq!(
            topics[0],
            TopicRecord {
                id: "T10".into(),
                name: "Exoplanets".into(),
                works_count: 77,
            }
        );
    }

    #[test]
    fn test_missing_counts_default_to_zero() {
        let subfields: Vec<SubfieldRecord> = decode(r#"{"data": [{"id": 3103, "name": "Astronomy and Astrophysics"}]}"#);
        assert_eq!(subfields[0].works_count, 0);
        assert_eq!(subfields[0].total_funders, 0);
    }

    #[test]
    fn test_base_url_trimmed() {
        let api = HttpResearchApi::new("http://localhost:5000/api/", Duration::from_secs(1)).unwrap();
        assert_eq!(api.base(), "http://localhost:5000/api");
    }
}
