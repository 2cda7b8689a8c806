use crate::error::{FetchError, FetchResult};
use crate::filter::api::{FieldRecord, FunderRecord, ResearchApi, SubfieldRecord, TopicRecord};

/// In-memory research service for tests
pub struct MockApi {
    fail: bool,
}

impl MockApi {
    pub fn astronomy() -> Self {
        Self { fail: false }
    }

    pub fn failing() -> Self {
        Self { fail: true }
    }

    fn check(&self, path: &str) -> FetchResult<()> {
        if self.fail {
            Err(FetchError::Status {
                status: 503,
                url: format!("mock://{path}"),
            })
        } else {
            Ok(())
        }
    }
}

impl ResearchApi for MockApi {
    fn fields(&self) -> FetchResult<Vec<FieldRecord>> {
        self.check("fields")?;
        Ok(vec![
            FieldRecord {
                id: "31".into(),
                name: "Physics and Astronomy".into(),
                total_works: 5000,
                total_funders: 40,
            },
            FieldRecord {
                id: "17".into(),
                name: "Computer Science".into(),
                total_works: 8000,
                total_funders: 55,
            },
        ])
    }

    fn subfields(&self, field_id: &str) -> FetchResult<Vec<SubfieldRecord>> {
        self.check("subfields")?;
        if field_id != "31" {
            return Ok(Vec::new());
        }
        Ok(vec![
            SubfieldRecord {
                id: "3103".into(),
                name: "Astronomy and Astrophysics".into(),
                works_count: 1200,
                funder_count: 12,
                total_funders: 15,
            },
            SubfieldRecord {
                id: "3106".into(),
                name: "Nuclear and High Energy Physics".into(),
                works_count: 900,
                funder_count: 8,
                total_funders: 9,
            },
        ])
    }

    fn funders(&self, subfield_id: &str) -> FetchResult<Vec<FunderRecord>> {
        self.check("funders")?;
        if subfield_id != "3103" {
            return Ok(Vec::new());
        }
        Ok(vec![
            FunderRecord {
                id: "F1".into(),
                name: "National Science Foundation".into(),
                works_count: 500,
            },
            FunderRecord {
                id: "F2".into(),
                name: "NASA".into(),
                works_count: 800,
            },
        ])
    }

    fn topics(&self, funder_id: &str, subfield_id: &str) -> FetchResult<Vec<TopicRecord>> {
        self.check("topics")?;
        if funder_id != "F1" || subfield_id != "3103" {
            return Ok(Vec::new());
        }
        Ok(vec![
            TopicRecord {
                id: "T1".into(),
                name: "Exoplanet Detection".into(),
                works_count: 100,
            },
            TopicRecord {
                id: "T2".into(),
                name: "Dark Matter".into(),
                works_count: 50,
            },
        ])
    }

    fn health(&self) -> FetchResult<serde_json::Value> {
        self.check("health")?;
        Ok(serde_json::json!({"status": "healthy"}))
    }
}
