use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::error::FetchResult;
use crate::filter::api::ResearchApi;
use crate::filter::state::{FetchRequest, FetchResponse, FilterOption, Query};

/// Run one query against the service and convert the records to options
pub fn execute(api: &dyn ResearchApi, query: &Query) -> FetchResult<Vec<FilterOption>> {
    Ok(match query {
        Query::Fields => api.fields()?.into_iter().map(FilterOption::from).collect(),
        Query::Subfields { field_id } => api.subfields(field_id)?.into_iter().map(FilterOption::from).collect(),
        Query::Funders { subfield_id } => api.funders(subfield_id)?.into_iter().map(FilterOption::from).collect(),
        Query::Topics { funder_id, subfield_id } => api
            .topics(funder_id, subfield_id)?
            .into_iter()
            .map(FilterOption::from)
            .collect(),
    })
}

/// Runs each fetch on its own worker thread. Responses are collected on the
/// owning thread with [`Fetcher::drain`] so filter state is only ever mutated
/// there.
pub struct Fetcher {
    api: Arc<dyn ResearchApi>,
    tx: Sender<FetchResponse>,
    rx: Receiver<FetchResponse>,
    in_flight: usize,
}

impl Fetcher {
    pub fn new(api: Arc<dyn ResearchApi>) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            api,
            tx,
            rx,
            in_flight: 0,
        }
    }

    pub fn api(&self) -> Arc<dyn ResearchApi> {
        Arc::clone(&self.api)
    }

    pub fn spawn(&mut self, request: FetchRequest) {
        let api = Arc::clone(&self.api);
        let tx = self.tx.clone();
        tracing::debug!("fetching {:?} (generation {})", request.query, request.generation);
        thread::spawn(move || {
            let result = execute(api.as_ref(), &request.query);
            let _ = tx.send(FetchResponse {
                level: request.level,
                generation: request.generation,
                result,
            });
        });
        self.in_flight += 1;
    }

    /// Every response that has arrived, without blocking
    pub fn drain(&mut self) -> Vec<FetchResponse> {
        let responses: Vec<FetchResponse> = self.rx.try_iter().collect();
        self.in_flight = self.in_flight.saturating_sub(responses.len());
        responses
    }

    /// Block for the next response, up to `timeout`
    pub fn wait(&mut self, timeout: Duration) -> Option<FetchResponse> {
        match self.rx.recv_timeout(timeout) {
            Ok(response) => {
                self.in_flight = self.in_flight.saturating_sub(1);
                Some(response)
            }
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::mock::MockApi;
    use crate::filter::FilterLevel;

    #[test]
    fn test_execute_maps_records() {
        let api = MockApi::astronomy();
        let options = execute(&api, &Query::Subfields { field_id: "31".into() }).unwrap();
        assert_eq!(options.len(), 2);
        assert_eq!(options[0].name, "Astronomy and Astrophysics");
    }

    #[test]
    fn test_worker_round_trip() {
        let mut fetcher = Fetcher::new(Arc::new(MockApi::astronomy()));
        fetcher.spawn(FetchRequest {
            level: FilterLevel::Field,
            generation: 4,
            query: Query::Fields,
        });
        assert_eq!(fetcher.in_flight(), 1);

        let response = fetcher.wait(Duration::from_secs(5)).unwrap();
        assert_eq!(response.level, FilterLevel::Field);
        assert_eq!(response.generation, 4);
        assert!(response.result.is_ok());
        assert_eq!(fetcher.in_flight(), 0);
        assert!(fetcher.drain().is_empty());
    }

    #[test]
    fn test_errors_travel_back() {
        let mut fetcher = Fetcher::new(Arc::new(MockApi::failing()));
        fetcher.spawn(FetchRequest {
            level: FilterLevel::Field,
            generation: 1,
            query: Query::Fields,
        });
        let response = fetcher.wait(Duration::from_secs(5)).unwrap();
        assert!(response.result.is_err());
    }
}
