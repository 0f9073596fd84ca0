//! Helpers for tests in this crate.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{json, Value};

use beacon_config::Config;

use crate::transport::{HttpError, Request, Response, StatusCode, Transport};

/// Builds a config with a valid API key, merging the given top-level
/// overrides.
pub(crate) fn test_config(overrides: Value) -> Config {
    let mut base = json!({"api_key": "test-key"});
    if let (Some(base_map), Some(override_map)) = (base.as_object_mut(), overrides.as_object()) {
        for (key, value) in override_map {
            base_map.insert(key.clone(), value.clone());
        }
    }
    Config::from_json_value(base).unwrap()
}

#[derive(Default)]
struct MockState {
    requests: Vec<Request>,
    script: VecDeque<Result<Response, HttpError>>,
}

/// Transport double recording requests and replaying scripted responses.
///
/// Responses queued with [`respond_with`](MockTransport::respond_with) are
/// consumed in order; once the script runs dry, every request succeeds with
/// `201 Created` and an empty JSON body.
#[derive(Clone, Default)]
pub(crate) struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a response for the next request.
    pub fn respond_with(&self, response: Response) {
        self.state.lock().script.push_back(Ok(response));
    }

    /// Queues a transport-level failure for the next request.
    pub fn fail_with(&self, error: HttpError) {
        self.state.lock().script.push_back(Err(error));
    }

    /// Returns all requests recorded so far.
    pub fn requests(&self) -> Vec<Request> {
        self.state.lock().requests.clone()
    }

    /// Returns the number of requests recorded so far.
    pub fn request_count(&self) -> usize {
        self.state.lock().requests.len()
    }
}

impl Transport for MockTransport {
    fn send(&self, request: Request) -> Result<Response, HttpError> {
        let mut state = self.state.lock();
        state.requests.push(request);
        state.script.pop_front().unwrap_or_else(|| {
            Ok(Response {
                status: StatusCode::CREATED,
                body: b"{}".to_vec(),
            })
        })
    }
}
