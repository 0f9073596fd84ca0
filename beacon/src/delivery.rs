//! Delivery of notices, events and check-ins to the collection service.

use serde::Deserialize;
use serde_json::{Map, Value};
use url::Url;

use beacon_config::{Config, ConfigError};

use crate::event::Event;
use crate::notice::Notice;
use crate::transport::{HttpError, Method, Request, StatusCode, Transport};

/// Wire path for single exception notices.
const NOTICES_PATH: &str = "v1/notices";

/// Wire path for bulk event delivery.
const EVENTS_PATH: &str = "v1/events";

/// Wire path for check-in pings.
const CHECK_IN_PATH: &str = "v1/check_in";

/// User agent reported to the collection service.
const USER_AGENT: &str = concat!("beacon-rust/", env!("CARGO_PKG_VERSION"));

/// Identifier assigned to a delivered notice by the collection service.
pub type NoticeId = String;

/// Error surfaced when delivery to the collection service fails.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The configured API key was rejected (HTTP 403).
    #[error("the collection service rejected the API key")]
    InvalidApiKey,

    /// The payload was rejected as unprocessable (HTTP 422).
    #[error("the collection service rejected the payload")]
    InvalidPayload,

    /// The request was rate limited (HTTP 429).
    #[error("the collection service rate limited the request")]
    RateLimited,

    /// The collection service failed internally (HTTP 5xx).
    #[error("the collection service returned error {0}")]
    Server(StatusCode),

    /// The collection service returned a status outside its contract.
    #[error("the collection service returned unexpected status {0}")]
    UnexpectedStatus(StatusCode),

    /// The request could not be performed at the transport level.
    #[error("could not send request to the collection service")]
    Http(#[from] HttpError),

    /// The configured endpoint cannot be combined with a wire path.
    #[error("invalid endpoint URL")]
    InvalidEndpoint,
}

impl ServiceError {
    /// Returns `true` if the error indicates a network problem rather than a
    /// definitive response from the service.
    pub fn is_network_error(&self) -> bool {
        match self {
            Self::Http(http) => http.is_network_error(),
            Self::Server(code) => matches!(code.as_u16(), 502 | 503 | 504),
            _ => false,
        }
    }

    /// Returns `true` if the request was received by the service.
    ///
    /// Despite resulting in an error, the service has received and
    /// acknowledged the request. This includes rate limits and rejected
    /// payloads, but not network errors.
    pub fn is_received(&self) -> bool {
        match self {
            Self::InvalidApiKey | Self::InvalidPayload | Self::RateLimited => true,
            Self::Server(_) | Self::UnexpectedStatus(_) => !self.is_network_error(),
            Self::Http(_) | Self::InvalidEndpoint => false,
        }
    }
}

/// Maps a non-success response status to its typed error.
fn status_error(status: StatusCode) -> ServiceError {
    match status {
        StatusCode::FORBIDDEN => ServiceError::InvalidApiKey,
        StatusCode::UNPROCESSABLE_ENTITY => ServiceError::InvalidPayload,
        StatusCode::TOO_MANY_REQUESTS => ServiceError::RateLimited,
        status if status.is_server_error() => ServiceError::Server(status),
        status => ServiceError::UnexpectedStatus(status),
    }
}

/// Response body returned by the notices endpoint.
#[derive(Debug, Deserialize)]
struct NoticeResponse {
    id: Option<NoticeId>,
}

/// Thin client translating payloads into HTTP calls against the collection
/// service.
pub struct DeliveryClient {
    transport: Box<dyn Transport>,
    endpoint: Url,
    api_key: String,
}

impl DeliveryClient {
    /// Creates a delivery client, validating endpoint and API key up front.
    pub fn new(config: &Config, transport: Box<dyn Transport>) -> Result<Self, ConfigError> {
        let endpoint: Url = config
            .endpoint()
            .parse()
            .map_err(|_| ConfigError::InvalidValue("connection.endpoint"))?;
        if endpoint.cannot_be_a_base() {
            return Err(ConfigError::InvalidValue("connection.endpoint"));
        }

        Ok(Self {
            transport,
            endpoint,
            api_key: config.api_key()?.to_owned(),
        })
    }

    /// Delivers a batch of events as a single JSON array body.
    pub fn send_events(&self, events: &[Event]) -> Result<(), ServiceError> {
        let body = serde_json::to_vec(events).map_err(HttpError::Json)?;
        let response = self.transport.send(self.post(EVENTS_PATH, body)?)?;

        if response.status.is_success() {
            Ok(())
        } else {
            Err(status_error(response.status))
        }
    }

    /// Delivers a single notice, returning the identifier assigned by the
    /// service if the response carries one.
    pub fn send_notice(&self, notice: &Notice) -> Result<Option<NoticeId>, ServiceError> {
        let body = serde_json::to_vec(notice).map_err(HttpError::Json)?;
        self.post_notice_body(body)
    }

    /// Delivers a free-form payload over the notice path.
    pub fn send_custom(&self, payload: &Map<String, Value>) -> Result<Option<NoticeId>, ServiceError> {
        let body = serde_json::to_vec(payload).map_err(HttpError::Json)?;
        self.post_notice_body(body)
    }

    /// Sends a check-in ping for the given identifier.
    pub fn send_check_in(&self, id: &str) -> Result<(), ServiceError> {
        let path = format!("{CHECK_IN_PATH}/{id}");
        let response = self.transport.send(self.request(Method::GET, &path)?)?;

        match response.status {
            StatusCode::OK => Ok(()),
            status => Err(status_error(status)),
        }
    }

    fn post_notice_body(&self, body: Vec<u8>) -> Result<Option<NoticeId>, ServiceError> {
        let response = self.transport.send(self.post(NOTICES_PATH, body)?)?;

        if response.status.is_success() {
            // The response body is optional by contract.
            let parsed: Option<NoticeResponse> = response.json().ok();
            Ok(parsed.and_then(|response| response.id))
        } else {
            Err(status_error(response.status))
        }
    }

    fn request(&self, method: Method, path: &str) -> Result<Request, ServiceError> {
        let url = self
            .endpoint
            .join(path)
            .map_err(|_| ServiceError::InvalidEndpoint)?;

        Ok(Request::new(method, url)
            .header("X-API-Key", &self.api_key)
            .header("User-Agent", USER_AGENT))
    }

    fn post(&self, path: &str, body: Vec<u8>) -> Result<Request, ServiceError> {
        Ok(self
            .request(Method::POST, path)?
            .header("Content-Type", "application/json")
            .body(body))
    }
}
