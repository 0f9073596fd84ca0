//! HTTP transport seam.
//!
//! The delivery client talks to the collection service through the
//! [`Transport`] trait, so the actual HTTP stack can be swapped out in
//! tests. [`HttpTransport`] is the default implementation over a blocking
//! `reqwest` client.

use std::io;

#[doc(inline)]
pub use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use beacon_config::Config;

/// Error produced while exchanging a request with the collection service.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    /// Sending the request failed.
    #[error("could not send request")]
    Reqwest(#[from] reqwest::Error),

    /// Reading the request or response body failed.
    #[error("failed to stream payload")]
    Io(#[from] io::Error),

    /// The response body was expected to be JSON but was not.
    #[error("failed to parse JSON response")]
    Json(#[from] serde_json::Error),
}

impl HttpError {
    /// Returns `true` if the error indicates a network problem rather than a
    /// malformed exchange.
    pub fn is_network_error(&self) -> bool {
        match self {
            Self::Io(_) => true,
            Self::Reqwest(error) => error.is_timeout() || error.is_connect(),
            Self::Json(_) => false,
        }
    }
}

/// A request to the collection service.
#[derive(Clone, Debug)]
pub struct Request {
    /// The HTTP method.
    pub method: Method,
    /// The fully resolved URL.
    pub url: Url,
    /// Headers in insertion order.
    pub headers: Vec<(String, String)>,
    /// The request body, if any.
    pub body: Option<Vec<u8>>,
}

impl Request {
    /// Creates a request without headers or body.
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: Vec::new(),
            body: None,
        }
    }

    /// Adds a header, not replacing existing ones.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    /// Sets the request body.
    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }
}

/// A response from the collection service.
#[derive(Clone, Debug)]
pub struct Response {
    /// The HTTP status code.
    pub status: StatusCode,
    /// The raw response body.
    pub body: Vec<u8>,
}

impl Response {
    /// Decodes the response body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, HttpError> {
        serde_json::from_slice(&self.body).map_err(HttpError::Json)
    }
}

/// Blocking HTTP transport used by the delivery client.
///
/// Implementations perform the request on the calling thread and block
/// until a response or transport failure, subject to their own timeouts.
pub trait Transport: Send + Sync {
    /// Performs the request.
    fn send(&self, request: Request) -> Result<Response, HttpError>;
}

/// Default transport over a shared blocking `reqwest` client.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    /// Creates a transport honoring the configured timeouts.
    ///
    /// A request timeout of zero in the configuration disables the timeout
    /// entirely.
    pub fn new(config: &Config) -> Result<Self, HttpError> {
        let mut builder =
            reqwest::blocking::Client::builder().connect_timeout(config.connection_timeout());

        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
        })
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: Request) -> Result<Response, HttpError> {
        let mut builder = self.client.request(request.method, request.url);

        for (key, value) in &request.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }

        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send()?;
        let status = response.status();
        let body = response.bytes()?.to_vec();

        Ok(Response { status, body })
    }
}
