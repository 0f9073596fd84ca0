//! Client library for reporting exceptions and telemetry events to a
//! collection service.
//!
//! The library is consumed as an embedded dependency. A host application
//! constructs one [`Client`] from a [`Config`] and shares it explicitly;
//! the client owns all of its state, so multiple independent clients can
//! coexist in one process.
//!
//! # Reporting errors
//!
//! [`Client::notify`] reports a single error synchronously as a *notice*,
//! enriched with the persistent context, the breadcrumb trail and host
//! details. Delivery failures surface to the caller as a typed
//! [`ServiceError`].
//!
//! ```no_run
//! use beacon::{Client, Config};
//! use serde_json::json;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::from_json_value(json!({"api_key": "hbp_xxxxxxxx"}))?;
//! let client = Client::builder(config).build()?;
//!
//! if let Err(error) = std::fs::read_to_string("data.json") {
//!     client.notify(&error)?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Recording events
//!
//! [`Client::event`] records a telemetry *event*. Events are buffered and
//! delivered in bulk: a flush is triggered when the batch reaches the
//! configured threshold or when the configured interval has elapsed since
//! the last dispatch. Event recording is fire-and-forget; delivery
//! failures are observable only through the handler installed with
//! [`ClientBuilder::on_delivery_error`], and a failed batch is dropped
//! rather than retried.
//!
//! Events can be sampled down with the `events.sample_rate` setting.
//! Events carrying a `request_id` are sampled consistently: all events of
//! one logical request are kept or dropped together.
//!
//! # Filters
//!
//! Callbacks registered with [`Client::before_notify`] and
//! [`Client::before_event`] run in registration order against every
//! payload before dispatch. A filter can mutate the payload in place or
//! suppress it by returning [`Verdict::Suppress`].

#![warn(missing_docs)]

pub mod batcher;
pub mod breadcrumbs;
pub mod client;
pub mod delivery;
pub mod event;
pub mod filter;
pub mod notice;
pub mod sampling;
pub mod transport;

#[cfg(test)]
mod testutils;

pub use beacon_config::{Config, ConfigError};

pub use crate::batcher::{DeliveryErrorHandler, EventBatcher};
pub use crate::client::{BuildError, Client, ClientBuilder};
pub use crate::delivery::{DeliveryClient, NoticeId, ServiceError};
pub use crate::event::Event;
pub use crate::filter::{FilterChain, Verdict};
pub use crate::notice::{BacktraceFrame, Notice, RequestInfo};
pub use crate::transport::{HttpTransport, Transport};
