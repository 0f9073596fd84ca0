//! Configuration for the beacon client.
//!
//! The configuration is split into sections mirroring the subsystems of the
//! client: connection settings for the collection service, event batching
//! and sampling parameters, breadcrumb collection, and logging. All sections
//! have defaults, so a minimal configuration only carries the API key:
//!
//! ```yaml
//! api_key: hbp_xxxxxxxx
//! events:
//!   enabled: true
//! ```
//!
//! Values can be loaded from a YAML file with [`Config::from_path`], built
//! from a JSON value with [`Config::from_json_value`], and overridden from
//! the process environment with [`Config::apply_override`].

#![warn(missing_docs)]

mod config;
pub use config::*;
