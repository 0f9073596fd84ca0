//! Logging facade for the beacon client.
//!
//! # Setup
//!
//! Call [`init`] once with a [`LogConfig`] to install the logger. The
//! configuration derives the `serde` traits and is usually embedded in the
//! client's configuration file rather than built in code.
//!
//! ```
//! use beacon_log::LogConfig;
//!
//! let log_config = LogConfig {
//!     enable_backtraces: true,
//!     ..LogConfig::default()
//! };
//!
//! beacon_log::init(&log_config);
//! ```
//!
//! # Logging
//!
//! Records are emitted through the re-exported macros, from [`error!`] down
//! to [`trace!`]. The configured level filters out everything below it.
//!
//! ## Conventions
//!
//! Log messages start lowercase and end without punctuation. Keep them short
//! and precise, and pick the level along these lines:
//!
//! - [`error!`] for bugs and invalid behavior.
//! - [`warn!`] for undesirable but tolerated behavior.
//! - [`info!`] for messages aimed at the operator.
//! - [`debug!`] for messages that help debugging.
//! - [`trace!`] for the full auxiliary detail.
//!
//! # Logging Error Types
//!
//! The [`LogError`] wrapper renders an error together with its chain of
//! causes, which the plain `Display` of most errors omits.
//!
//! ```
//! use beacon_log::LogError;
//!
//! if let Err(error) = std::env::var("FOO") {
//!     beacon_log::error!("env failed: {}", LogError(&error));
//! }
//! ```
//!
//! # Testing
//!
//! Unit tests use the [`init_test!`] macro instead of [`init`]. It hooks
//! into the test runner's output capture and enables full verbosity for the
//! calling crate only.
//!
//! ```
//! #[test]
//! fn test_something() {
//!     beacon_log::init_test!();
//! }
//! ```

#![warn(missing_docs)]

mod setup;
pub use setup::*;

pub use test::*;

mod utils;
pub use utils::*;

// Expose the minimal log facade.
#[doc(inline)]
pub use log::{debug, error, info, log, trace, warn};
