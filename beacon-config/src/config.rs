use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Errors raised while loading or validating the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to open or read the config file.
    #[error("could not read config file {1:?}")]
    CouldNotReadFile(#[source] io::Error, PathBuf),

    /// Parsing YAML failed.
    #[error("could not parse yaml config file {1:?}")]
    BadYaml(#[source] serde_yaml::Error, PathBuf),

    /// Parsing JSON failed.
    #[error("could not parse json config value")]
    BadJson(#[from] serde_json::Error),

    /// Invalid config value.
    #[error("invalid config value for {0}")]
    InvalidValue(&'static str),

    /// The API key is missing or empty.
    #[error("no API key configured")]
    MissingApiKey,
}

/// Connection settings for the collection service.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Connection {
    /// Base URL of the collection service.
    ///
    /// Defaults to `https://api.beaconhq.io`.
    pub endpoint: String,

    /// Timeout for delivery requests in seconds.
    ///
    /// This covers the time from sending the request until the response has
    /// been received. A value of `0` waits indefinitely, deferring to the
    /// operating system's own limits. Defaults to `0`.
    pub timeout: u64,

    /// Timeout for establishing connections in seconds.
    ///
    /// This includes SSL handshakes. Defaults to `5`.
    pub connection_timeout: u64,
}

impl Default for Connection {
    fn default() -> Self {
        Self {
            endpoint: "https://api.beaconhq.io".to_owned(),
            timeout: 0,
            connection_timeout: 5,
        }
    }
}

/// Parameters for event batching and sampling.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Events {
    /// Master switch for event collection and batching.
    ///
    /// When disabled, events submitted to the client are discarded without
    /// reaching the batcher. Defaults to `false`.
    pub enabled: bool,

    /// Number of accumulated events that triggers a flush.
    ///
    /// Defaults to `50`.
    pub bulk_threshold: usize,

    /// Elapsed time since the last dispatch that triggers a flush, in
    /// milliseconds.
    ///
    /// Defaults to `100`.
    pub dispatch_interval_ms: u64,

    /// Percentage of events kept by sampling, from 0 to 100.
    ///
    /// Events sharing a `request_id` are consistently kept or dropped
    /// together. Defaults to `100`.
    pub sample_rate: u32,
}

impl Default for Events {
    fn default() -> Self {
        Self {
            enabled: false,
            bulk_threshold: 50,
            dispatch_interval_ms: 100,
            sample_rate: 100,
        }
    }
}

/// Parameters for breadcrumb collection.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Breadcrumbs {
    /// Enables recording of breadcrumbs and attaching them to notices.
    ///
    /// Defaults to `true`.
    pub enabled: bool,

    /// Number of breadcrumbs retained; older entries are evicted first.
    ///
    /// Defaults to `40`.
    pub max_breadcrumbs: usize,
}

impl Default for Breadcrumbs {
    fn default() -> Self {
        Self {
            enabled: true,
            max_breadcrumbs: 40,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct ConfigValues {
    /// The API key identifying the project at the collection service.
    api_key: Option<String>,

    /// The deployment environment reported with notices.
    environment: Option<String>,

    /// The hostname reported with notices.
    hostname: Option<String>,

    /// Error classes that are never reported.
    exclusions: Vec<String>,

    connection: Connection,
    events: Events,
    breadcrumbs: Breadcrumbs,
    logging: beacon_log::LogConfig,
}

/// Configuration overrides from the environment or the command line.
#[derive(Debug, Default)]
pub struct OverridableConfig {
    /// The API key identifying the project.
    pub api_key: Option<String>,
    /// The base URL of the collection service.
    pub endpoint: Option<String>,
    /// The deployment environment reported with notices.
    pub environment: Option<String>,
    /// The hostname reported with notices.
    pub hostname: Option<String>,
}

impl OverridableConfig {
    /// Reads overrides from `BEACON_*` environment variables.
    pub fn from_env() -> Self {
        Self {
            api_key: env::var("BEACON_API_KEY").ok(),
            endpoint: env::var("BEACON_ENDPOINT").ok(),
            environment: env::var("BEACON_ENVIRONMENT").ok(),
            hostname: env::var("BEACON_HOSTNAME").ok(),
        }
    }
}

/// The client configuration.
#[derive(Debug, Default)]
pub struct Config {
    values: ConfigValues,
    path: PathBuf,
}

impl Config {
    /// Loads a config from the given YAML file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let path = match env::current_dir() {
            Ok(cwd) => cwd.join(path.as_ref()),
            Err(_) => path.as_ref().to_path_buf(),
        };

        let contents = fs::read_to_string(&path)
            .map_err(|e| ConfigError::CouldNotReadFile(e, path.clone()))?;

        let values = serde_yaml::from_str(&contents)
            .map_err(|e| ConfigError::BadYaml(e, path.clone()))?;

        Ok(Config { values, path })
    }

    /// Creates a config from a JSON value.
    ///
    /// Primarily used in tests.
    pub fn from_json_value(value: serde_json::Value) -> Result<Config, ConfigError> {
        Ok(Config {
            values: serde_json::from_value(value)?,
            path: PathBuf::new(),
        })
    }

    /// Override configuration with values coming from other sources (e.g.
    /// env variables or command line parameters).
    pub fn apply_override(&mut self, overrides: OverridableConfig) -> &mut Self {
        if let Some(api_key) = overrides.api_key {
            self.values.api_key = Some(api_key);
        }
        if let Some(endpoint) = overrides.endpoint {
            self.values.connection.endpoint = endpoint;
        }
        if let Some(environment) = overrides.environment {
            self.values.environment = Some(environment);
        }
        if let Some(hostname) = overrides.hostname {
            self.values.hostname = Some(hostname);
        }
        self
    }

    /// Returns the filename of the config file, if loaded from one.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the configured API key.
    ///
    /// The key is required; an absent or empty key is a configuration error.
    pub fn api_key(&self) -> Result<&str, ConfigError> {
        match self.values.api_key.as_deref() {
            Some(key) if !key.is_empty() => Ok(key),
            _ => Err(ConfigError::MissingApiKey),
        }
    }

    /// Returns the deployment environment reported with notices.
    pub fn environment(&self) -> Option<&str> {
        self.values.environment.as_deref()
    }

    /// Returns the hostname reported with notices.
    pub fn hostname(&self) -> Option<&str> {
        self.values.hostname.as_deref()
    }

    /// Returns the error classes that are never reported.
    pub fn exclusions(&self) -> &[String] {
        &self.values.exclusions
    }

    /// Returns the base URL of the collection service.
    pub fn endpoint(&self) -> &str {
        &self.values.connection.endpoint
    }

    /// Returns the timeout for delivery requests.
    ///
    /// `None` waits indefinitely.
    pub fn timeout(&self) -> Option<Duration> {
        match self.values.connection.timeout {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Returns the timeout for establishing connections.
    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.values.connection.connection_timeout)
    }

    /// Returns `true` if event collection and batching is enabled.
    pub fn events_enabled(&self) -> bool {
        self.values.events.enabled
    }

    /// Returns the number of accumulated events that triggers a flush.
    pub fn bulk_threshold(&self) -> usize {
        self.values.events.bulk_threshold
    }

    /// Returns the elapsed time since the last dispatch that triggers a
    /// flush.
    pub fn dispatch_interval(&self) -> Duration {
        Duration::from_millis(self.values.events.dispatch_interval_ms)
    }

    /// Returns the percentage of events kept by sampling, from 0 to 100.
    pub fn sample_rate(&self) -> u32 {
        self.values.events.sample_rate.min(100)
    }

    /// Returns `true` if breadcrumb collection is enabled.
    pub fn breadcrumbs_enabled(&self) -> bool {
        self.values.breadcrumbs.enabled
    }

    /// Returns the number of breadcrumbs retained.
    pub fn max_breadcrumbs(&self) -> usize {
        self.values.breadcrumbs.max_breadcrumbs
    }

    /// Returns the logging configuration.
    pub fn logging(&self) -> &beacon_log::LogConfig {
        &self.values.logging
    }
}
