use std::env;
use std::io::{self, Write};
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Utc};
use log::{Level, LevelFilter};
use serde::{Deserialize, Serialize};

/// The client's own crates, logged at full verbosity by default.
const INTERNAL_CRATES: &[&str] = &["beacon", "beacon_config", "beacon_log"];

/// Controls the log format.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Picks a format based on the environment.
    ///
    /// Resolves to [`LogFormat::Pretty`] when logging to a terminal and to
    /// [`LogFormat::Simplified`] otherwise.
    Auto,

    /// Colored, column-aligned output for terminals.
    ///
    /// ```text
    ///  INFO  beacon::batcher > delivered 50 batched events
    /// ```
    Pretty,

    /// Plain text, one line per record.
    ///
    /// ```text
    /// 2026-08-04T12:10:32Z [beacon::batcher] INFO: delivered 50 batched events
    /// ```
    Simplified,

    /// One JSON object per line, for log collectors.
    ///
    /// ```text
    /// {"time":"2026-08-04T12:11:08.729716Z","level":"INFO","target":"beacon::batcher","message":"delivered 50 batched events","file":"beacon/src/batcher.rs","line":122}
    /// ```
    Json,
}

/// Controls the logging system.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct LogConfig {
    /// The log level for the client.
    pub level: LevelFilter,

    /// Controls the log output format.
    ///
    /// Defaults to [`LogFormat::Auto`].
    pub format: LogFormat,

    /// Forces backtraces on.
    ///
    /// When unset, backtraces follow the `RUST_BACKTRACE` variable.
    pub enable_backtraces: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LevelFilter::Info,
            format: LogFormat::Auto,
            enable_backtraces: false,
        }
    }
}

/// Initialize the logging system.
///
/// Without a `RUST_LOG` variable, third-party crates are filtered to `info`
/// while the client's own crates log at full verbosity; `RUST_LOG` replaces
/// these filters entirely.
///
/// # Example
///
/// ```
/// let log_config = beacon_log::LogConfig {
///     enable_backtraces: true,
///     ..Default::default()
/// };
///
/// beacon_log::init(&log_config);
/// ```
pub fn init(config: &LogConfig) {
    if config.enable_backtraces {
        env::set_var("RUST_BACKTRACE", "full");
    }

    let mut builder = env_logger::Builder::from_env(env_logger::DEFAULT_FILTER_ENV);
    if env::var(env_logger::DEFAULT_FILTER_ENV).is_err() {
        builder.filter_level(LevelFilter::Info);
        for name in INTERNAL_CRATES {
            builder.filter_module(name, LevelFilter::Trace);
        }
    }

    match config.format {
        LogFormat::Pretty => builder.format(write_pretty),
        LogFormat::Simplified => builder.format(write_plain),
        LogFormat::Json => builder.format(write_json),
        LogFormat::Auto if console::user_attended() => builder.format(write_pretty),
        LogFormat::Auto => builder.format(write_plain),
    };

    log::set_max_level(config.level);
    log::set_boxed_logger(Box::new(builder.build())).ok();
}

/// Widest log target seen so far, so columns stay aligned.
static TARGET_PAD: AtomicUsize = AtomicUsize::new(0);

fn write_pretty(f: &mut env_logger::fmt::Formatter, record: &log::Record) -> io::Result<()> {
    let tag = console::style(format!("{:5}", record.level()));
    let tag = match record.level() {
        Level::Error => tag.red(),
        Level::Warn => tag.yellow(),
        Level::Info => tag.green(),
        Level::Debug => tag.blue(),
        Level::Trace => tag.magenta(),
    };

    let target = record.target();
    let width = TARGET_PAD
        .fetch_max(target.len(), Ordering::Relaxed)
        .max(target.len());

    writeln!(
        f,
        " {} {} > {}",
        tag,
        console::style(format!("{target:width$}")).bold(),
        record.args(),
    )
}

fn write_plain(f: &mut env_logger::fmt::Formatter, record: &log::Record) -> io::Result<()> {
    let ts = f.timestamp();
    writeln!(
        f,
        "{ts} [{}] {}: {}",
        record.target(),
        record.level(),
        record.args()
    )
}

#[derive(Debug, Serialize)]
struct JsonRecord<'a> {
    time: DateTime<Utc>,
    level: Level,
    target: &'a str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    file: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    line: Option<u32>,
}

fn write_json(mut f: &mut env_logger::fmt::Formatter, record: &log::Record) -> io::Result<()> {
    let json = JsonRecord {
        time: Utc::now(),
        level: record.level(),
        target: record.target(),
        message: record.args().to_string(),
        file: record.file(),
        line: record.line(),
    };

    serde_json::to_writer(&mut f, &json).map_err(io::Error::other)?;
    f.write_all(b"\n")
}
