//! Exception notice payloads.
//!
//! A notice is a single structured exception report, delivered synchronously
//! and never batched. The client fills in context, breadcrumbs and server
//! details; backtraces and request data are produced by host integrations
//! and attached to the notice before reporting.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::breadcrumbs::Breadcrumb;

/// Notifier metadata reported with every notice.
#[derive(Clone, Debug, Serialize)]
pub struct NotifierInfo {
    /// Name of this client library.
    pub name: &'static str,
    /// Homepage of this client library.
    pub url: &'static str,
    /// Version of this client library.
    pub version: &'static str,
}

impl Default for NotifierInfo {
    fn default() -> Self {
        Self {
            name: "beacon-rust",
            url: "https://github.com/beaconhq/beacon-rust",
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

/// A stack frame reported as part of a notice backtrace.
///
/// Frames are produced by the host's backtrace integration; the client
/// forwards them untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BacktraceFrame {
    /// Source file of the frame.
    pub file: String,
    /// Line number within the file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number: Option<u32>,
    /// Function or method name.
    pub method: String,
}

/// Details of the reported error.
#[derive(Clone, Debug, Serialize)]
pub struct ErrorDetails {
    /// The error class, typically the type path of the error.
    pub class: String,
    /// The error message.
    pub message: String,
    /// Stack frames, innermost first.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub backtrace: Vec<BacktraceFrame>,
    /// Overrides the service-side grouping of this notice.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
}

/// Request data attached to a notice.
#[derive(Clone, Debug, Default, Serialize)]
pub struct RequestInfo {
    /// URL of the request being handled when the error occurred.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Component or controller handling the request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    /// Action within the component.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    /// Request parameters, filtered by the host integration.
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub params: Map<String, Value>,
    /// Contextual values; the client merges its persistent context in here.
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub context: Map<String, Value>,
}

/// Host details reported with a notice.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ServerInfo {
    /// The configured deployment environment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment_name: Option<String>,
    /// The configured hostname.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
}

/// The breadcrumb trail attached to a notice.
#[derive(Clone, Debug, Default, Serialize)]
pub struct BreadcrumbTrail {
    /// Whether breadcrumb collection was enabled.
    pub enabled: bool,
    /// Recorded breadcrumbs, oldest first.
    pub trail: Vec<Breadcrumb>,
}

/// A single structured exception report.
#[derive(Clone, Debug, Serialize)]
pub struct Notice {
    /// Metadata about this client library.
    pub notifier: NotifierInfo,
    /// The reported error.
    pub error: ErrorDetails,
    /// Request data, if the error occurred while handling one.
    pub request: RequestInfo,
    /// Host details.
    pub server: ServerInfo,
    /// The breadcrumb trail recorded up to the error.
    pub breadcrumbs: BreadcrumbTrail,
}

impl Notice {
    /// Creates a notice for the given error class and message.
    pub fn new(class: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            notifier: NotifierInfo::default(),
            error: ErrorDetails {
                class: class.into(),
                message: message.into(),
                backtrace: Vec::new(),
                fingerprint: None,
            },
            request: RequestInfo::default(),
            server: ServerInfo::default(),
            breadcrumbs: BreadcrumbTrail::default(),
        }
    }

    /// Attaches a backtrace produced by a host integration.
    pub fn with_backtrace(mut self, backtrace: Vec<BacktraceFrame>) -> Self {
        self.error.backtrace = backtrace;
        self
    }

    /// Attaches request data.
    pub fn with_request(mut self, request: RequestInfo) -> Self {
        self.request = request;
        self
    }

    /// Overrides the service-side grouping of this notice.
    pub fn with_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.error.fingerprint = Some(fingerprint.into());
        self
    }
}
