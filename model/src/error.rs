use crate::clients::{HttpStatusCode, Payload, StatusCode};
use snafu::Snafu;
use std::path::PathBuf;

/// The `Result` type returned throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type returned throughout this crate.
///
/// Note that an HTTP error status is *not* an `Error`. The request functions return the status
/// code together with the decoded payload and leave it to the caller to decide what a `404` or a
/// `409` means. Variants here are reserved for things that prevented a request from happening, or
/// for convenience functions that need a specific status to make progress.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("The client that owned this manager has been dropped"))]
    ClientGone,

    #[snafu(display("Unable to {} {}: the operation is not supported", operation, resource))]
    Disallowed { operation: String, resource: String },

    #[snafu(display("Unable to {} '{}': {}", method, url, source))]
    Transport {
        method: String,
        url: String,
        source: reqwest::Error,
    },

    #[snafu(display(
        "Unable to {} '{}': status {} was returned after {} retries",
        method,
        url,
        status,
        retries
    ))]
    RetriesExhausted {
        method: String,
        url: String,
        status: StatusCode,
        retries: u32,
    },

    #[snafu(display("Unable to {}: the server responded with status {}", action, status))]
    UnexpectedStatus {
        action: String,
        status: StatusCode,
        payload: Payload,
    },

    #[snafu(display("Unable to build the HTTP client: {}", source))]
    Initialization { source: reqwest::Error },

    #[snafu(display("Invalid value for header '{}': {}", header, source))]
    InvalidHeader {
        header: String,
        source: http::header::InvalidHeaderValue,
    },

    #[snafu(display("Unable to join '{}' onto '{}': {}", path, endpoint, source))]
    UrlJoin {
        endpoint: String,
        path: String,
        source: url::ParseError,
    },

    #[snafu(display("Error serializing '{}': {}", what, source))]
    Serde {
        what: String,
        source: serde_json::Error,
    },

    #[snafu(display("Error handling YAML for '{}': {}", what, source))]
    Yaml {
        what: String,
        source: serde_yaml::Error,
    },

    #[snafu(display("Malformed document: {}", what))]
    Document { what: String },

    #[snafu(display("Unable to apply JSON patch: {}", source))]
    JsonPatch { source: json_patch::PatchError },

    #[snafu(display("An empty string is not a version"))]
    EmptyVersion,

    #[snafu(display("Invalid version '{}': {}", version, source))]
    InvalidVersion {
        version: String,
        source: semver::Error,
    },

    #[snafu(display(
        "A {} variant supporting '{}' is already registered",
        manager,
        support_to
    ))]
    DuplicateVariant { manager: String, support_to: String },

    #[snafu(display("The variant table for {} holds variants of another manager", manager))]
    RegistryTable { manager: String },

    #[snafu(display("Unable to read config file '{}': {}", path.display(), source))]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Unable to parse config file '{}': {}", path.display(), source))]
    ConfigParse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
}

impl Error {
    /// True when a manager outlived the client that created it.
    pub fn is_client_gone(&self) -> bool {
        matches!(self, Error::ClientGone)
    }

    /// True when the operation was refused locally, without any request being made.
    pub fn is_disallowed(&self) -> bool {
        matches!(self, Error::Disallowed { .. })
    }
}

impl HttpStatusCode for Error {
    fn status_code(&self) -> Option<StatusCode> {
        match self {
            Error::RetriesExhausted { status, .. } | Error::UnexpectedStatus { status, .. } => {
                Some(*status)
            }
            Error::Transport { source, .. } => source.status(),
            _ => None,
        }
    }
}
