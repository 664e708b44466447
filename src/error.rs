use std::path::PathBuf;

/// Errors produced while resolving configuration or collecting printer
/// status.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// OctoPrint could not be reached at all.
    #[error("Unable to connect: {}", error_chain(.0))]
    Transport(#[source] octoprint::Error),

    /// The printer endpoint answered with something other than `200 OK`.
    /// OctoPrint puts a readable reason in the body, so that is all we show.
    #[error("{body}")]
    UpstreamHttp {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// The local OctoPrint credential file exists but could not be read.
    #[error("Unable to read {}: {source}", .path.display())]
    ConfigRead {
        /// Path of the credential file.
        path: PathBuf,
        /// Why it could not be read.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A successful response did not have the documented shape.
    #[error("unexpected payload from {endpoint}: {source}")]
    ContractViolation {
        /// Endpoint which returned the payload.
        endpoint: &'static str,
        /// What serde tripped over.
        #[source]
        source: serde_json::Error,
    },

    /// The application config file is not valid TOML.
    #[error(transparent)]
    Config(#[from] toml::de::Error),

    /// The application config file could not be read.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<octoprint::Error> for Error {
    fn from(err: octoprint::Error) -> Self {
        match err {
            octoprint::Error::Decode { endpoint, source } => Self::ContractViolation { endpoint, source },
            other => Self::Transport(other),
        }
    }
}

/// Result type used throughout this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Flatten an error and its sources into a single line. reqwest keeps the
/// useful part ("Connection refused") a few levels down.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut msg = err.to_string();
    let mut source = err.source();
    while let Some(err) = source {
        let next = err.to_string();
        if !msg.contains(&next) {
            msg.push_str(": ");
            msg.push_str(&next);
        }
        source = err.source();
    }
    msg
}
