/// Errors returned while talking to OctoPrint.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The underlying HTTP client could not be constructed.
    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),

    /// The request never produced a response (connection refused, DNS
    /// failure, timeout, truncated body).
    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    /// The response body did not match the documented payload.
    #[error("unexpected payload from {endpoint}: {source}")]
    Decode {
        /// Endpoint which returned the payload.
        endpoint: &'static str,

        /// What serde tripped over.
        #[source]
        source: serde_json::Error,
    },
}

/// Result type used throughout this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;
