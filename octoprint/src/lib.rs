#![deny(missing_docs)]
#![deny(missing_copy_implementations)]
#![deny(trivial_casts)]
#![deny(trivial_numeric_casts)]
#![deny(unused_import_braces)]
#![deny(unused_qualifications)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

//! This crate implements a small client for the OctoPrint REST api, enough
//! to read the printer's heater temperatures and the state of the current
//! job.

mod error;
mod job;
mod printer;

use std::time::Duration;

pub use error::{Error, Result};
pub use job::{JobInfo, JobProgress, JobState, JOB_PATH};
pub use printer::{PrinterState, ToolTemperature, PRINTER_PATH};
use serde::de::DeserializeOwned;

/// Header OctoPrint reads the api key from.
pub const API_KEY_HEADER: &str = "X-Api-Key";

/// Client is a handle to a single OctoPrint instance.
#[derive(Clone, Debug)]
pub struct Client {
    pub(crate) url_base: String,
    api_key: Option<String>,
    http: reqwest::Client,
}

impl Client {
    /// Create a new Client talking to the OctoPrint server at `url_base`
    /// (scheme, host and port, no trailing slash). Every request is sent
    /// with the `api_key`, if any, and is abandoned after `timeout`.
    pub fn new(url_base: &str, api_key: Option<&str>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(Error::Client)?;

        Ok(Self {
            url_base: url_base.trim_end_matches('/').to_owned(),
            api_key: api_key.map(str::to_owned),
            http,
        })
    }

    /// Return the base url requests are made against.
    pub fn url_base(&self) -> &str {
        &self.url_base
    }

    pub(crate) async fn get(&self, endpoint: &'static str) -> Result<Response> {
        let url = format!("{}{}", self.url_base, endpoint);
        tracing::debug!(url = url, authenticated = self.api_key.is_some(), "requesting");

        let mut request = self.http.get(&url);
        if let Some(api_key) = &self.api_key {
            request = request.header(API_KEY_HEADER, api_key);
        }

        let resp = request.send().await?;
        let status = resp.status().as_u16();
        let body = resp.text().await?;

        tracing::trace!(url = url, status = status, "received response");

        Ok(Response { endpoint, status, body })
    }
}

/// Undecoded reply from one of the OctoPrint endpoints.
///
/// OctoPrint answers errors with a plain text body, so decoding is left to
/// the caller once it has looked at the status.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Response {
    /// Path of the endpoint which produced this response.
    pub endpoint: &'static str,

    /// HTTP status code.
    pub status: u16,

    /// Raw response body.
    pub body: String,
}

impl Response {
    /// True if OctoPrint answered with `200 OK`.
    pub fn is_success(&self) -> bool {
        self.status == 200
    }

    /// Decode the body as JSON. Any shape mismatch is reported as
    /// [Error::Decode] naming the endpoint.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.body).map_err(|source| Error::Decode {
            endpoint: self.endpoint,
            source,
        })
    }
}
