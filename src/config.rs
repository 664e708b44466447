//! Code for resolving how to reach the OctoPrint server.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;

use crate::{Error, Result};

/// Section of the application config holding the OctoPrint settings.
pub const SECTION: &str = "octoprint";

/// Host used when none is configured.
pub const DEFAULT_HOST: &str = "http://0.0.0.0";

/// Port used when none is configured.
pub const DEFAULT_PORT: u16 = 5000;

/// Upper bound on each request to OctoPrint.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Read access to the host application's configuration.
pub trait AppConfig {
    /// True if the configuration has a section called `section`.
    fn has_section(&self, section: &str) -> bool;

    /// Value of `option` in `section`, or `default` if either is missing.
    fn get_value(&self, section: &str, option: &str, default: Option<&str>) -> Option<String>;
}

/// [AppConfig] backed by a TOML document.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct TomlConfig {
    table: toml::Table,
}

impl TomlConfig {
    /// Parse a configuration from a toml file.
    pub fn from_file(file: &Path) -> Result<Self> {
        let config = std::fs::read_to_string(file)?;
        Self::from_str(&config)
    }

    /// Parse a configuration from a toml string.
    pub fn from_str(config: &str) -> Result<Self> {
        Ok(Self {
            table: toml::from_str(config)?,
        })
    }
}

impl AppConfig for TomlConfig {
    fn has_section(&self, section: &str) -> bool {
        self.table.get(section).is_some_and(toml::Value::is_table)
    }

    fn get_value(&self, section: &str, option: &str, default: Option<&str>) -> Option<String> {
        let value = self
            .table
            .get(section)
            .and_then(toml::Value::as_table)
            .and_then(|section| section.get(option));

        match value {
            Some(toml::Value::String(value)) => Some(value.clone()),
            Some(value) => Some(value.to_string()),
            None => default.map(str::to_owned),
        }
    }
}

/// Everything needed to talk to one OctoPrint server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Scheme qualified host, e.g. `http://octopi.local`.
    pub host: String,

    /// TCP port of the OctoPrint web server.
    pub port: u16,

    /// Key sent as `X-Api-Key`. Without it OctoPrint will refuse most
    /// requests, which shows up as an error state in the panel.
    pub api_key: Option<String>,

    /// Upper bound on each request.
    pub timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_owned(),
            port: DEFAULT_PORT,
            api_key: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ConnectionConfig {
    /// `host:port`, the base every endpoint hangs off.
    pub fn url_base(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Full url of the printer state endpoint.
    pub fn printer_url(&self) -> String {
        format!("{}{}", self.url_base(), octoprint::PRINTER_PATH)
    }

    /// Full url of the job endpoint.
    pub fn job_url(&self) -> String {
        format!("{}{}", self.url_base(), octoprint::JOB_PATH)
    }

    /// Build an OctoPrint client for this connection. Nothing is sent over
    /// the network until the client is polled.
    pub fn client(&self) -> Result<octoprint::Client> {
        Ok(octoprint::Client::new(
            &self.url_base(),
            self.api_key.as_deref(),
            self.timeout,
        )?)
    }
}

/// Result of [configure].
#[derive(Debug)]
pub struct Configured {
    /// The resolved connection settings.
    pub connection: ConnectionConfig,

    /// Set when the local credential file exists but could not be read.
    /// The connection carries no api key in that case, and the collector
    /// reports this error on its next poll.
    pub credential_error: Option<Error>,
}

/// Location of OctoPrint's own config file for the user owning `home`.
pub fn credentials_path(home: &Path) -> PathBuf {
    home.join(".octoprint").join("config.yaml")
}

/// Resolve the connection settings, first from the `octoprint` section of
/// the application config, then (for the api key only) from the local
/// OctoPrint config file under `home`.
///
/// This never touches the network.
pub fn configure(app_config: &impl AppConfig, home: &Path) -> Configured {
    let mut connection = ConnectionConfig::default();

    if app_config.has_section(SECTION) {
        if let Some(host) = app_config.get_value(SECTION, "host", Some(DEFAULT_HOST)) {
            connection.host = host;
        }

        if let Some(port) = app_config.get_value(SECTION, "port", None) {
            match port.trim().parse() {
                Ok(port) => connection.port = port,
                Err(e) => tracing::warn!(
                    port = port,
                    error = format!("{:?}", e),
                    "invalid octoprint port, using {}",
                    DEFAULT_PORT
                ),
            }
        }

        if let Some(timeout) = app_config.get_value(SECTION, "timeout", None) {
            match parse_timeout(&timeout) {
                Some(timeout) => connection.timeout = timeout,
                None => tracing::warn!(
                    timeout = timeout,
                    "invalid octoprint timeout, using {:?}",
                    DEFAULT_TIMEOUT
                ),
            }
        }

        connection.api_key = app_config
            .get_value(SECTION, "api_key", None)
            .filter(|key| !key.is_empty());
    }

    let mut credential_error = None;
    if connection.api_key.is_none() {
        let path = credentials_path(home);
        match read_api_key(&path) {
            Ok(api_key) => connection.api_key = api_key,
            Err(err) => {
                tracing::warn!(error = err.to_string(), "ignoring local octoprint config");
                credential_error = Some(err);
            }
        }
    }

    if !connection.host.contains("://") {
        connection.host = format!("http://{}", connection.host);
    }

    tracing::debug!(
        printer_url = connection.printer_url(),
        job_url = connection.job_url(),
        authenticated = connection.api_key.is_some(),
        "configured octoprint"
    );

    Configured {
        connection,
        credential_error,
    }
}

fn parse_timeout(timeout: &str) -> Option<Duration> {
    let secs: f64 = timeout.trim().parse().ok()?;
    (secs.is_finite() && secs > 0.0).then(|| Duration::from_secs_f64(secs))
}

#[derive(Deserialize)]
struct CredentialFile {
    api: Option<ApiSection>,
}

#[derive(Deserialize)]
struct ApiSection {
    key: Option<String>,
}

/// Pull `api.key` out of an OctoPrint `config.yaml`. A missing file or key
/// is not an error.
fn read_api_key(path: &Path) -> Result<Option<String>> {
    if !path.is_file() {
        return Ok(None);
    }

    let read_error = |source: Box<dyn std::error::Error + Send + Sync>| Error::ConfigRead {
        path: path.to_owned(),
        source,
    };

    let contents = std::fs::read_to_string(path).map_err(|e| read_error(e.into()))?;
    if contents.trim().is_empty() {
        return Ok(None);
    }

    let file: CredentialFile = serde_yaml::from_str(&contents).map_err(|e| read_error(e.into()))?;
    Ok(file.api.and_then(|api| api.key).filter(|key| !key.is_empty()))
}
