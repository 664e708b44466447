use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::{Client, Response, Result};

/// Path of the printer state endpoint.
pub const PRINTER_PATH: &str = "/api/printer";

/// Actual and target temperature of a single heater.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub struct ToolTemperature {
    /// Measured temperature in degrees Celsius.
    #[serde(deserialize_with = "Option::deserialize")]
    pub actual: Option<f64>,

    /// Requested temperature in degrees Celsius.
    #[serde(deserialize_with = "Option::deserialize")]
    pub target: Option<f64>,
}

/// The subset of `GET /api/printer` we care about.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct PrinterState {
    /// Heaters keyed by name (`tool0`, `bed`, `chamber`, ...), in the order
    /// OctoPrint lists them.
    pub temperature: IndexMap<String, ToolTemperature>,
}

impl Client {
    /// Fetch the current printer state. Decode with
    /// [Response::json] into a [PrinterState].
    pub async fn printer(&self) -> Result<Response> {
        self.get(PRINTER_PATH).await
    }
}
