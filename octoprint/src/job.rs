use serde::{Deserialize, Serialize};

use super::{Client, Response, Result};

/// Path of the job information endpoint.
pub const JOB_PATH: &str = "/api/job";

/// Information about the job file.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobInfo {
    /// Slicer estimate of the total print time, in seconds.
    #[serde(deserialize_with = "Option::deserialize")]
    pub estimated_print_time: Option<f64>,
}

/// Progress of the job being printed.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobProgress {
    /// Seconds spent printing so far.
    #[serde(deserialize_with = "Option::deserialize")]
    pub print_time: Option<f64>,

    /// Estimated seconds until the print is done.
    #[serde(deserialize_with = "Option::deserialize")]
    pub print_time_left: Option<f64>,
}

/// The subset of `GET /api/job` we care about.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct JobState {
    /// The job file.
    pub job: JobInfo,

    /// Progress of the job.
    pub progress: JobProgress,

    /// Human readable printer state ("Operational", "Printing", ...).
    pub state: String,
}

impl Client {
    /// Fetch information about the current job. Decode with
    /// [Response::json] into a [JobState].
    pub async fn job(&self) -> Result<Response> {
        self.get(JOB_PATH).await
    }
}
