//! The status collector: one [StatusRecord] per poll.

use std::future::Future;

use indexmap::IndexMap;
use octoprint::{JobState, PrinterState, Response, ToolTemperature};
use serde::Serialize;

use crate::{render, Configured, ConnectionConfig, Error, Result, Segment};

/// State reported when a poll failed.
pub const ERROR_STATE: &str = "Error";

/// Something that can answer the two OctoPrint endpoints the panel needs.
///
/// Implemented by [octoprint::Client]; tests swap in canned responses.
pub trait StatusSource {
    /// `GET /api/printer`.
    fn printer(&self) -> impl Future<Output = octoprint::Result<Response>>;

    /// `GET /api/job`.
    fn job(&self) -> impl Future<Output = octoprint::Result<Response>>;
}

impl StatusSource for octoprint::Client {
    async fn printer(&self) -> octoprint::Result<Response> {
        octoprint::Client::printer(self).await
    }

    async fn job(&self) -> octoprint::Result<Response> {
        octoprint::Client::job(self).await
    }
}

/// Snapshot of the printer produced by a single poll.
///
/// Either healthy (`error` unset, everything else filled in from OctoPrint)
/// or an error snapshot carrying only `state` and `error`.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct StatusRecord {
    /// Job state as reported by OctoPrint, or [ERROR_STATE].
    pub state: String,

    /// Why the poll failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Slicer estimate of the total print time, in seconds.
    #[serde(rename = "estimatedPrintTime", skip_serializing_if = "Option::is_none")]
    pub estimated_print_time: Option<f64>,

    /// Seconds spent printing so far.
    #[serde(rename = "progress_printTime", skip_serializing_if = "Option::is_none")]
    pub progress_print_time: Option<f64>,

    /// Estimated seconds until the print is done.
    #[serde(rename = "progress_printTimeLeft", skip_serializing_if = "Option::is_none")]
    pub progress_print_time_left: Option<f64>,

    /// Heaters keyed by name, in the order OctoPrint lists them.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<IndexMap<String, ToolTemperature>>,
}

impl StatusRecord {
    /// An error snapshot with the given message.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            state: ERROR_STATE.to_owned(),
            error: Some(message.into()),
            ..Default::default()
        }
    }

    /// Project the decoded OctoPrint payloads into a healthy snapshot.
    pub fn from_payloads(printer: PrinterState, job: JobState) -> Self {
        Self {
            state: job.state,
            error: None,
            estimated_print_time: job.job.estimated_print_time,
            progress_print_time: job.progress.print_time,
            progress_print_time_left: job.progress.print_time_left,
            temperature: Some(printer.temperature),
        }
    }

    /// True if this is an error snapshot.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Polls one OctoPrint server and keeps the most recent [StatusRecord].
pub struct StatusCollector<SourceT = octoprint::Client> {
    source: SourceT,
    connection: ConnectionConfig,
    pending_error: Option<Error>,
    disabled: bool,
    stats: Option<StatusRecord>,
}

impl StatusCollector<octoprint::Client> {
    /// Build a collector talking HTTP to the configured server.
    pub fn connect(configured: Configured) -> Result<Self> {
        let source = configured.connection.client()?;
        Ok(Self::new(source, configured))
    }
}

impl<SourceT: StatusSource> StatusCollector<SourceT> {
    /// Build a collector reading from `source`. A credential error carried
    /// by `configured` is reported by the first poll.
    pub fn new(source: SourceT, configured: Configured) -> Self {
        Self {
            source,
            connection: configured.connection,
            pending_error: configured.credential_error,
            disabled: false,
            stats: None,
        }
    }

    /// The connection settings this collector was built with.
    pub fn connection(&self) -> &ConnectionConfig {
        &self.connection
    }

    /// The record produced by the last successful poll, if any.
    pub fn stats(&self) -> Option<&StatusRecord> {
        self.stats.as_ref()
    }

    /// True if the host has switched this panel off.
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Switch the panel on or off. A disabled panel renders nothing and its
    /// polls never reach OctoPrint.
    pub fn set_disabled(&mut self, disabled: bool) {
        self.disabled = disabled;
    }

    /// Run one poll cycle and replace the stored record.
    ///
    /// Connection problems and error statuses from OctoPrint come back as an
    /// error snapshot. Only a malformed payload from an otherwise successful
    /// response is returned as [Error::ContractViolation]; the stored record
    /// is dropped in that case.
    ///
    /// While the panel is disabled nothing is requested; the stored record
    /// (or an empty one) is handed back unchanged.
    pub async fn poll(&mut self) -> Result<StatusRecord> {
        if self.disabled {
            tracing::trace!("octoprint panel disabled, skipping update");
            return Ok(self.stats.clone().unwrap_or_default());
        }

        match self.update().await {
            Ok(record) => {
                tracing::debug!(
                    state = record.state,
                    error = record.error.as_deref().unwrap_or(""),
                    "updated octoprint stats"
                );
                self.stats = Some(record.clone());
                Ok(record)
            }
            Err(err) => {
                tracing::warn!(error = err.to_string(), "octoprint returned an unexpected payload");
                self.stats = None;
                Err(err)
            }
        }
    }

    async fn update(&mut self) -> Result<StatusRecord> {
        if let Some(err) = self.pending_error.take() {
            return Ok(StatusRecord::error(err.to_string()));
        }

        let (printer, job) = match self.fetch().await {
            Ok(responses) => responses,
            Err(err) => return Ok(StatusRecord::error(err.to_string())),
        };

        if !printer.is_success() {
            let err = Error::UpstreamHttp {
                status: printer.status,
                body: printer.body,
            };
            tracing::debug!(status = printer.status, "octoprint refused the printer request");
            return Ok(StatusRecord::error(err.to_string()));
        }

        let printer: PrinterState = printer.json()?;
        let job: JobState = job.json()?;

        Ok(StatusRecord::from_payloads(printer, job))
    }

    async fn fetch(&self) -> Result<(Response, Response)> {
        let printer = self.source.printer().await.map_err(Error::Transport)?;
        let job = self.source.job().await.map_err(Error::Transport)?;
        Ok((printer, job))
    }

    /// Render the stored record for a panel `max_width` columns wide.
    pub fn msg_lines(&self, max_width: usize) -> Vec<Segment> {
        if self.disabled {
            return vec![];
        }
        render(self.stats.as_ref(), max_width)
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::Cell, collections::VecDeque, sync::Mutex};

    use pretty_assertions::assert_eq;
    use testresult::TestResult;

    use super::*;
    use crate::to_lines;

    const PRINTER_BODY: &str = r#"{"temperature": {"tool0": {"actual": 200.4, "target": 210}, "bed": {"actual": 60.1, "target": 60}}}"#;
    const JOB_BODY: &str = r#"{"job": {"estimatedPrintTime": 7200}, "progress": {"printTime": 3661, "printTimeLeft": 3539}, "state": "Printing"}"#;

    enum Reply {
        Answer(u16, &'static str),
        Refused,
    }

    /// Plays back canned replies, one per request, in order.
    struct StubSource {
        replies: Mutex<VecDeque<Reply>>,
        requests: Cell<usize>,
    }

    impl StubSource {
        fn new(replies: impl IntoIterator<Item = Reply>) -> Self {
            Self {
                replies: Mutex::new(replies.into_iter().collect()),
                requests: Cell::new(0),
            }
        }

        fn next(&self, endpoint: &'static str) -> octoprint::Result<Response> {
            self.requests.set(self.requests.get() + 1);
            match self.replies.lock().unwrap().pop_front() {
                Some(Reply::Answer(status, body)) => Ok(Response {
                    endpoint,
                    status,
                    body: body.to_owned(),
                }),
                Some(Reply::Refused) | None => Err(refused()),
            }
        }
    }

    impl StatusSource for StubSource {
        async fn printer(&self) -> octoprint::Result<Response> {
            self.next(octoprint::PRINTER_PATH)
        }

        async fn job(&self) -> octoprint::Result<Response> {
            self.next(octoprint::JOB_PATH)
        }
    }

    /// A transport error produced without touching the network.
    fn refused() -> octoprint::Error {
        let err = reqwest::Client::new().get("http://").build().unwrap_err();
        octoprint::Error::Transport(err)
    }

    fn configured() -> Configured {
        Configured {
            connection: ConnectionConfig::default(),
            credential_error: None,
        }
    }

    fn collector(replies: impl IntoIterator<Item = Reply>) -> StatusCollector<StubSource> {
        StatusCollector::new(StubSource::new(replies), configured())
    }

    #[tokio::test]
    async fn test_healthy_poll() -> TestResult {
        let mut collector = collector([Reply::Answer(200, PRINTER_BODY), Reply::Answer(200, JOB_BODY)]);

        let record = collector.poll().await?;
        assert_eq!(record.error, None);
        assert_eq!(record.state, "Printing");
        assert_eq!(record.estimated_print_time, Some(7200.0));
        assert_eq!(record.progress_print_time, Some(3661.0));
        assert_eq!(record.progress_print_time_left, Some(3539.0));
        assert_eq!(
            record.temperature,
            Some(IndexMap::from([
                (
                    "bed".to_owned(),
                    ToolTemperature {
                        actual: Some(60.1),
                        target: Some(60.0)
                    }
                ),
                (
                    "tool0".to_owned(),
                    ToolTemperature {
                        actual: Some(200.4),
                        target: Some(210.0)
                    }
                ),
            ]))
        );
        let tools: Vec<&str> = record.temperature.iter().flatten().map(|(name, _)| name.as_str()).collect();
        assert_eq!(tools, vec!["tool0", "bed"]);
        assert_eq!(collector.stats(), Some(&record));
        Ok(())
    }

    #[tokio::test]
    async fn test_tool_rows_follow_payload_order() -> TestResult {
        let mut collector = collector([Reply::Answer(200, PRINTER_BODY), Reply::Answer(200, JOB_BODY)]);
        collector.poll().await?;

        let lines = to_lines(&collector.msg_lines(40));
        assert_eq!(lines[2], format!("{:<30}200°C  210°C", "tool0"));
        assert_eq!(lines[3], format!("{:<30} 60°C   60°C", "bed"));
        Ok(())
    }

    #[tokio::test]
    async fn test_disabled_collector_skips_requests() -> TestResult {
        let mut collector = collector([Reply::Answer(200, PRINTER_BODY), Reply::Answer(200, JOB_BODY)]);
        collector.set_disabled(true);

        assert_eq!(collector.poll().await?, StatusRecord::default());
        assert_eq!(collector.source.requests.get(), 0);
        assert_eq!(collector.stats(), None);

        collector.set_disabled(false);
        let record = collector.poll().await?;
        assert_eq!(record.state, "Printing");
        assert_eq!(collector.source.requests.get(), 2);

        collector.set_disabled(true);
        assert_eq!(collector.poll().await?, record);
        assert_eq!(collector.source.requests.get(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_connection_fault_is_error_record() -> TestResult {
        let mut collector = collector([Reply::Refused]);

        let record = collector.poll().await?;
        assert_eq!(record.state, ERROR_STATE);
        let error = record.error.as_deref().unwrap_or_default();
        assert!(error.starts_with("Unable to connect: "), "{error}");
        assert_eq!(record.temperature, None);
        assert_eq!(record.progress_print_time, None);
        // The job endpoint is never asked once the printer request failed.
        assert_eq!(collector.source.requests.get(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_job_fault_is_error_record() -> TestResult {
        let mut collector = collector([Reply::Answer(200, PRINTER_BODY), Reply::Refused]);

        let record = collector.poll().await?;
        assert!(record.is_error());
        assert_eq!(record.temperature, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_printer_error_status_keeps_body() -> TestResult {
        let mut collector = collector([Reply::Answer(500, "server down"), Reply::Answer(200, JOB_BODY)]);

        let record = collector.poll().await?;
        assert_eq!(record, StatusRecord::error("server down"));
        Ok(())
    }

    #[tokio::test]
    async fn test_failure_replaces_previous_record() -> TestResult {
        let mut collector = collector([
            Reply::Answer(200, PRINTER_BODY),
            Reply::Answer(200, JOB_BODY),
            Reply::Answer(409, "Printer is not operational"),
            Reply::Answer(409, "Printer is not operational"),
        ]);

        assert!(!collector.poll().await?.is_error());
        collector.poll().await?;
        assert_eq!(collector.stats(), Some(&StatusRecord::error("Printer is not operational")));
        Ok(())
    }

    #[tokio::test]
    async fn test_malformed_job_is_contract_violation() -> TestResult {
        let mut collector = collector([
            Reply::Answer(200, PRINTER_BODY),
            Reply::Answer(200, r#"{"job": {}, "state": "Printing"}"#),
        ]);

        match collector.poll().await {
            Err(Error::ContractViolation { endpoint, .. }) => assert_eq!(endpoint, octoprint::JOB_PATH),
            other => panic!("expected a contract violation, got {other:?}"),
        }
        assert_eq!(collector.stats(), None);
        Ok(())
    }

    #[tokio::test]
    async fn test_credential_error_surfaces_once() -> TestResult {
        let mut collector = StatusCollector::new(
            StubSource::new([Reply::Answer(200, PRINTER_BODY), Reply::Answer(200, JOB_BODY)]),
            Configured {
                connection: ConnectionConfig::default(),
                credential_error: Some(Error::ConfigRead {
                    path: "/home/pi/.octoprint/config.yaml".into(),
                    source: "bad yaml".into(),
                }),
            },
        );

        let record = collector.poll().await?;
        assert_eq!(
            record,
            StatusRecord::error("Unable to read /home/pi/.octoprint/config.yaml: bad yaml")
        );
        assert_eq!(collector.source.requests.get(), 0);

        let record = collector.poll().await?;
        assert_eq!(record.state, "Printing");
        Ok(())
    }

    #[tokio::test]
    async fn test_msg_lines_respects_disabled_flag() -> TestResult {
        let mut collector = collector([Reply::Answer(500, "server down"), Reply::Answer(200, JOB_BODY)]);
        assert!(collector.msg_lines(80).is_empty());

        collector.poll().await?;
        assert_eq!(to_lines(&collector.msg_lines(40)).len(), 2);

        collector.set_disabled(true);
        assert!(collector.is_disabled());
        assert!(collector.msg_lines(40).is_empty());
        Ok(())
    }

    #[test]
    fn test_export_keys() -> TestResult {
        let printer: PrinterState = serde_json::from_str(PRINTER_BODY)?;
        let job: JobState = serde_json::from_str(JOB_BODY)?;
        let export = serde_json::to_value(StatusRecord::from_payloads(printer, job))?;

        assert_eq!(export["state"], "Printing");
        assert_eq!(export["progress_printTime"], 3661.0);
        assert_eq!(export["progress_printTimeLeft"], 3539.0);
        assert_eq!(export["estimatedPrintTime"], 7200.0);
        assert_eq!(export["temperature"]["tool0"]["target"], 210.0);
        assert!(export.get("error").is_none());

        let export = serde_json::to_value(StatusRecord::error("server down"))?;
        assert_eq!(export["state"], "Error");
        assert_eq!(export["error"], "server down");
        assert!(export.get("temperature").is_none());
        assert!(export.get("estimatedPrintTime").is_none());
        assert!(export.get("progress_printTime").is_none());
        assert!(export.get("progress_printTimeLeft").is_none());
        assert_eq!(export.as_object().map(|o| o.len()), Some(2));
        Ok(())
    }

    #[test]
    fn test_export_keeps_tool_order() -> TestResult {
        let printer: PrinterState = serde_json::from_str(PRINTER_BODY)?;
        let job: JobState = serde_json::from_str(JOB_BODY)?;
        let export = serde_json::to_string(&StatusRecord::from_payloads(printer, job))?;

        let tool0 = export.find("\"tool0\"").ok_or("tool0 missing")?;
        let bed = export.find("\"bed\"").ok_or("bed missing")?;
        assert!(tool0 < bed, "{export}");
        Ok(())
    }
}
