//! Turn a [StatusRecord] into fixed width rows for the dashboard.

use parse_display::Display;

use crate::StatusRecord;

/// Columns reserved to the right of the title and temperature header.
const TITLE_MARGIN: usize = 11;

/// Columns reserved to the right of each tool name.
const TOOL_MARGIN: usize = 10;

/// Columns reserved to the right of the time labels.
const TIME_MARGIN: usize = 5;

/// Placeholder for a value OctoPrint did not report.
const MISSING: &str = "None";

/// How the dashboard should draw a piece of text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
#[display(style = "SNAKE_CASE")]
pub enum Style {
    /// Panel heading.
    Title,
    /// Everything else.
    Default,
}

/// One element of the rendered panel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Segment {
    /// Text appended to the current row.
    Text {
        /// What to draw.
        msg: String,
        /// How to draw it.
        style: Style,
    },
    /// Start a new row.
    NewLine,
}

impl Segment {
    fn title(msg: String) -> Self {
        Self::Text {
            msg,
            style: Style::Title,
        }
    }

    fn text(msg: impl Into<String>) -> Self {
        Self::Text {
            msg: msg.into(),
            style: Style::Default,
        }
    }
}

/// Render `record` for a panel `max_width` columns wide.
///
/// Renders nothing for a missing record. An error snapshot renders as the
/// title and the error message; a healthy one as the title, a temperature
/// header, one row per tool and the elapsed and remaining print time.
pub fn render(record: Option<&StatusRecord>, max_width: usize) -> Vec<Segment> {
    let mut ret = vec![];
    let Some(record) = record else {
        return ret;
    };

    let name_max_width = max_width.saturating_sub(TITLE_MARGIN);
    ret.push(Segment::title(format!(
        "{:<name_max_width$}",
        format!("OCTOPRINT {}", record.state)
    )));
    ret.push(Segment::NewLine);

    if let Some(error) = &record.error {
        ret.push(Segment::text(format!("{error:<name_max_width$}")));
        return ret;
    }

    ret.push(Segment::text(format!("{:<name_max_width$}", "Temperature")));
    ret.push(Segment::text("actual target"));
    ret.push(Segment::NewLine);

    let tool_max_width = max_width.saturating_sub(TOOL_MARGIN);
    for (name, tool) in record.temperature.iter().flatten() {
        ret.push(Segment::text(format!("{name:<tool_max_width$}")));
        ret.push(Segment::text(format!(
            "{:>3}°C  {:>3}°C",
            whole_degrees(tool.actual),
            whole_degrees(tool.target)
        )));
        ret.push(Segment::NewLine);
    }

    let time_max_width = max_width.saturating_sub(TIME_MARGIN);
    ret.push(Segment::text(format!("{:<time_max_width$}", "Time passed:")));
    ret.push(Segment::text(format!("{:>6}", optional_duration(record.progress_print_time))));
    ret.push(Segment::NewLine);
    ret.push(Segment::text(format!("{:<time_max_width$}", "Time left:")));
    ret.push(Segment::text(format!(
        "{:>6}",
        optional_duration(record.progress_print_time_left)
    )));

    ret
}

/// Join segments into display rows, dropping the styling.
pub fn to_lines(segments: &[Segment]) -> Vec<String> {
    let mut lines: Vec<String> = vec![];
    for segment in segments {
        match segment {
            Segment::Text { msg, .. } => match lines.last_mut() {
                Some(line) => line.push_str(msg),
                None => lines.push(msg.clone()),
            },
            Segment::NewLine => {
                if lines.is_empty() {
                    lines.push(String::new());
                }
                lines.push(String::new());
            }
        }
    }
    lines
}

/// Format whole seconds as `H:MM:SS`, with a `N day(s), ` prefix once the
/// duration spans a day.
pub fn format_duration(seconds: i64) -> String {
    let days = seconds.div_euclid(86_400);
    let rem = seconds.rem_euclid(86_400);
    let clock = format!("{}:{:02}:{:02}", rem / 3_600, rem % 3_600 / 60, rem % 60);

    match days {
        0 => clock,
        1 | -1 => format!("{days} day, {clock}"),
        _ => format!("{days} days, {clock}"),
    }
}

fn whole_degrees(celsius: Option<f64>) -> String {
    celsius.map_or_else(|| MISSING.to_owned(), |c| (c as i64).to_string())
}

fn optional_duration(seconds: Option<f64>) -> String {
    seconds.map_or_else(|| MISSING.to_owned(), |s| format_duration(s as i64))
}
