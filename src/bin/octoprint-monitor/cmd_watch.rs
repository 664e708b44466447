use std::time::Duration;

use anyhow::{bail, Result};
use octoprint_monitor::StatusCollector;

pub async fn main(collector: &mut StatusCollector, interval: u64, width: usize, max_failures: usize) -> Result<()> {
    tracing::info!(
        printer_url = collector.connection().printer_url(),
        interval = interval,
        "watching octoprint"
    );

    let mut ticker = tokio::time::interval(Duration::from_secs(interval));
    let mut failures = 0;

    loop {
        ticker.tick().await;

        match collector.poll().await {
            Ok(_) => failures = 0,
            Err(e) => {
                failures += 1;
                tracing::warn!(failures = failures, max_failures = max_failures, "poll failed");
                if failures >= max_failures {
                    collector.set_disabled(true);
                    bail!("disabling the octoprint panel after {} failed polls: {}", failures, e);
                }
            }
        }

        super::print_panel(collector, width);
        println!();
    }
}
