use anyhow::Result;
use octoprint_monitor::StatusCollector;

pub async fn main(collector: &mut StatusCollector, width: usize, json: bool) -> Result<()> {
    let record = collector.poll().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        super::print_panel(collector, width);
    }

    Ok(())
}
