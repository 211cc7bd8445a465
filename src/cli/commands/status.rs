//! Rate limit status command.

use console::style;

use crate::config::Config;

/// Show the limits and retry policy that apply to each configured model.
pub async fn cmd_status(config: &Config, json: bool) -> anyhow::Result<()> {
    let tracker = config.build_tracker();
    let statuses = tracker.all_status().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&statuses)?);
        return Ok(());
    }

    println!("\n{}", style("Rate Limits").bold());
    println!("{}", "-".repeat(60));
    println!(
        "{:<32} {:>10} {:>14}",
        "Model", "Limit/min", "Cooldown"
    );
    for model in statuses.keys() {
        let limits = tracker.limits_for(model);
        println!(
            "{:<32} {:>10} {:>13}s",
            model,
            limits.requests_per_minute,
            limits.cooldown_period.as_secs()
        );
    }

    let retry = &config.retry;
    println!("\n{}", style("Retry Policy").bold());
    println!("{}", "-".repeat(60));
    println!("{:<20} {}", "Max retries:", retry.max_retries);
    println!("{:<20} {:?}", "Base delay:", retry.base_delay);
    println!("{:<20} {:?}", "Max delay:", retry.max_delay);

    if let Some(path) = &config.source_path {
        println!("\n{} {}", style("Config:").dim(), path.display());
    }

    Ok(())
}
