//! Configuration management commands.

use console::style;

use crate::cli::icons::error;
use crate::config::Config;

/// Effective configuration with every section present, defaults included.
fn effective_json(config: &Config) -> anyhow::Result<serde_json::Value> {
    Ok(serde_json::json!({
        "rate_limits": serde_json::to_value(&config.rate_limits)?,
        "retry": serde_json::to_value(config.retry)?,
        "llm": serde_json::to_value(&config.llm)?,
    }))
}

/// Print the effective configuration as TOML.
pub fn cmd_config_show(config: &Config) -> anyhow::Result<()> {
    match &config.source_path {
        Some(path) => eprintln!("{} {}", style("# Loaded from").dim(), path.display()),
        None => eprintln!("{}", style("# No config file found, showing defaults").dim()),
    }

    let value = effective_json(config)?;
    print!("{}", toml::to_string_pretty(&value)?);
    Ok(())
}

/// Print a single setting.
pub fn cmd_config_get(config: &Config, setting: &str) -> anyhow::Result<()> {
    let value = effective_json(config)?;
    match navigate_json(&value, setting)? {
        serde_json::Value::String(s) => println!("{}", s),
        serde_json::Value::Null => println!("null"),
        other => println!("{}", serde_json::to_string_pretty(other)?),
    }
    Ok(())
}

/// Navigate to a value at a dot-separated path.
fn navigate_json<'a>(
    value: &'a serde_json::Value,
    path: &str,
) -> anyhow::Result<&'a serde_json::Value> {
    if path.is_empty() {
        return Ok(value);
    }

    let mut current = value;
    for part in path.split('.') {
        current = match current {
            serde_json::Value::Object(map) => map
                .get(part)
                .ok_or_else(|| anyhow::anyhow!("{} Setting '{}' not found", error(), path))?,
            _ => anyhow::bail!(
                "{} Cannot navigate into non-object at '{}'",
                error(),
                part
            ),
        };
    }

    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_navigate_effective_config() {
        let config = Config::default();
        let value = effective_json(&config).unwrap();

        assert_eq!(navigate_json(&value, "retry.max_retries").unwrap(), 3);
        assert_eq!(
            navigate_json(&value, "rate_limits.default.requests_per_minute").unwrap(),
            10
        );
        assert_eq!(
            navigate_json(&value, "rate_limits.default.cooldown_period_secs").unwrap(),
            60
        );
        assert!(navigate_json(&value, "llm.api_key").is_err());
        assert!(navigate_json(&value, "retry.max_retries.deeper").is_err());
    }

    #[test]
    fn test_effective_config_renders_as_toml() {
        let value = effective_json(&Config::default()).unwrap();
        let rendered = toml::to_string_pretty(&value).unwrap();
        assert!(rendered.contains("[retry]"));
        assert!(rendered.contains("base_delay_secs = 2"));
    }
}
