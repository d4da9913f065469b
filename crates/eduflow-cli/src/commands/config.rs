//! Config command handlers

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use eduflow_core::Config;

use crate::output::{Output, OutputFormat};

/// Show current configuration
pub fn show(config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "data_dir": config.data_dir,
                    "freeze_window_days": config.freeze_window_days,
                    "email_domain": config.email_domain,
                    "log_level": config.log_level
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.data_dir.display());
        }
        OutputFormat::Human => {
            let effective_path = config_path
                .cloned()
                .unwrap_or_else(Config::config_file_path);
            println!("Configuration:");
            println!("  data_dir:           {}", config.data_dir.display());
            println!("  freeze_window_days: {}", config.freeze_window_days);
            println!("  email_domain:       {}", config.email_domain);
            println!("  log_level:          {}", config.log_level);
            println!();
            println!("Config file: {}", effective_path.display());
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(
    key: String,
    value: String,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    let mut config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    apply(&mut config, &key, &value)?;

    // Save to the CLI-specified path or default
    let save_path = config_path
        .cloned()
        .unwrap_or_else(Config::config_file_path);
    config
        .save_to_path(&save_path)
        .context("Failed to save configuration")?;

    output.success(&format!("Set {} = {}", key, value));

    Ok(())
}

fn apply(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "data_dir" => {
            config.data_dir = value.into();
        }
        "freeze_window_days" => {
            let days: i64 = value
                .trim()
                .parse()
                .context("Invalid value for freeze_window_days. Use a whole number of days.")?;
            if days < 0 {
                bail!("freeze_window_days must not be negative");
            }
            config.freeze_window_days = days;
        }
        "email_domain" => {
            if value.trim().is_empty() {
                bail!("email_domain must not be empty");
            }
            config.email_domain = value.trim().to_string();
        }
        "log_level" => {
            config.log_level = value.to_string();
        }
        _ => {
            bail!(
                "Unknown configuration key: '{}'\n\
                 Valid keys: data_dir, freeze_window_days, email_domain, log_level",
                key
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_apply_known_keys() {
        let mut config = Config::default();
        apply(&mut config, "freeze_window_days", "14").unwrap();
        apply(&mut config, "email_domain", "school.test").unwrap();
        apply(&mut config, "data_dir", "/srv/eduflow").unwrap();
        apply(&mut config, "log_level", "debug").unwrap();

        assert_eq!(config.freeze_window_days, 14);
        assert_eq!(config.email_domain, "school.test");
        assert_eq!(config.data_dir, Path::new("/srv/eduflow"));
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_apply_rejects_bad_values() {
        let mut config = Config::default();
        assert!(apply(&mut config, "freeze_window_days", "soon").is_err());
        assert!(apply(&mut config, "freeze_window_days", "-2").is_err());
        assert!(apply(&mut config, "email_domain", " ").is_err());
        assert!(apply(&mut config, "sync_url", "x").is_err());
        assert_eq!(config.freeze_window_days, 7);
    }
}
