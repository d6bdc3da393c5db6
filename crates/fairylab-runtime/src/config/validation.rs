//! Checks a loaded [`FairylabConfig`] before the runtime starts.

use fairylab_transport::RetryConfig;

use super::error::{ConfigError, ConfigResult};
use super::schema::{FairylabConfig, KernelConfig, LogOutput, SlackConfig};

/// Rejects settings the runtime cannot start with. Errors name the dotted
/// path of the offending setting.
pub fn validate_config(config: &FairylabConfig) -> ConfigResult<()> {
    if config.logging.output == LogOutput::File && config.logging.file_path.is_none() {
        return Err(ConfigError::MissingField {
            field: "logging.file_path",
        });
    }
    validate_slack(&config.slack)?;
    validate_kernel(&config.kernel)?;

    if !config.render.docs_url.is_empty() {
        validate_url("render.docs_url", &config.render.docs_url)?;
    }
    if !config.render.home_url.is_empty() {
        validate_url("render.home_url", &config.render.home_url)?;
    }
    Ok(())
}

fn validate_slack(slack: &SlackConfig) -> ConfigResult<()> {
    if slack.testing_channel.trim().is_empty() {
        return Err(ConfigError::MissingField {
            field: "slack.testing_channel",
        });
    }
    validate_url("slack.api_url", &slack.api_url)?;
    validate_retry(&slack.retry)
}

fn validate_kernel(kernel: &KernelConfig) -> ConfigResult<()> {
    if kernel.tick_interval_secs == 0 {
        return Err(ConfigError::invalid(
            "kernel.tick_interval_secs",
            "must be greater than 0",
        ));
    }
    if kernel.task_interval_secs == 0 {
        return Err(ConfigError::invalid(
            "kernel.task_interval_secs",
            "must be greater than 0",
        ));
    }
    Ok(())
}

fn validate_retry(retry: &RetryConfig) -> ConfigResult<()> {
    if retry.initial_delay_ms == 0 {
        return Err(ConfigError::invalid(
            "slack.retry.initial_delay_ms",
            "must be greater than 0",
        ));
    }
    if retry.max_delay_ms < retry.initial_delay_ms {
        return Err(ConfigError::invalid(
            "slack.retry.max_delay_ms",
            format!("must be at least initial_delay_ms ({})", retry.initial_delay_ms),
        ));
    }
    // NaN fails every comparison, so test finiteness first.
    if !retry.multiplier.is_finite() || retry.multiplier < 1.0 {
        return Err(ConfigError::invalid(
            "slack.retry.multiplier",
            format!("must be a finite number of at least 1.0, got {}", retry.multiplier),
        ));
    }
    Ok(())
}

fn validate_url(field: &'static str, url: &str) -> ConfigResult<()> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(ConfigError::invalid(
            field,
            format!("{url:?} is not an http(s) URL"),
        ))
    }
}
