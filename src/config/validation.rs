use crate::config::types::{Config, CrawlerConfig, DownloaderConfig, OutputConfig, UserAgentConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    validate_downloader_config(&config.downloader)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    let listing = Url::parse(&config.listing_url).map_err(|e| {
        ConfigError::InvalidUrl(format!("Invalid listing_url '{}': {}", config.listing_url, e))
    })?;

    if listing.scheme() != "http" && listing.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "listing_url '{}' must use http or https",
            config.listing_url
        )));
    }

    if listing.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "listing_url '{}' has no host",
            config.listing_url
        )));
    }

    validate_item_path_prefix(&config.item_path_prefix)?;

    if !config.rate_limit_seconds.is_finite() {
        return Err(ConfigError::Validation(format!(
            "rate_limit_seconds must be a finite number, got {}",
            config.rate_limit_seconds
        )));
    }

    Ok(())
}

/// Validates an item path prefix such as "/product/"
fn validate_item_path_prefix(prefix: &str) -> Result<(), ConfigError> {
    if prefix.len() < 3 || !prefix.starts_with('/') || !prefix.ends_with('/') {
        return Err(ConfigError::Validation(format!(
            "item_path_prefix must start and end with '/', got '{}'",
            prefix
        )));
    }

    if prefix.contains("//") || prefix.chars().any(char::is_whitespace) {
        return Err(ConfigError::Validation(format!(
            "item_path_prefix '{}' is not a valid path",
            prefix
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    if config.crawler_version.trim().is_empty() {
        return Err(ConfigError::Validation(
            "crawler_version cannot be empty".to_string(),
        ));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    for (name, value) in [
        ("log_path", &config.log_path),
        ("report_path", &config.report_path),
        ("image_dir", &config.image_dir),
    ] {
        if value.trim().is_empty() {
            return Err(ConfigError::Validation(format!("{} cannot be empty", name)));
        }
    }

    if config.log_path == config.report_path {
        return Err(ConfigError::Validation(format!(
            "log_path and report_path must differ, both are '{}'",
            config.log_path
        )));
    }

    Ok(())
}

/// Validates image download configuration
fn validate_downloader_config(config: &DownloaderConfig) -> Result<(), ConfigError> {
    if config.max_retries < 1 {
        return Err(ConfigError::Validation(format!(
            "max_retries must be >= 1, got {}",
            config.max_retries
        )));
    }

    if !config.backoff_seconds.is_finite() || config.backoff_seconds < 0.0 {
        return Err(ConfigError::Validation(format!(
            "backoff_seconds must be a non-negative number, got {}",
            config.backoff_seconds
        )));
    }

    if config.max_file_size_bytes == Some(0) {
        return Err(ConfigError::Validation(
            "max_file_size_bytes must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    let Some((local, domain)) = email.split_once('@') else {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    };

    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    // Domain part should contain at least one dot
    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
