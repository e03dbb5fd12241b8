//! Configuration management for webprobe

use crate::error::{Result, WebProbeError};
use crate::models::{EndpointTemplates, ScanConfig, Thresholds};
use serde::Deserialize;
use std::path::Path;

/// File-based configuration structure matching default.toml
#[derive(Debug, Deserialize)]
struct FileConfig {
    target: Option<TargetSection>,
    scan: Option<ScanSection>,
    modules: Option<ModulesSection>,
    endpoints: Option<EndpointTemplates>,
    thresholds: Option<Thresholds>,
}

#[derive(Debug, Deserialize)]
struct TargetSection {
    url: Option<String>,
    username: Option<String>,
    password: Option<String>,
    seeds: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct ScanSection {
    concurrency: Option<usize>,
    timeout_secs: Option<u64>,
    retries: Option<u32>,
    user_agent: Option<String>,
    follow_redirects: Option<bool>,
    max_depth: Option<u32>,
    max_pages: Option<usize>,
    concurrent: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct ModulesSection {
    enabled: Option<Vec<String>>,
}

/// Loads configuration from a TOML file and merges with defaults
pub fn load_config(path: &Path) -> Result<ScanConfig> {
    let content = std::fs::read_to_string(path).map_err(WebProbeError::IoError)?;
    parse_config(&content)
}

/// Parses TOML configuration text layered over the defaults
pub fn parse_config(content: &str) -> Result<ScanConfig> {
    let file_config: FileConfig = toml::from_str(content)?;

    let mut config = ScanConfig::default();

    if let Some(target) = file_config.target {
        if let Some(url) = target.url {
            config.target = url;
        }
        if let Some(username) = target.username {
            config.credentials.username = username;
        }
        if let Some(password) = target.password {
            config.credentials.password = password;
        }
        if let Some(seeds) = target.seeds {
            config.seeds = seeds;
        }
    }

    if let Some(scan) = file_config.scan {
        if let Some(concurrency) = scan.concurrency {
            config.concurrency = concurrency;
        }
        if let Some(timeout) = scan.timeout_secs {
            config.timeout_secs = timeout;
        }
        if let Some(retries) = scan.retries {
            config.retries = retries;
        }
        if let Some(ua) = scan.user_agent {
            config.user_agent = ua;
        }
        if let Some(follow) = scan.follow_redirects {
            config.follow_redirects = follow;
        }
        if let Some(depth) = scan.max_depth {
            config.max_depth = depth;
        }
        if let Some(pages) = scan.max_pages {
            config.max_pages = pages;
        }
        if let Some(concurrent) = scan.concurrent {
            config.concurrent = concurrent;
        }
    }

    if let Some(modules) = file_config.modules {
        if let Some(enabled) = modules.enabled {
            config.modules = enabled;
        }
    }

    if let Some(endpoints) = file_config.endpoints {
        config.endpoints = endpoints;
    }
    if let Some(thresholds) = file_config.thresholds {
        config.thresholds = thresholds;
    }

    validate(&config)?;
    Ok(config)
}

/// Upper bound on request attempts per request
pub const MAX_RETRIES: u32 = 10;

/// Rejects values the scanner cannot run with
pub fn validate(config: &ScanConfig) -> Result<()> {
    if config.concurrency == 0 {
        return Err(WebProbeError::ConfigError(
            "concurrency must be at least 1".to_string(),
        ));
    }
    if config.retries == 0 {
        return Err(WebProbeError::ConfigError(
            "retries must be at least 1".to_string(),
        ));
    }
    if config.retries > MAX_RETRIES {
        return Err(WebProbeError::ConfigError(format!(
            "retries must be at most {MAX_RETRIES}, got {}",
            config.retries
        )));
    }
    let ratio = config.thresholds.length_delta_ratio;
    if !(ratio > 0.0 && ratio.is_finite()) {
        return Err(WebProbeError::ConfigError(format!(
            "length_delta_ratio must be positive, got {ratio}"
        )));
    }
    Ok(())
}

/// Merges CLI arguments into an existing ScanConfig
#[allow(clippy::too_many_arguments)]
pub fn merge_cli_args(
    config: &mut ScanConfig,
    target: Option<String>,
    username: Option<String>,
    password: Option<String>,
    concurrency: Option<usize>,
    timeout: Option<u64>,
    max_depth: Option<u32>,
    modules: Option<Vec<String>>,
    concurrent: bool,
) {
    if let Some(t) = target {
        config.target = t;
    }
    if let Some(u) = username {
        config.credentials.username = u;
    }
    if let Some(p) = password {
        config.credentials.password = p;
    }
    if let Some(c) = concurrency {
        config.concurrency = c;
    }
    if let Some(t) = timeout {
        config.timeout_secs = t;
    }
    if let Some(d) = max_depth {
        config.max_depth = d;
    }
    if let Some(m) = modules {
        config.modules = m;
    }
    if concurrent {
        config.concurrent = true;
    }
}
