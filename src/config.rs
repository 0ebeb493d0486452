use crate::engine::ScanConfig;
use crate::providers::AdapterConfig;
use clap::Parser;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub scan: ScanSettings,
    pub provider: ProviderSettings,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScanSettings {
    /// Region-scan units running in parallel (default: 8)
    pub max_concurrent_regions: usize,
    /// Adapter calls in flight per region (default: 16)
    pub max_concurrent_api_calls: usize,
    /// Per-region deadline in seconds (default: 300)
    pub region_timeout_secs: u64,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            max_concurrent_regions: 8,
            max_concurrent_api_calls: 16,
            region_timeout_secs: 300,
        }
    }
}

impl ScanSettings {
    pub fn scan_config(&self) -> ScanConfig {
        ScanConfig {
            max_concurrent_regions: self.max_concurrent_regions,
            max_concurrent_api_calls: self.max_concurrent_api_calls,
            region_timeout: Duration::from_secs(self.region_timeout_secs),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    /// Connect timeout in seconds (default: 60)
    pub connect_timeout_secs: u64,
    /// Read timeout in seconds (default: 60)
    pub read_timeout_secs: u64,
    /// Bounded retry attempts per call (default: 3)
    pub max_attempts: u32,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self { connect_timeout_secs: 60, read_timeout_secs: 60, max_attempts: 3 }
    }
}

impl ProviderSettings {
    pub fn adapter_config(&self) -> AdapterConfig {
        AdapterConfig {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            read_timeout: Duration::from_secs(self.read_timeout_secs),
            max_attempts: self.max_attempts,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), file: None }
    }
}

/// Command line arguments for configuration overrides
#[derive(Parser, Debug, Clone)]
#[command(name = "cloudsweep")]
#[command(version, about = "Cloudsweep - Cloud Waste Detection Engine")]
pub struct CommandLineArgs {
    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Comma-separated regions to scan (default: all reachable regions)
    #[arg(long, value_name = "REGIONS")]
    pub regions: Option<String>,

    /// Path to a JSON file of per-resource-type rule overrides
    #[arg(long, value_name = "PATH")]
    pub rules: Option<String>,

    /// Access key id (default: ambient credential chain)
    #[arg(long, value_name = "KEY", env = "CLOUDSWEEP_ACCESS_KEY_ID")]
    pub access_key_id: Option<String>,

    /// Secret access key (default: ambient credential chain)
    #[arg(long, value_name = "SECRET", env = "CLOUDSWEEP_SECRET_ACCESS_KEY")]
    pub secret_access_key: Option<String>,

    /// Output format: json or summary
    #[arg(long, value_name = "FORMAT", default_value = "json")]
    pub output: String,

    /// Log level (overrides config file)
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Region-scan parallelism (overrides config file)
    #[arg(long, value_name = "N")]
    pub max_concurrent_regions: Option<usize>,
}

impl Config {
    /// Load configuration: explicit path, then `conf/config.toml`, then
    /// built-in defaults.
    pub fn load(path: Option<&str>) -> anyhow::Result<Config> {
        let candidate = path.unwrap_or("conf/config.toml");
        if Path::new(candidate).exists() {
            let raw = fs::read_to_string(candidate)?;
            let config = toml::from_str(&raw)?;
            Ok(config)
        } else if path.is_some() {
            anyhow::bail!("configuration file not found: {candidate}");
        } else {
            Ok(Config::default())
        }
    }

    /// Apply command line overrides on top of file values.
    pub fn apply_args(&mut self, args: &CommandLineArgs) {
        if let Some(level) = &args.log_level {
            self.logging.level = level.clone();
        }
        if let Some(regions) = args.max_concurrent_regions {
            self.scan.max_concurrent_regions = regions;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_engine_contract() {
        let config = Config::default();
        assert_eq!(config.scan.max_concurrent_regions, 8);
        assert_eq!(config.scan.max_concurrent_api_calls, 16);
        assert_eq!(config.scan.region_timeout_secs, 300);
        assert_eq!(config.provider.max_attempts, 3);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [scan]
            max_concurrent_regions = 2
            "#,
        )
        .unwrap();
        assert_eq!(config.scan.max_concurrent_regions, 2);
        assert_eq!(config.scan.max_concurrent_api_calls, 16);
        assert_eq!(config.logging.level, "info");
    }
}
