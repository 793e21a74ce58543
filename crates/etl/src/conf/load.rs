//! Load: config from file or environment variables.

use std::path::Path;

use tracing::info;

use super::model::EtlConfig;
use crate::error::EtlError;

const CONFIG_FILE_VAR: &str = "ETL_CONFIG_FILE";
const DEFAULT_CONFIG_FILE: &str = "/etc/etl/etl.toml";

impl EtlConfig {
    /// Priority: environment variables > config file > defaults.
    pub fn load() -> Result<Self, EtlError> {
        let config_path =
            std::env::var(CONFIG_FILE_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());

        let mut config = if Path::new(&config_path).exists() {
            info!(path = %config_path, "loading configuration file");
            Self::from_file(&config_path)?
        } else {
            info!(path = %config_path, "config file not found, using environment variables");
            Self::from_env()
        };

        config.apply_overrides(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, EtlError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| EtlError::io(path, e))?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, EtlError> {
        toml::from_str(contents).map_err(|e| EtlError::Config(e.to_string()))
    }

    /// Defaults with every `ETL_*` variable applied.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        config.apply_overrides(&lookup);

        if let Some(prefix) = lookup("ETL_OUTPUT_PREFIX") {
            config.output_prefix = prefix;
        }
        if let Some(product) = lookup("ETL_PRODUCT") {
            config.product = product;
        }
        let number = |name: &str| lookup(name).and_then(|s| s.trim().parse::<u64>().ok());
        if let Some(n) = number("ETL_INPUT_QUEUE_SIZE") {
            config.input_queue_size = n as usize;
        }
        if let Some(n) = number("ETL_OUTPUT_QUEUE_SIZE") {
            config.output_queue_size = n as usize;
        }
        if let Some(n) = number("ETL_PARSE_WORKERS") {
            config.parse_workers = n as usize;
        }
        if let Some(n) = number("ETL_SAVE_WORKERS") {
            config.save_workers = n as usize;
        }
        if let Some(n) = number("ETL_SWEEP_INTERVAL_SECS") {
            config.sweep_interval_secs = n;
        }
        if let Some(n) = number("ETL_RETENTION_DAYS") {
            config.retention_days = n.min(u32::MAX as u64) as u32;
        }
        config
    }

    /// Path settings that the environment overrides even when a config
    /// file was loaded.
    pub(crate) fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let targets: [(&str, &mut String); 5] = [
            ("ETL_OUTPUT_DIR", &mut self.output_dir),
            ("ETL_COLUMNS_MAP", &mut self.columns_map),
            ("ETL_SPIDER_LIST", &mut self.spider_list),
            ("ETL_HOST_WHITELIST", &mut self.host_whitelist),
            ("ETL_IP_BLACKLIST", &mut self.ip_blacklist),
        ];
        for (name, field) in targets {
            if let Some(value) = lookup(name) {
                *field = value;
            }
        }
    }

    pub fn validate(&self) -> Result<(), EtlError> {
        let positive = [
            ("input_queue_size", self.input_queue_size),
            ("output_queue_size", self.output_queue_size),
            ("parse_workers", self.parse_workers),
            ("save_workers", self.save_workers),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(EtlError::Config(format!("{name} must be > 0")));
            }
        }
        if self.sweep_interval_secs == 0 {
            return Err(EtlError::Config("sweep_interval_secs must be > 0".to_string()));
        }
        if self.tokenizer.min_fields < 11 {
            return Err(EtlError::Config(format!(
                "tokenizer.min_fields must be >= 11, got {}",
                self.tokenizer.min_fields
            )));
        }
        if self.output_dir.is_empty() {
            return Err(EtlError::Config("output_dir must not be empty".to_string()));
        }
        Ok(())
    }
}
