//! Model: EtlConfig and its nested sections.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::filter::ClassifierRules;
use crate::parser::{IdentityCookies, TokenizerLayout};
use crate::pipeline::PipelineSettings;

const DEFAULT_PREFIX: &str = "etl";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EtlConfig {
    /// Root of the partitioned output tree.
    pub output_dir: String,
    /// Output file name prefix; empty means `etl`.
    pub output_prefix: String,
    pub product: String,

    /// JSON column schema. Empty means not configured.
    pub columns_map: String,
    pub spider_list: String,
    pub host_whitelist: String,
    pub ip_blacklist: String,

    pub input_queue_size: usize,
    pub output_queue_size: usize,
    pub parse_workers: usize,
    pub save_workers: usize,
    pub sweep_interval_secs: u64,
    pub retention_days: u32,

    pub tokenizer: TokenizerLayout,
    pub classifier: ClassifierRules,
    pub cookies: IdentityCookies,
}

impl Default for EtlConfig {
    fn default() -> Self {
        Self {
            output_dir: "./".to_string(),
            output_prefix: DEFAULT_PREFIX.to_string(),
            product: "portal".to_string(),
            columns_map: String::new(),
            spider_list: String::new(),
            host_whitelist: String::new(),
            ip_blacklist: String::new(),
            input_queue_size: 100,
            output_queue_size: 200,
            parse_workers: 8,
            save_workers: 5,
            sweep_interval_secs: 2 * 60 * 60,
            retention_days: 5,
            tokenizer: TokenizerLayout::default(),
            classifier: ClassifierRules::default(),
            cookies: IdentityCookies::default(),
        }
    }
}

impl EtlConfig {
    pub fn prefix(&self) -> &str {
        if self.output_prefix.is_empty() {
            DEFAULT_PREFIX
        } else {
            &self.output_prefix
        }
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            input_queue_size: self.input_queue_size,
            output_queue_size: self.output_queue_size,
            parse_workers: self.parse_workers,
            save_workers: self.save_workers,
            sweep_interval: Duration::from_secs(self.sweep_interval_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── Defaults ─────────────────────────────────────────────────

    #[test]
    fn test_default_paths_and_names() {
        let cfg = EtlConfig::default();
        assert_eq!(cfg.output_dir, "./");
        assert_eq!(cfg.prefix(), "etl");
        assert_eq!(cfg.product, "portal");
        assert!(cfg.columns_map.is_empty());
        assert!(cfg.host_whitelist.is_empty());
    }

    #[test]
    fn test_default_pool_sizes() {
        let settings = EtlConfig::default().pipeline_settings();
        assert_eq!(settings.input_queue_size, 100);
        assert_eq!(settings.output_queue_size, 200);
        assert_eq!(settings.parse_workers, 8);
        assert_eq!(settings.save_workers, 5);
        assert_eq!(settings.sweep_interval, Duration::from_secs(7200));
    }

    #[test]
    fn test_default_sections() {
        let cfg = EtlConfig::default();
        assert_eq!(cfg.tokenizer.drop_positions, vec![2, 3, 8]);
        assert_eq!(cfg.tokenizer.min_fields, 11);
        assert_eq!(cfg.classifier.access_path, "/img/gut.gif");
        assert_eq!(cfg.cookies.session, "BDUSS");
        assert_eq!(cfg.retention_days, 5);
    }

    #[test]
    fn test_empty_prefix_falls_back() {
        let cfg = EtlConfig { output_prefix: String::new(), ..EtlConfig::default() };
        assert_eq!(cfg.prefix(), "etl");
    }

    // ── Deserialization ──────────────────────────────────────────

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let cfg: EtlConfig = toml::from_str(
            r#"
            output_dir = "/data/etl"
            save_workers = 2

            [classifier]
            open_path = "/img/o.gif"

            [tokenizer]
            drop_positions = [2, 3]
            "#,
        )
        .unwrap();

        assert_eq!(cfg.output_dir, "/data/etl");
        assert_eq!(cfg.save_workers, 2);
        assert_eq!(cfg.parse_workers, 8);
        assert_eq!(cfg.classifier.open_path, "/img/o.gif");
        assert_eq!(cfg.classifier.access_path, "/img/gut.gif");
        assert_eq!(cfg.tokenizer.drop_positions, vec![2, 3]);
        assert_eq!(cfg.tokenizer.min_fields, 11);
    }

    #[test]
    fn test_empty_toml_is_default() {
        let cfg: EtlConfig = toml::from_str("").unwrap();
        assert_eq!(cfg, EtlConfig::default());
    }
}
