//! Boot: logging init, config load, and construction of the shared stages.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::conf::lists;
use crate::conf::EtlConfig;
use crate::filter::Classifier;
use crate::parser::Extractor;
use crate::pipeline::EtlContext;
use crate::writer::{FileOps, HandleRegistry, LiveFs, PartitionedWriter};

/// Initialise tracing. `RUST_LOG` overrides the `etl=info` default and
/// `ETL_LOG_FORMAT=json` switches to JSON lines.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "etl=info".into());
    let json = std::env::var("ETL_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Load config and build the stages on the real filesystem.
pub fn boot() -> anyhow::Result<(Arc<EtlContext>, EtlConfig)> {
    info!("starting etl v{}", env!("CARGO_PKG_VERSION"));

    let config = EtlConfig::load().context("loading configuration")?;
    info!(
        output_dir = %config.output_dir,
        prefix = config.prefix(),
        product = %config.product,
        "configuration loaded"
    );

    let context = build_context(&config, Box::new(LiveFs)).context("building pipeline stages")?;
    Ok((Arc::new(context), config))
}

/// Read every list and the column schema, then assemble the stages.
/// List files degrade to empty; only an invalid writer setup fails.
pub fn build_context(config: &EtlConfig, ops: Box<dyn FileOps>) -> anyhow::Result<EtlContext> {
    let spiders = lists::load_spiders(&config.spider_list);
    let whitelist = lists::load_whitelist(&config.host_whitelist);
    let blacklist = lists::load_blacklist(&config.ip_blacklist);
    let schema = lists::load_schema(&config.columns_map);
    info!(
        spiders = spiders.len(),
        hosts = whitelist.len(),
        blocked_ips = blacklist.len(),
        kinds = schema.len(),
        "reference data loaded"
    );

    let extractor = Extractor::new(
        config.tokenizer.clone(),
        spiders,
        config.cookies.clone(),
        config.product.as_str(),
    );
    let classifier = Classifier::new(config.classifier.clone(), whitelist, blacklist);

    let registry = HandleRegistry::new(ops, config.retention_days)
        .context("creating file handle registry")?;
    let writer = PartitionedWriter::new(
        Arc::new(schema),
        registry,
        config.output_dir.as_str(),
        config.prefix(),
    );

    Ok(EtlContext::new(extractor, classifier, writer))
}
