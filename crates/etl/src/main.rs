use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use etl::runtime::{boot, run};
use tracing::info;

/// Grace period for blocking-pool threads at exit. A stdin read parked
/// there never returns on its own.
const BLOCKING_GRACE: Duration = Duration::from_secs(1);

fn main() -> anyhow::Result<()> {
    boot::init_logging();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")?;

    let result = runtime.block_on(async {
        let (context, config) = boot::boot()?;
        let inputs: Vec<PathBuf> = std::env::args_os().skip(1).map(PathBuf::from).collect();
        run::run(context, &config, inputs).await
    });
    runtime.shutdown_timeout(BLOCKING_GRACE);

    let snapshot = result?;
    info!(metrics = %serde_json::to_string(&snapshot)?, "etl finished");
    Ok(())
}
