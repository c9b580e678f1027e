use std::sync::Arc;

use anyhow::Context;
use tokio::io::BufReader;
use tracing::info;

use warden_bot::{ModuleCatalog, Services, TenantRouter, serve};
use warden_infra::{FilePolicyStore, InMemoryPlatform, WardenConfig};

/// Development harness: one JSON event per stdin line, replies go to the log.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = WardenConfig::from_env().context("invalid configuration")?;
    warden_observability::init(config.log_format);

    let platform = Arc::new(InMemoryPlatform::new());
    let store = Arc::new(FilePolicyStore::new(config.data_dir.clone()));
    info!(
        data_dir = %config.data_dir.display(),
        prefix = %config.command_prefix,
        max_tenants = config.max_tenants,
        "warden starting"
    );

    let services = Arc::new(Services::new(
        platform.clone(),
        store,
        ModuleCatalog::standard(),
        config,
    ));
    let router = Arc::new(TenantRouter::new(services));

    serve(router.clone(), platform, BufReader::new(tokio::io::stdin()))
        .await
        .context("failed to read stdin")?;

    info!(cached_tenants = router.len(), "warden stopped");
    Ok(())
}
