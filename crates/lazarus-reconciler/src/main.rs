//! Lazarus Node binary
//!
//! One reconciliation run per invocation: observe the registry, decide,
//! recover if this node is the elected leader. Exit 0 for any decided
//! outcome, exit 1 when the inputs cannot be trusted.

use lazarus_reconciler::{
    Credentials, MysqlAdmin, Reconciler, ReconcilerConfig, Result, SysvService,
};
use lazarus_registry::RegistryClient;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lazarus_reconciler=info,lazarus_registry=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run().await {
        tracing::error!("reconciliation aborted: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let config = ReconcilerConfig::from_env();
    tracing::info!(node = %config.local_node, registry = %config.registry.base_url, "starting reconciliation");

    let credentials = Credentials::load(&config.credentials_path)?;
    let source = RegistryClient::new(config.registry.clone())?;
    let db = MysqlAdmin::new(&config.mysql_host, &credentials);
    let control = SysvService::new(&config);

    let outcome = Reconciler::new(config, source, db, control).run().await?;
    tracing::info!(%outcome, "reconciliation finished");
    Ok(())
}
