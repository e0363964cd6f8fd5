//! trafegod: the Trafego reconciliation daemon.
//!
//! Boots the engine from a JSON configuration file, wires the SQLite
//! store, the provider adapters, and the hostname sources together, and
//! runs the scheduler until SIGINT/SIGTERM.
//!
//! Exit codes: `0` clean shutdown, `2` configuration error, `3`
//! database unavailable, `4` authentication failed for every configured
//! provider.

mod config;
mod sources;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use tokio::sync::watch;

use trafego_core::services::{EngineContext, HostnameAggregator, Reconciler, Scheduler};
use trafego_core::traits::{AdapterRegistry, InMemoryAdapterRegistry};
use trafego_provider::{create_adapter, AdapterCredentials, AdapterError};
use trafego_store::SqliteStore;

use config::DaemonConfig;

const EXIT_CONFIG_ERROR: u8 = 2;
const EXIT_DATABASE_UNAVAILABLE: u8 = 3;
const EXIT_ALL_PROVIDERS_UNAUTHORIZED: u8 = 4;

fn config_path() -> PathBuf {
    std::env::args()
        .nth(1)
        .or_else(|| std::env::var("TRAFEGO_CONFIG").ok())
        .map_or_else(|| PathBuf::from("trafego.json"), PathBuf::from)
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let path = config_path();
    let config = match DaemonConfig::load(&path) {
        Ok(config) => config,
        Err(e) => {
            log::error!("configuration error: {e}");
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };
    if let Err(e) = config.validate() {
        log::error!("configuration error: {e}");
        return ExitCode::from(EXIT_CONFIG_ERROR);
    }

    let store = match SqliteStore::new(&config.database_path).await {
        Ok(store) => Arc::new(store),
        Err(e) => {
            log::error!("database unavailable: {e}");
            return ExitCode::from(EXIT_DATABASE_UNAVAILABLE);
        }
    };

    let registry = Arc::new(InMemoryAdapterRegistry::new());
    match register_providers(&config, registry.as_ref()).await {
        Ok(()) => {}
        Err(code) => return code,
    }

    let ctx = Arc::new(EngineContext::new(
        registry.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        config.engine.clone(),
    ));
    let reconciler = Arc::new(Reconciler::new(ctx.clone()));

    let hostname_sources = config.sources.iter().map(sources::build_source).collect();
    let aggregator = Arc::new(HostnameAggregator::new(
        hostname_sources,
        ctx.overrides.clone(),
        config.default_provider(),
    ));

    let scheduler = Scheduler::new(ctx, reconciler, aggregator);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        log::info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    log::info!("trafegod starting (config: {})", path.display());
    scheduler.run(shutdown_rx).await;
    log::info!("trafegod stopped");
    ExitCode::SUCCESS
}

/// Build and probe every enabled provider.
///
/// Providers failing `init()` with a transient error stay registered -
/// the scheduler retries them every cycle. Providers rejected with
/// `Unauthorized` are dropped until a restart with fresh credentials;
/// when that happens to all of them, the process gives up.
async fn register_providers(
    config: &DaemonConfig,
    registry: &dyn AdapterRegistry,
) -> Result<(), ExitCode> {
    let enabled: Vec<_> = config.providers.iter().filter(|p| p.enabled).collect();
    let mut unauthorized = 0usize;

    for descriptor in &enabled {
        let credentials = match AdapterCredentials::from_map(descriptor.kind, &descriptor.credentials)
        {
            Ok(credentials) => credentials,
            Err(e) => {
                log::error!("provider '{}': {e}", descriptor.id);
                return Err(ExitCode::from(EXIT_CONFIG_ERROR));
            }
        };

        let adapter =
            match create_adapter(descriptor.id.clone(), credentials, descriptor.settings.clone()) {
                Ok(adapter) => adapter,
                Err(e) => {
                    log::error!("provider '{}': {e}", descriptor.id);
                    return Err(ExitCode::from(EXIT_CONFIG_ERROR));
                }
            };

        match adapter.init().await {
            Ok(()) => {
                log::info!(
                    "provider '{}' ({}) ready for zone '{}'",
                    descriptor.id,
                    descriptor.kind,
                    descriptor.settings.zone
                );
                registry.register(descriptor.id.clone(), adapter).await;
            }
            Err(AdapterError::Unauthorized { .. }) => {
                log::error!(
                    "provider '{}': credentials rejected; disabled until restart",
                    descriptor.id
                );
                unauthorized += 1;
            }
            Err(e) if e.is_transient() => {
                log::warn!(
                    "provider '{}': unreachable at startup ({e}); will retry",
                    descriptor.id
                );
                registry.register(descriptor.id.clone(), adapter).await;
            }
            Err(e) => {
                log::error!("provider '{}': {e}", descriptor.id);
                return Err(ExitCode::from(EXIT_CONFIG_ERROR));
            }
        }
    }

    if !enabled.is_empty() && unauthorized == enabled.len() {
        log::error!("authentication failed for every configured provider");
        return Err(ExitCode::from(EXIT_ALL_PROVIDERS_UNAUTHORIZED));
    }

    Ok(())
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(e) => {
                log::error!("cannot install SIGTERM handler: {e}");
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
