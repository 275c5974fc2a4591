//! chain-exporter: export a Cosmos chain into SQLite
//!
//! Modes:
//! - basic: refined store and raw staging from one fetch, plus background tasks
//! - raw: raw staging only
//! - refine: rebuild refined blocks and transactions from raw staging, then tail
//! - genesis: import genesis balances and exit

mod config;

use anyhow::Context;
use clap::Parser;
use config::{AppConfig, LoggingSection};
use exporter_core::{ChainStore, RawStore};
use exporter_storage_sqlite::{Database, RawDatabase};
use exporter_sync::{
    import_genesis, resolve_chain, BackgroundTasks, CancelToken, ContentStore, Disassembler,
    FeeAggregator, HttpNodeClient, IdentityResolver, IpfsGateway, KeybaseResolver, LogNotifier,
    NodeClient, Notifier, ProposalWatcher, RefineEngine, Retriever, SharedState, SlackNotifier,
    SyncEngine, SyncMode, SyncProgress, ValidatorRefresher,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[derive(Parser)]
#[command(name = "chain-exporter")]
#[command(about = "Cosmos chain exporter", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, env = "CHAIN_EXPORTER_CONFIG")]
    config: Option<PathBuf>,

    /// basic, raw, refine or genesis (overrides the config)
    #[arg(short, long)]
    mode: Option<SyncMode>,

    /// First height of a chain that did not start at 1
    #[arg(long)]
    initial_height: Option<i64>,

    /// Genesis document for genesis mode
    #[arg(long)]
    genesis_file_path: Option<PathBuf>,
}

fn init_tracing(logging: &LoggingSection) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.filter));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = AppConfig::load(cli.config.as_deref())?;
    init_tracing(&config.logging);

    let mode = match cli.mode {
        Some(mode) => mode,
        None => config.sync.mode.parse()?,
    };
    if let Some(height) = cli.initial_height {
        config.chain.initial_height = height;
    }

    let db = Arc::new(
        Database::open(&config.database.path)
            .with_context(|| format!("opening {}", config.database.path.display()))?,
    );

    if mode == SyncMode::Genesis {
        let path = cli
            .genesis_file_path
            .or_else(|| config.sync.genesis_file_path.clone())
            .context("genesis mode needs --genesis-file-path")?;
        let imported = import_genesis(&path, db.as_ref()).await?;
        info!("Genesis import finished: {} accounts", imported);
        return Ok(());
    }

    let raw = Arc::new(
        RawDatabase::open(&config.database.raw_path)
            .with_context(|| format!("opening {}", config.database.raw_path.display()))?,
    );
    let client: Arc<dyn NodeClient> = Arc::new(HttpNodeClient::new(config.node_client())?);
    let params = resolve_chain(client.as_ref(), db.as_ref(), config.chain.clone())
        .await
        .context("resolving chain id")?;
    info!("Exporting {} in {} mode", params.chain_id, mode);

    let store: Arc<dyn ChainStore> = db;
    let raw: Arc<dyn RawStore> = raw;
    let cancel = CancelToken::new();
    let state = Arc::new(SharedState::new());
    let progress = SyncProgress::new();
    let mut tasks = JoinSet::new();

    tokio::spawn(shutdown_on_signal(cancel.clone()));
    tasks.spawn(log_progress(
        progress.clone(),
        Duration::from_secs(config.sync.progress_log_interval_secs.max(1)),
        cancel.clone(),
    ));

    let result = match mode {
        SyncMode::Refine => {
            RefineEngine::new(
                store,
                raw,
                Retriever::new(client, config.retrieval()),
                Arc::new(Disassembler::default()),
                params,
                config.refine(),
                progress,
                cancel.clone(),
            )
            .run()
            .await
        }
        SyncMode::Raw => {
            SyncEngine::new(client, store, raw, state, config.sync(params))
                .with_cancel_token(cancel.clone())
                .with_progress(progress)
                .run(SyncMode::Raw)
                .await
        }
        SyncMode::Basic => {
            let watcher = Arc::new(proposal_watcher(
                &config,
                Arc::clone(&client),
                Arc::clone(&store),
                Arc::clone(&state),
                &params.chain_id,
            )?);
            let mut refresher = ValidatorRefresher::new(
                Arc::clone(&client),
                Arc::clone(&store),
                Arc::clone(&state),
                params.clone(),
            );
            if !config.client.keybase_url.is_empty() {
                let resolver: Arc<dyn IdentityResolver> = Arc::new(KeybaseResolver::new(
                    config.client.keybase_url.clone(),
                    Duration::from_secs(config.client.side_channel_timeout_secs),
                )?);
                refresher = refresher.with_identity_resolver(resolver);
            }
            let fees = FeeAggregator::new(Arc::clone(&store), config.fees());

            BackgroundTasks::new(config.background(), cancel.clone())
                .with_validators(Arc::new(refresher))
                .with_proposals(Arc::clone(&watcher))
                .with_fees(Arc::new(fees))
                .spawn(&mut tasks);

            SyncEngine::new(client, store, raw, state, config.sync(params))
                .with_cancel_token(cancel.clone())
                .with_progress(progress)
                .with_proposal_watcher(watcher)
                .run(SyncMode::Basic)
                .await
        }
        SyncMode::Genesis => Ok(()),
    };

    cancel.cancel();
    let drained = tokio::time::timeout(SHUTDOWN_GRACE, async {
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                warn!("Task ended abnormally: {}", e);
            }
        }
    })
    .await;
    if drained.is_err() {
        warn!("Background tasks still running after {:?}, aborting", SHUTDOWN_GRACE);
        tasks.abort_all();
    }

    if let Err(e) = &result {
        error!("Exporter stopped with error: {}", e);
    }
    result?;
    info!("Exporter stopped");
    Ok(())
}

fn proposal_watcher(
    config: &AppConfig,
    client: Arc<dyn NodeClient>,
    store: Arc<dyn ChainStore>,
    state: Arc<SharedState>,
    chain_id: &str,
) -> anyhow::Result<ProposalWatcher> {
    let notifier: Arc<dyn Notifier> = match &config.alarm.slack_webhook {
        Some(url) if !url.is_empty() => Arc::new(SlackNotifier::new(url.clone())?),
        _ => Arc::new(LogNotifier),
    };
    let mut watcher = ProposalWatcher::new(client, store, state, chain_id, config.governance())
        .with_notifier(notifier);
    if !config.client.ipfs_gateway.is_empty() {
        let gateway: Arc<dyn ContentStore> = Arc::new(IpfsGateway::new(
            config.client.ipfs_gateway.clone(),
            Duration::from_secs(config.client.side_channel_timeout_secs),
        )?);
        watcher = watcher.with_content_store(gateway);
    }
    Ok(watcher)
}

async fn log_progress(progress: SyncProgress, every: Duration, cancel: CancelToken) {
    while cancel.sleep(every).await {
        info!("Progress: {}", progress.summary());
    }
}

async fn shutdown_on_signal(cancel: CancelToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                warn!("SIGTERM handler unavailable: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
    info!("Shutdown requested, finishing the current height");
    cancel.cancel();
}
