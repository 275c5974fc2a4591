//! Sync coordinator
//!
//! One sequential driver owns height progression. Each height is fetched
//! once; basic mode derives the refined bundle and the raw snapshot from the
//! same fetch, raw mode stores only the snapshot.

use crate::cancel::CancelToken;
use crate::client::NodeClient;
use crate::disassembler::Disassembler;
use crate::progress::{SyncProgress, SyncStage};
use crate::proposals::ProposalWatcher;
use crate::retrieval::{FetchedBlock, RetrievalConfig, Retriever};
use crate::state::SharedState;
use crate::transform::{
    account_coins, block_row, evidence_rows, genesis_power_events, governance_rows,
    is_catching_up, miss_details, power_events, raw_block, raw_transactions, transaction_rows,
};
use crate::{Error, Result};
use chrono::Utc;
use exporter_core::{ChainParams, ChainStore, HeightBundle, RawBundle, RawStore};
use once_cell::sync::OnceCell;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// What the process exports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Refined store and raw staging from one fetch
    Basic,
    /// Raw staging only
    Raw,
    /// Rebuild the refined store from raw staging, then tail the chain
    Refine,
    /// One-shot genesis account import
    Genesis,
}

impl SyncMode {
    /// Get mode name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Raw => "raw",
            Self::Refine => "refine",
            Self::Genesis => "genesis",
        }
    }
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SyncMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "basic" => Ok(Self::Basic),
            "raw" => Ok(Self::Raw),
            "refine" => Ok(Self::Refine),
            "genesis" => Ok(Self::Genesis),
            other => Err(Error::Sync(format!("unknown mode: {}", other))),
        }
    }
}

/// Sync configuration
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Chain parameters
    pub params: ChainParams,
    /// Retrieval fan-out
    pub retrieval: RetrievalConfig,
    /// Pause between passes
    pub pass_delay: Duration,
    /// Block age beyond which the driver counts as catching up
    pub catching_up_threshold: Duration,
    /// Refresh balances of touched accounts
    pub export_accounts: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            params: ChainParams::default(),
            retrieval: RetrievalConfig::default(),
            pass_delay: Duration::from_secs(1),
            catching_up_threshold: Duration::from_secs(60),
            export_accounts: true,
        }
    }
}

/// Sync engine
pub struct SyncEngine {
    client: Arc<dyn NodeClient>,
    store: Arc<dyn ChainStore>,
    raw: Arc<dyn RawStore>,
    retriever: Retriever,
    disassembler: Arc<Disassembler>,
    state: Arc<SharedState>,
    progress: SyncProgress,
    cancel: CancelToken,
    config: SyncConfig,
    proposals: Option<Arc<ProposalWatcher>>,
    bond_denom: OnceCell<String>,
}

impl SyncEngine {
    /// Create a sync engine; `config.params.chain_id` must already be resolved
    pub fn new(
        client: Arc<dyn NodeClient>,
        store: Arc<dyn ChainStore>,
        raw: Arc<dyn RawStore>,
        state: Arc<SharedState>,
        config: SyncConfig,
    ) -> Self {
        let retriever = Retriever::new(Arc::clone(&client), config.retrieval.clone());
        Self {
            client,
            store,
            raw,
            retriever,
            disassembler: Arc::new(Disassembler::default()),
            state,
            progress: SyncProgress::new(),
            cancel: CancelToken::new(),
            config,
            proposals: None,
            bond_denom: OnceCell::new(),
        }
    }

    /// Use a custom disassembler (extra recognizers)
    pub fn with_disassembler(mut self, disassembler: Arc<Disassembler>) -> Self {
        self.disassembler = disassembler;
        self
    }

    /// Share a cancellation token with the caller
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Share a progress tracker with the caller
    pub fn with_progress(mut self, progress: SyncProgress) -> Self {
        self.progress = progress;
        self
    }

    /// Raise proposal alerts for governance activity of committed heights
    pub fn with_proposal_watcher(mut self, watcher: Arc<ProposalWatcher>) -> Self {
        self.proposals = Some(watcher);
        self
    }

    /// Progress tracker
    pub fn progress(&self) -> &SyncProgress {
        &self.progress
    }

    async fn bond_denom(&self) -> Result<&str> {
        if let Some(denom) = self.bond_denom.get() {
            return Ok(denom.as_str());
        }
        let denom = self.client.bond_denom().await?;
        Ok(self.bond_denom.get_or_init(|| denom).as_str())
    }

    /// Everything the refined store needs for one fetched height
    pub async fn height_bundle(&self, fetched: &FetchedBlock) -> Result<(HeightBundle, BTreeSet<u64>)> {
        let block = &fetched.block;
        let txs = &fetched.txs;
        let params = &self.config.params;

        let mut bundle = HeightBundle {
            block: Some(block_row(block, params)),
            transactions: transaction_rows(&params.chain_id, txs, block.time)?,
            tmas: self.disassembler.disassemble_txs(txs)?,
            evidence: evidence_rows(block),
            ..Default::default()
        };

        if self.config.export_accounts && !txs.is_empty() {
            let denom = self.bond_denom().await?;
            bundle.accounts =
                account_coins(self.client.as_ref(), params, denom, txs, block.time).await?;
        }

        let governance = governance_rows(txs, block.time)?;
        let alert_ids = governance.alert_ids();
        bundle.proposals = governance.proposals;
        bundle.deposits = governance.deposits;
        bundle.votes = governance.votes;
        bundle.power_events = power_events(txs, block.time, params.power_reduction)?;

        if params.is_first_height(block.height) {
            let validators = self.client.validator_set(block.height).await?;
            let denom = self.bond_denom().await?;
            bundle.power_events.extend(genesis_power_events(
                &validators,
                block.height,
                denom,
                block.time,
            ));
        }

        if block.last_commit_height != 0 {
            let previous = self.client.block(block.last_commit_height).await?;
            let validators = self.client.validator_set(block.last_commit_height).await?;
            bundle.miss_details = miss_details(block, &previous, &validators);
        }

        Ok((bundle, alert_ids))
    }

    fn raw_bundle(&self, fetched: &FetchedBlock) -> Result<RawBundle> {
        Ok(RawBundle {
            block: raw_block(&fetched.block)?,
            transactions: raw_transactions(&self.config.params.chain_id, &fetched.txs)?,
        })
    }

    async fn alert(&self, ids: &BTreeSet<u64>) {
        let Some(watcher) = &self.proposals else {
            return;
        };
        for id in ids {
            if let Err(e) = watcher.notify(*id).await {
                warn!("Proposal alert for {} failed: {}", id, e);
            }
        }
    }

    /// Height the next pass starts after, with the stored heights it was derived from
    fn begin_height(&self, mode: SyncMode, refined: i64, raw: i64) -> (i64, i64, i64) {
        let (mut refined, mut raw) = (refined, raw);
        let initial = self.config.params.initial_height;
        if initial != 0 {
            if refined == 0 {
                refined = initial - 1;
                debug!("Refined store empty, starting at initial height {}", initial);
            }
            if raw == 0 {
                raw = initial - 1;
                debug!("Raw store empty, starting at initial height {}", initial);
            }
        }
        let begin = if mode == SyncMode::Raw {
            raw
        } else {
            refined.min(raw)
        };
        (begin, refined, raw)
    }

    /// One pass from the stored heights to the node's latest height
    ///
    /// Returns the number of heights processed. Any failure aborts the pass
    /// before the failing height is committed.
    pub async fn sync_once(&self, mode: SyncMode) -> Result<usize> {
        if !matches!(mode, SyncMode::Basic | SyncMode::Raw) {
            return Err(Error::Sync(format!("{} mode has no height loop", mode)));
        }
        let chain_id = &self.config.params.chain_id;
        let refined = self.store.latest_block_height(chain_id)?;
        let raw = self.raw.latest_block_height()?;
        let latest = self.client.latest_height().await?;
        let (begin, refined, raw) = self.begin_height(mode, refined, raw);
        debug!("Refined height {}, raw height {}, node height {}", refined, raw, latest);

        if latest <= begin {
            self.progress.set_stage(SyncStage::Complete);
            return Ok(0);
        }
        self.progress.start(begin, latest, SyncStage::Syncing);

        let mut processed = 0;
        for height in begin + 1..=latest {
            if self.cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            let fetched = self.retriever.fetch_block(height).await?;
            self.state.set_catching_up(is_catching_up(
                fetched.block.time,
                Utc::now(),
                self.config.catching_up_threshold,
            ));

            if mode == SyncMode::Basic && height > refined {
                let (bundle, alert_ids) = self.height_bundle(&fetched).await?;
                self.store.insert_exported_data(&bundle)?;
                if !bundle.proposals.is_empty() {
                    let submitted = bundle.proposals.iter().map(|p| p.id);
                    self.state.live_proposals().write().await.extend(submitted);
                }
                if !self.state.is_catching_up() {
                    self.alert(&alert_ids).await;
                }
            }
            if height > raw {
                self.raw.insert_raw_data(&self.raw_bundle(&fetched)?)?;
            }

            self.progress.set_current(height);
            processed += 1;
            info!("Synced block {}/{}", height, latest);
        }
        self.progress.set_stage(SyncStage::Complete);
        Ok(processed)
    }

    /// Run passes until cancelled, pausing `pass_delay` after each
    pub async fn run(&self, mode: SyncMode) -> Result<()> {
        info!("Starting {} sync for {}", mode, self.config.params.chain_id);
        loop {
            match self.sync_once(mode).await {
                Ok(0) => {}
                Ok(n) => debug!("Pass processed {} heights", n),
                Err(Error::Cancelled) => break,
                Err(e) => error!("Sync pass failed: {}", e),
            }
            self.progress.set_stage(SyncStage::Idle);
            if !self.cancel.sleep(self.config.pass_delay).await {
                break;
            }
        }
        info!("Sync stopped at {}", self.progress.current_height());
        Ok(())
    }
}

/// Fill in the chain id from the node when it is not configured and register it
pub async fn resolve_chain(
    client: &dyn NodeClient,
    store: &dyn ChainStore,
    mut params: ChainParams,
) -> Result<ChainParams> {
    if params.chain_id.is_empty() {
        params.chain_id = client.chain_id().await?;
    }
    store.ensure_chain(&params.chain_id)?;
    Ok(params)
}
