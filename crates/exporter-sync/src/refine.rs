//! Refine mode: rebuild refined blocks and transactions from staged raw data,
//! then follow the chain head storing only blocks, transactions and links.

use crate::cancel::CancelToken;
use crate::disassembler::Disassembler;
use crate::progress::{SyncProgress, SyncStage};
use crate::retrieval::Retriever;
use crate::transform::{block_from_raw, block_row, transaction_rows, tx_from_raw};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use exporter_core::{ChainParams, ChainStore, RawStore, RefineBundle, TxResponse};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Refine settings
#[derive(Debug, Clone)]
pub struct RefineConfig {
    /// Staged rows per replay batch
    pub batch_size: usize,
    /// Pause between tail passes
    pub tail_delay: Duration,
    /// Pause before retrying a height whose retrieval failed
    pub retry_delay: Duration,
}

impl Default for RefineConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            tail_delay: Duration::from_secs(2),
            retry_delay: Duration::from_secs(1),
        }
    }
}

/// Replays staged data into the refined store
pub struct RefineEngine {
    store: Arc<dyn ChainStore>,
    raw: Arc<dyn RawStore>,
    retriever: Retriever,
    disassembler: Arc<Disassembler>,
    params: ChainParams,
    config: RefineConfig,
    progress: SyncProgress,
    cancel: CancelToken,
}

impl RefineEngine {
    /// Create an engine
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn ChainStore>,
        raw: Arc<dyn RawStore>,
        retriever: Retriever,
        disassembler: Arc<Disassembler>,
        params: ChainParams,
        config: RefineConfig,
        progress: SyncProgress,
        cancel: CancelToken,
    ) -> Self {
        Self {
            store,
            raw,
            retriever,
            disassembler,
            params,
            config,
            progress,
            cancel,
        }
    }

    /// Replay staged blocks after the refined height
    ///
    /// Returns the number of blocks committed.
    pub fn replay_blocks(&self) -> Result<usize> {
        let raw_height = self.raw.latest_block_height()?;
        let refined_height = self.store.latest_block_height(&self.params.chain_id)?;
        if raw_height <= refined_height {
            return Ok(0);
        }

        let mut next_id = match self.raw.block_by_height(refined_height)? {
            Some(block) => block.id + 1,
            None => 1,
        };
        info!(
            "Refining blocks from raw id {} up to height {}",
            next_id, raw_height
        );

        let mut committed = 0;
        loop {
            if self.cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            let batch = self
                .raw
                .blocks_from_id(next_id, raw_height, self.config.batch_size)?;
            let Some(last) = batch.last() else { break };
            next_id = last.id + 1;

            let blocks = batch
                .iter()
                .map(|raw| block_from_raw(raw, &self.params))
                .collect::<Result<Vec<_>>>()?;
            self.store.insert_refine_data(&RefineBundle {
                blocks,
                ..Default::default()
            })?;
            committed += batch.len();
            debug!("Refined blocks through raw id {}", last.id);
        }
        Ok(committed)
    }

    fn block_time(
        &self,
        height: i64,
        cache: &mut HashMap<i64, Option<DateTime<Utc>>>,
    ) -> Result<Option<DateTime<Utc>>> {
        if let Some(time) = cache.get(&height) {
            return Ok(*time);
        }
        let time = match self.raw.block_by_height(height)? {
            Some(raw) => Some(block_from_raw(&raw, &self.params)?.timestamp),
            None => None,
        };
        cache.insert(height, time);
        Ok(time)
    }

    /// Replay staged transactions after the latest refined one
    ///
    /// Returns the number of transactions committed.
    pub fn replay_transactions(&self) -> Result<usize> {
        let raw_height = self.raw.latest_block_height()?;
        let latest = self.store.latest_transaction(&self.params.chain_id)?;
        let latest_height = latest.as_ref().map(|t| t.height).unwrap_or(0);
        if raw_height <= latest_height {
            return Ok(0);
        }

        let mut next_id = match &latest {
            Some(tx) => self
                .raw
                .transaction_by_hash(&tx.hash)?
                .map(|raw| raw.id + 1)
                .unwrap_or(1),
            None => 1,
        };
        info!(
            "Refining transactions from raw id {} up to height {}",
            next_id, raw_height
        );

        let mut times = HashMap::new();
        let mut committed = 0;
        loop {
            if self.cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            let batch = self
                .raw
                .transactions_from_id(next_id, raw_height, self.config.batch_size)?;
            let Some(last) = batch.last() else { break };
            next_id = last.id + 1;

            let mut bundle = RefineBundle::default();
            for raw in &batch {
                let tx = tx_from_raw(raw)?;
                let fallback = self.block_time(raw.height, &mut times)?.unwrap_or_default();
                let txs = std::slice::from_ref(&tx);
                bundle
                    .transactions
                    .extend(transaction_rows(&raw.chain_id, txs, fallback)?);
                bundle.tmas.extend(self.disassembler.disassemble_txs(txs)?);
            }
            self.store.insert_refine_data(&bundle)?;
            committed += batch.len();
            debug!("Refined transactions through raw id {}", last.id);
        }
        Ok(committed)
    }

    fn realtime_bundle(&self, block: &exporter_core::BlockData, txs: &[TxResponse]) -> Result<RefineBundle> {
        Ok(RefineBundle {
            blocks: vec![block_row(block, &self.params)],
            transactions: transaction_rows(&block.chain_id, txs, block.time)?,
            tmas: self.disassembler.disassemble_txs(txs)?,
        })
    }

    /// Follow the node from the refined height, storing blocks, transactions and links
    ///
    /// A height whose retrieval fails is retried after `retry_delay`.
    pub async fn refine_sync(&self) -> Result<usize> {
        let mut refined = self.store.latest_block_height(&self.params.chain_id)?;
        let latest = self.retriever.client().latest_height().await?;
        if refined == 0 && self.params.initial_height != 0 {
            refined = self.params.initial_height - 1;
        }
        if latest <= refined {
            return Ok(0);
        }

        self.progress.start(refined, latest, SyncStage::Refining);
        let mut height = refined + 1;
        let mut committed = 0;
        while height <= latest {
            if self.cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            let fetched = match self.retriever.fetch_block(height).await {
                Ok(fetched) => fetched,
                Err(e @ Error::Retrieval { .. }) => {
                    warn!("{}, retrying", e);
                    if !self.cancel.sleep(self.config.retry_delay).await {
                        return Err(Error::Cancelled);
                    }
                    continue;
                }
                Err(e) => return Err(e),
            };
            let bundle = self.realtime_bundle(&fetched.block, &fetched.txs)?;
            self.store.insert_refine_realtime_data(&bundle)?;
            self.progress.set_current(height);
            committed += 1;
            debug!("Refined block {}/{}", height, latest);
            height += 1;
        }
        Ok(committed)
    }

    /// Replay staged data, then tail the chain until cancelled
    pub async fn run(&self) -> Result<()> {
        self.progress.set_stage(SyncStage::Refining);
        let blocks = self.replay_blocks()?;
        let txs = self.replay_transactions()?;
        info!("Replayed {} blocks and {} transactions", blocks, txs);

        while !self.cancel.is_cancelled() {
            match self.refine_sync().await {
                Ok(_) | Err(Error::Cancelled) => {}
                Err(e) => error!("Refine pass failed: {}", e),
            }
            self.progress.set_stage(SyncStage::Idle);
            if !self.cancel.sleep(self.config.tail_delay).await {
                break;
            }
        }
        info!("Refine stopped");
        Ok(())
    }
}
