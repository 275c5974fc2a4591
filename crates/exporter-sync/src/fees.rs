//! Fee aggregation over committed transactions

use crate::cancel::CancelToken;
use crate::transform::fee_rows;
use crate::Result;
use exporter_core::{ChainStore, TX_FEE_POINTER};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// Fee aggregator settings
#[derive(Debug, Clone)]
pub struct FeeConfig {
    /// Transactions per pass
    pub batch_size: usize,
    /// Sleep after an empty or failed pass
    pub idle_delay: Duration,
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            idle_delay: Duration::from_secs(2),
        }
    }
}

/// Walks the transaction table behind a persisted cursor
pub struct FeeAggregator {
    store: Arc<dyn ChainStore>,
    config: FeeConfig,
}

impl FeeAggregator {
    /// Create an aggregator over `store`
    pub fn new(store: Arc<dyn ChainStore>, config: FeeConfig) -> Self {
        Self { store, config }
    }

    /// Process one batch after the cursor
    ///
    /// Returns the number of transactions consumed; 0 means nothing was pending.
    pub fn run_once(&self) -> Result<usize> {
        let pointer = match self.store.index_pointer(TX_FEE_POINTER)? {
            Some(p) => p,
            None => {
                self.store.init_index_pointer(TX_FEE_POINTER)?;
                0
            }
        };
        let txs = self.store.transactions_after(pointer, self.config.batch_size)?;
        let Some(last_id) = txs.iter().map(|t| t.id).max() else {
            return Ok(0);
        };
        let (fees, daily) = fee_rows(&txs)?;
        self.store.save_fees(&fees, &daily, TX_FEE_POINTER, last_id)?;
        debug!("Aggregated {} fees up to tx {}", fees.len(), last_id);
        Ok(txs.len())
    }

    /// Run batches until cancelled, sleeping when idle or after an error
    pub async fn run(&self, cancel: CancelToken) {
        info!("Fee aggregator started");
        while !cancel.is_cancelled() {
            let idle = match self.run_once() {
                Ok(consumed) => consumed == 0,
                Err(e) => {
                    error!("Fee aggregation failed: {}", e);
                    true
                }
            };
            if idle && !cancel.sleep(self.config.idle_delay).await {
                break;
            }
            tokio::task::yield_now().await;
        }
        info!("Fee aggregator stopped");
    }
}
