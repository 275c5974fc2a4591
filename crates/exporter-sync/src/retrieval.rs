//! Block retrieval with a bounded transaction fan-out
//!
//! A block is usable only when every one of its transactions was fetched.
//! Lookups run concurrently under a semaphore, each with its own fixed-delay
//! retry, and are joined before anything is returned.

use crate::client::NodeClient;
use crate::retry::{retry, RetryPolicy};
use crate::{Error, Result};
use exporter_core::{BlockData, TxResponse};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Fan-out limits
#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    /// Concurrent transaction lookups
    pub tx_concurrency: usize,
    /// Attempts per transaction lookup
    pub tx_retry_attempts: u32,
    /// Delay between attempts
    pub tx_retry_delay: Duration,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            tx_concurrency: 60,
            tx_retry_attempts: 5,
            tx_retry_delay: Duration::from_secs(1),
        }
    }
}

/// A block with all of its transaction results, in block order
#[derive(Debug, Clone)]
pub struct FetchedBlock {
    /// Block
    pub block: BlockData,
    /// Transaction results
    pub txs: Vec<TxResponse>,
}

/// Fetches blocks and their transactions
#[derive(Clone)]
pub struct Retriever {
    client: Arc<dyn NodeClient>,
    semaphore: Arc<Semaphore>,
    policy: RetryPolicy,
}

impl Retriever {
    /// Create a retriever sharing one semaphore across all calls
    pub fn new(client: Arc<dyn NodeClient>, config: RetrievalConfig) -> Self {
        Self {
            client,
            semaphore: Arc::new(Semaphore::new(config.tx_concurrency.max(1))),
            policy: RetryPolicy::fixed(config.tx_retry_attempts.max(1), config.tx_retry_delay),
        }
    }

    /// Underlying node client
    pub fn client(&self) -> &Arc<dyn NodeClient> {
        &self.client
    }

    /// Fetch the block at `height` and every transaction in it
    pub async fn fetch_block(&self, height: i64) -> Result<FetchedBlock> {
        let block = self
            .client
            .block(height)
            .await
            .map_err(|e| Error::Retrieval {
                height,
                reason: e.to_string(),
            })?;
        let hashes = block.tx_hashes()?;
        let txs = self.fetch_txs(height, hashes).await?;
        debug!("Fetched block {} with {} txs", height, txs.len());
        Ok(FetchedBlock { block, txs })
    }

    async fn fetch_txs(&self, height: i64, hashes: Vec<String>) -> Result<Vec<TxResponse>> {
        let mut tasks = JoinSet::new();
        for (index, hash) in hashes.iter().cloned().enumerate() {
            let client = Arc::clone(&self.client);
            let semaphore = Arc::clone(&self.semaphore);
            let policy = self.policy.clone();
            tasks.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| Error::Sync(format!("semaphore closed: {}", e)))?;
                let tx = retry(&policy, || client.tx(&hash)).await.map_err(|e| {
                    warn!("Giving up on tx {}: {}", hash, e);
                    e
                })?;
                Ok::<_, Error>((index, tx))
            });
        }

        let mut slots: Vec<Option<TxResponse>> = vec![None; hashes.len()];
        let mut failure: Option<String> = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok((index, tx))) => slots[index] = Some(tx),
                Ok(Err(e)) => {
                    failure.get_or_insert_with(|| e.to_string());
                }
                Err(e) => {
                    failure.get_or_insert_with(|| e.to_string());
                }
            }
        }

        if let Some(reason) = failure {
            return Err(Error::Retrieval { height, reason });
        }
        slots
            .into_iter()
            .zip(hashes)
            .map(|(slot, hash)| {
                slot.ok_or_else(|| Error::Retrieval {
                    height,
                    reason: format!("tx {} missing", hash),
                })
            })
            .collect()
    }
}
