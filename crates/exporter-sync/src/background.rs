//! Periodic tasks running beside the sync driver
//!
//! Each task loops on its own interval until the shared token is cancelled.
//! Failures are logged and the task carries on at the next tick.

use crate::cancel::CancelToken;
use crate::fees::FeeAggregator;
use crate::proposals::ProposalWatcher;
use crate::validators::ValidatorRefresher;
use crate::Result;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Task intervals
#[derive(Debug, Clone)]
pub struct BackgroundConfig {
    /// Validator table refresh
    pub validator_interval: Duration,
    /// Keybase picture refresh
    pub identity_interval: Duration,
    /// Live proposal collection
    pub proposal_watch_interval: Duration,
    /// Live proposal refresh
    pub proposal_update_interval: Duration,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            validator_interval: Duration::from_secs(10),
            identity_interval: Duration::from_secs(20 * 60),
            proposal_watch_interval: Duration::from_secs(6),
            proposal_update_interval: Duration::from_secs(10),
        }
    }
}

/// Run `task` every `period` until `cancel` fires
pub async fn every<F, Fut, T>(name: &'static str, period: Duration, cancel: CancelToken, mut task: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    debug!("Task {} started, every {:?}", name, period);
    while !cancel.is_cancelled() {
        if let Err(e) = task().await {
            warn!("Task {} failed: {}", name, e);
        }
        if !cancel.sleep(period).await {
            break;
        }
    }
    debug!("Task {} stopped", name);
}

/// Set of periodic tasks to spawn
pub struct BackgroundTasks {
    config: BackgroundConfig,
    cancel: CancelToken,
    validators: Option<Arc<ValidatorRefresher>>,
    proposals: Option<Arc<ProposalWatcher>>,
    fees: Option<Arc<FeeAggregator>>,
}

impl BackgroundTasks {
    /// Create an empty task set
    pub fn new(config: BackgroundConfig, cancel: CancelToken) -> Self {
        Self {
            config,
            cancel,
            validators: None,
            proposals: None,
            fees: None,
        }
    }

    /// Refresh validators and their pictures
    pub fn with_validators(mut self, refresher: Arc<ValidatorRefresher>) -> Self {
        self.validators = Some(refresher);
        self
    }

    /// Import, watch and refresh proposals
    pub fn with_proposals(mut self, watcher: Arc<ProposalWatcher>) -> Self {
        self.proposals = Some(watcher);
        self
    }

    /// Aggregate fees
    pub fn with_fees(mut self, aggregator: Arc<FeeAggregator>) -> Self {
        self.fees = Some(aggregator);
        self
    }

    /// Spawn every configured task onto `tasks`
    pub fn spawn(self, tasks: &mut JoinSet<()>) {
        let config = self.config;

        if let Some(refresher) = self.validators {
            let r = Arc::clone(&refresher);
            tasks.spawn(every(
                "validators",
                config.validator_interval,
                self.cancel.clone(),
                move || {
                    let r = Arc::clone(&r);
                    async move { r.save_validators().await }
                },
            ));
            tasks.spawn(every(
                "validator-identities",
                config.identity_interval,
                self.cancel.clone(),
                move || {
                    let r = Arc::clone(&refresher);
                    async move { r.save_validator_identities().await }
                },
            ));
        }

        if let Some(watcher) = self.proposals {
            let cancel = self.cancel.clone();
            let w = Arc::clone(&watcher);
            tasks.spawn(async move {
                tokio::select! {
                    result = w.save_all_proposals() => {
                        if let Err(e) = result {
                            warn!("Proposal import failed: {}", e);
                        }
                    }
                    _ = cancel.cancelled() => {}
                }
                every("proposal-watch", config.proposal_watch_interval, cancel, move || {
                    let w = Arc::clone(&w);
                    async move { w.watch_live_proposals().await }
                })
                .await;
            });
            tasks.spawn(every(
                "proposal-update",
                config.proposal_update_interval,
                self.cancel.clone(),
                move || {
                    let w = Arc::clone(&watcher);
                    async move { w.update_proposals().await }
                },
            ));
        }

        if let Some(aggregator) = self.fees {
            let cancel = self.cancel.clone();
            tasks.spawn(async move { aggregator.run(cancel).await });
        }

        info!("Background tasks started: {}", tasks.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_every_survives_failures_and_stops_on_cancel() {
        let cancel = CancelToken::new();
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let handle = tokio::spawn(every("test", Duration::from_secs(5), cancel.clone(), move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(Error::Sync("boom".to_string()))
            }
        }));

        tokio::time::sleep(Duration::from_secs(12)).await;
        cancel.cancel();
        handle.await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
