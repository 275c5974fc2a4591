//! Proposal refresh and alerts
//!
//! The sync driver only sees governance messages; statuses, tallies and
//! deadlines move without transactions. Live proposals are collected into a
//! worklist and refreshed from the node until the refresh succeeds.

use crate::client::NodeClient;
use crate::content::ContentStore;
use crate::notifier::Notifier;
use crate::retry::{retry, RetryPolicy};
use crate::state::SharedState;
use crate::transform::proposal_from_node;
use crate::Result;
use exporter_core::{ChainStore, GovVersion, NotificationStatus, Proposal};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Deposit period status name
pub const STATUS_DEPOSIT_PERIOD: &str = "PROPOSAL_STATUS_DEPOSIT_PERIOD";
/// Voting period status name
pub const STATUS_VOTING_PERIOD: &str = "PROPOSAL_STATUS_VOTING_PERIOD";
/// Passed status name
pub const STATUS_PASSED: &str = "PROPOSAL_STATUS_PASSED";
/// Rejected status name
pub const STATUS_REJECTED: &str = "PROPOSAL_STATUS_REJECTED";

/// Governance task settings
#[derive(Debug, Clone)]
pub struct GovernanceConfig {
    /// REST API version proposals are read from
    pub version: GovVersion,
    /// Explorer base URL used in alert links
    pub web_uri: String,
    /// Delay between attempts of the startup import
    pub import_retry_delay: Duration,
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            version: GovVersion::V1,
            web_uri: String::new(),
            import_retry_delay: Duration::from_secs(1),
        }
    }
}

/// Proposal importer, refresher and notifier
pub struct ProposalWatcher {
    client: Arc<dyn NodeClient>,
    store: Arc<dyn ChainStore>,
    state: Arc<SharedState>,
    content: Option<Arc<dyn ContentStore>>,
    notifier: Option<Arc<dyn Notifier>>,
    chain_id: String,
    config: GovernanceConfig,
}

impl ProposalWatcher {
    /// Create a watcher without metadata fetching or alerts
    pub fn new(
        client: Arc<dyn NodeClient>,
        store: Arc<dyn ChainStore>,
        state: Arc<SharedState>,
        chain_id: impl Into<String>,
        config: GovernanceConfig,
    ) -> Self {
        Self {
            client,
            store,
            state,
            content: None,
            notifier: None,
            chain_id: chain_id.into(),
            config,
        }
    }

    /// Resolve metadata pointers through `content`
    pub fn with_content_store(mut self, content: Arc<dyn ContentStore>) -> Self {
        self.content = Some(content);
        self
    }

    /// Send alerts through `notifier`
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    async fn fetch(&self, id: u64) -> Result<Proposal> {
        let data = self.client.proposal(self.config.version, id).await?;
        let tally = self.client.tally(self.config.version, id).await?;
        Ok(proposal_from_node(data, tally, self.content.as_deref()).await)
    }

    /// Import every proposal the node knows, unless the stored count already matches
    pub async fn save_all_proposals(&self) -> Result<usize> {
        let policy = RetryPolicy::unbounded(self.config.import_retry_delay);
        let version = self.config.version;
        let client = Arc::clone(&self.client);
        let proposals = retry(&policy, || client.proposals(version)).await?;

        let stored = self.store.proposal_count()?;
        if proposals.len() as u64 == stored {
            info!(
                "Skipping proposal import, all {} proposals already stored",
                stored
            );
            return Ok(0);
        }

        let mut rows = Vec::with_capacity(proposals.len());
        for data in proposals {
            let id = data.id;
            let tally = retry(&policy, || client.tally(version, id)).await?;
            rows.push(proposal_from_node(data, tally, self.content.as_deref()).await);
        }
        self.store.upsert_proposals(&rows)?;
        info!("Imported {} proposals", rows.len());
        Ok(rows.len())
    }

    /// Add stored proposals in deposit or voting period to the worklist
    pub async fn watch_live_proposals(&self) -> Result<usize> {
        let ids = self.store.live_proposal_ids()?;
        let mut worklist = self.state.live_proposals().write().await;
        worklist.extend(ids);
        debug!("Proposal worklist: {:?}", *worklist);
        Ok(worklist.len())
    }

    /// Refresh every proposal on the worklist, keeping the ones that failed
    ///
    /// Skipped while the driver is catching up. Returns the number refreshed.
    pub async fn update_proposals(&self) -> Result<usize> {
        if self.state.is_catching_up() {
            info!("Pending proposal update, catching up");
            return Ok(0);
        }
        let mut worklist = self.state.live_proposals().write().await;
        let mut updated = 0;
        for id in worklist.clone() {
            let refreshed = match self.fetch(id).await {
                Ok(proposal) => self.store.upsert_proposals(&[proposal]).map_err(Into::into),
                Err(e) => Err(e),
            };
            match refreshed {
                Ok(()) => {
                    worklist.remove(&id);
                    updated += 1;
                }
                Err(e) => warn!("Failed to update proposal {}: {}", id, e),
            }
        }
        if updated > 0 {
            info!("Updated {} proposals, {} remaining", updated, worklist.len());
        }
        Ok(updated)
    }

    fn submission_message(&self, proposal: &Proposal) -> String {
        format!(
            "[{}] A new proposal has been submitted.\n\
             Number : {}\n\
             Title : {}\n\
             Submit Time : {}\n\
             Deposit End Time : {}\n\
             [{}/proposals/{}]\n",
            self.chain_id,
            proposal.id,
            proposal.title,
            display_time(proposal.submit_time),
            display_time(proposal.deposit_end_time),
            self.config.web_uri,
            proposal.id
        )
    }

    fn voting_message(&self, proposal: &Proposal) -> String {
        format!(
            "[{}] Voting is in progress.\n\
             Number : {}\n\
             Proposal Title : {}\n\
             Voting End Time : {}\n\
             [{}/proposals/{}]\n",
            self.chain_id,
            proposal.id,
            proposal.title,
            display_time(proposal.voting_end_time),
            self.config.web_uri,
            proposal.id
        )
    }

    async fn send(&self, message: &str) {
        if let Some(notifier) = &self.notifier {
            if let Err(e) = notifier.notify(message).await {
                error!("Failed to send proposal alert: {}", e);
            }
        }
    }

    /// Advance the alert state of proposal `id` from the node's current view
    ///
    /// Finished proposals are marked without an alert. A proposal entering
    /// the voting period is announced once, as is a newly submitted one.
    pub async fn notify(&self, id: u64) -> Result<()> {
        if self.state.is_catching_up() {
            return Ok(());
        }
        let proposal = self.fetch(id).await?;
        let mut status = self.store.proposal_notification(id)?;
        let voting_done = status.contains(NotificationStatus::VOTING_NOTIFIED);

        match proposal.proposal_status.as_str() {
            STATUS_PASSED | STATUS_REJECTED if !voting_done => {
                status.insert(NotificationStatus::VOTING_NOTIFIED);
            }
            STATUS_VOTING_PERIOD if !voting_done => {
                self.send(&self.voting_message(&proposal)).await;
                status.insert(NotificationStatus::VOTING_NOTIFIED);
            }
            STATUS_DEPOSIT_PERIOD if !status.contains(NotificationStatus::SUBMIT_NOTIFIED) => {
                self.send(&self.submission_message(&proposal)).await;
                status.insert(NotificationStatus::SUBMIT_NOTIFIED);
            }
            _ => return Ok(()),
        }
        self.store.update_proposal_notification(id, status)?;
        Ok(())
    }
}

fn display_time(time: Option<chrono::DateTime<chrono::Utc>>) -> String {
    time.map(|t| t.to_rfc3339()).unwrap_or_default()
}
