//! Store capabilities
//!
//! The sync engine talks to persistence only through these traits. Every
//! write is idempotent so that a height interrupted mid-way can be replayed.

use crate::model::{
    AccountCoin, DailyFee, Fee, HeightBundle, NotificationStatus, Proposal, RawBlock, RawBundle,
    RawTransaction, RefineBundle, StoredTransaction, TransactionRef, Validator,
};
use crate::Result;

/// Refined relational store
pub trait ChainStore: Send + Sync {
    /// Register the chain id if it is not known yet
    fn ensure_chain(&self, chain_id: &str) -> Result<()>;

    /// Highest stored block height of the chain, 0 when empty
    fn latest_block_height(&self, chain_id: &str) -> Result<i64>;

    /// Most recently stored transaction (highest height, then id)
    fn latest_transaction(&self, chain_id: &str) -> Result<Option<TransactionRef>>;

    /// Number of transactions committed for the chain
    fn number_of_txs(&self, chain_id: &str) -> Result<i64>;

    /// Commit everything derived from one height in a single transaction
    fn insert_exported_data(&self, bundle: &HeightBundle) -> Result<()>;

    /// Commit a batch of replayed blocks or transactions
    fn insert_refine_data(&self, bundle: &RefineBundle) -> Result<()>;

    /// Commit one live height in refine mode
    fn insert_refine_realtime_data(&self, bundle: &RefineBundle) -> Result<()>;

    /// Insert or replace validators by operator address
    fn upsert_validators(&self, validators: &[Validator]) -> Result<()>;

    /// Highest rank among validators with `status`, 0 when none
    fn highest_rank_by_status(&self, status: i32) -> Result<i64>;

    /// All stored validators
    fn validators(&self) -> Result<Vec<Validator>>;

    /// Set Keybase picture URLs, keyed by operator address
    fn update_keybase_urls(&self, urls: &[(String, String)]) -> Result<()>;

    /// Insert or update proposals without blanking stored text
    fn upsert_proposals(&self, proposals: &[Proposal]) -> Result<()>;

    /// Proposal by id
    fn proposal(&self, id: u64) -> Result<Option<Proposal>>;

    /// Number of stored proposals
    fn proposal_count(&self) -> Result<u64>;

    /// Ids of proposals in deposit or voting period
    fn live_proposal_ids(&self) -> Result<Vec<u64>>;

    /// Stored alert progress of a proposal
    fn proposal_notification(&self, id: u64) -> Result<NotificationStatus>;

    /// Replace the alert progress of a proposal
    fn update_proposal_notification(&self, id: u64, status: NotificationStatus) -> Result<()>;

    /// Cursor value, `None` when never initialised
    fn index_pointer(&self, name: &str) -> Result<Option<i64>>;

    /// Create the cursor at 0 if absent
    fn init_index_pointer(&self, name: &str) -> Result<()>;

    /// Transactions with `id > after`, ascending, at most `limit`
    fn transactions_after(&self, after: i64, limit: usize) -> Result<Vec<StoredTransaction>>;

    /// Write fees, accumulate daily totals and advance the cursor atomically
    fn save_fees(&self, fees: &[Fee], daily: &[DailyFee], pointer: &str, to: i64) -> Result<()>;

    /// Upsert accounts read from a genesis file
    fn insert_genesis_accounts(&self, accounts: &[AccountCoin]) -> Result<()>;
}

/// Raw staging store
pub trait RawStore: Send + Sync {
    /// Highest staged block height, 0 when empty
    fn latest_block_height(&self) -> Result<i64>;

    /// Stage a block and its transactions in one transaction
    fn insert_raw_data(&self, bundle: &RawBundle) -> Result<()>;

    /// Staged block at `height`
    fn block_by_height(&self, height: i64) -> Result<Option<RawBlock>>;

    /// Blocks with `id >= from_id` and `height <= max_height`, ascending, at most `limit`
    fn blocks_from_id(&self, from_id: i64, max_height: i64, limit: usize) -> Result<Vec<RawBlock>>;

    /// Staged transaction by hash
    fn transaction_by_hash(&self, hash: &str) -> Result<Option<RawTransaction>>;

    /// Transactions with `id >= from_id` and `height <= max_height`, ascending, at most `limit`
    fn transactions_from_id(
        &self,
        from_id: i64,
        max_height: i64,
        limit: usize,
    ) -> Result<Vec<RawTransaction>>;
}
