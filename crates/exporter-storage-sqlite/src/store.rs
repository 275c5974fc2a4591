//! `ChainStore` over the refined database

use crate::busy::with_busy_retry;
use crate::{accounts, blocks, fees, governance, uptime, validators, Database, Result};
use chrono::NaiveDate;
use exporter_core::{
    AccountCoin, ChainStore, DailyFee, Fee, HeightBundle, Miss, NotificationStatus, Proposal,
    RefineBundle, StoredTransaction, TransactionRef, Validator,
};

impl Database {
    /// Stored balance row of an address
    pub fn account_coin(&self, address: &str, denom: &str) -> Result<Option<AccountCoin>> {
        with_busy_retry(|| accounts::account_coin(&self.conn(), address, denom))
    }

    /// Miss ranges of a validator, by start height
    pub fn misses(&self, address: &str) -> Result<Vec<Miss>> {
        with_busy_retry(|| uptime::misses(&self.conn(), address))
    }

    /// Accumulated fee of a UTC day
    pub fn daily_fee(&self, day: &NaiveDate, denom: &str) -> Result<u128> {
        with_busy_retry(|| fees::daily_fee(&self.conn(), day, denom))
    }

    fn commit_refine(&self, bundle: &RefineBundle) -> Result<()> {
        let blocks: Vec<_> = bundle.blocks.iter().collect();
        self.with_transaction(|tx| {
            blocks::insert_chain_data(tx, &blocks, &bundle.transactions, &bundle.tmas)
        })
    }
}

impl ChainStore for Database {
    fn ensure_chain(&self, chain_id: &str) -> exporter_core::Result<()> {
        Ok(with_busy_retry(|| blocks::ensure_chain(&self.conn(), chain_id))?)
    }

    fn latest_block_height(&self, chain_id: &str) -> exporter_core::Result<i64> {
        Ok(with_busy_retry(|| {
            blocks::latest_block_height(&self.conn(), chain_id)
        })?)
    }

    fn latest_transaction(&self, chain_id: &str) -> exporter_core::Result<Option<TransactionRef>> {
        Ok(with_busy_retry(|| {
            blocks::latest_transaction(&self.conn(), chain_id)
        })?)
    }

    fn number_of_txs(&self, chain_id: &str) -> exporter_core::Result<i64> {
        Ok(with_busy_retry(|| blocks::number_of_txs(&self.conn(), chain_id))?)
    }

    fn insert_exported_data(&self, bundle: &HeightBundle) -> exporter_core::Result<()> {
        let blocks: Vec<_> = bundle.block.iter().collect();
        Ok(with_busy_retry(|| {
            self.with_transaction(|tx| {
                blocks::insert_chain_data(tx, &blocks, &bundle.transactions, &bundle.tmas)?;
                accounts::upsert_account_coins(tx, &bundle.accounts)?;
                governance::upsert_proposals(tx, &bundle.proposals)?;
                governance::insert_deposits(tx, &bundle.deposits)?;
                governance::insert_votes(tx, &bundle.votes)?;
                uptime::insert_power_events(tx, &bundle.power_events)?;
                uptime::insert_miss_details(tx, &bundle.miss_details)?;
                uptime::insert_evidence(tx, &bundle.evidence)?;
                Ok(())
            })
        })?)
    }

    fn insert_refine_data(&self, bundle: &RefineBundle) -> exporter_core::Result<()> {
        Ok(with_busy_retry(|| self.commit_refine(bundle))?)
    }

    fn insert_refine_realtime_data(&self, bundle: &RefineBundle) -> exporter_core::Result<()> {
        Ok(with_busy_retry(|| self.commit_refine(bundle))?)
    }

    fn upsert_validators(&self, validators: &[Validator]) -> exporter_core::Result<()> {
        Ok(with_busy_retry(|| {
            self.with_transaction(|tx| validators::upsert_validators(tx, validators))
        })?)
    }

    fn highest_rank_by_status(&self, status: i32) -> exporter_core::Result<i64> {
        Ok(with_busy_retry(|| {
            validators::highest_rank_by_status(&self.conn(), status)
        })?)
    }

    fn validators(&self) -> exporter_core::Result<Vec<Validator>> {
        Ok(with_busy_retry(|| validators::validators(&self.conn()))?)
    }

    fn update_keybase_urls(&self, urls: &[(String, String)]) -> exporter_core::Result<()> {
        Ok(with_busy_retry(|| {
            self.with_transaction(|tx| validators::update_keybase_urls(tx, urls))
        })?)
    }

    fn upsert_proposals(&self, proposals: &[Proposal]) -> exporter_core::Result<()> {
        Ok(with_busy_retry(|| {
            self.with_transaction(|tx| governance::upsert_proposals(tx, proposals))
        })?)
    }

    fn proposal(&self, id: u64) -> exporter_core::Result<Option<Proposal>> {
        Ok(with_busy_retry(|| governance::proposal(&self.conn(), id))?)
    }

    fn proposal_count(&self) -> exporter_core::Result<u64> {
        Ok(with_busy_retry(|| governance::proposal_count(&self.conn()))?)
    }

    fn live_proposal_ids(&self) -> exporter_core::Result<Vec<u64>> {
        Ok(with_busy_retry(|| governance::live_proposal_ids(&self.conn()))?)
    }

    fn proposal_notification(&self, id: u64) -> exporter_core::Result<NotificationStatus> {
        Ok(with_busy_retry(|| {
            governance::proposal_notification(&self.conn(), id)
        })?)
    }

    fn update_proposal_notification(
        &self,
        id: u64,
        status: NotificationStatus,
    ) -> exporter_core::Result<()> {
        Ok(with_busy_retry(|| {
            governance::update_proposal_notification(&self.conn(), id, status)
        })?)
    }

    fn index_pointer(&self, name: &str) -> exporter_core::Result<Option<i64>> {
        Ok(with_busy_retry(|| fees::index_pointer(&self.conn(), name))?)
    }

    fn init_index_pointer(&self, name: &str) -> exporter_core::Result<()> {
        Ok(with_busy_retry(|| fees::init_index_pointer(&self.conn(), name))?)
    }

    fn transactions_after(
        &self,
        after: i64,
        limit: usize,
    ) -> exporter_core::Result<Vec<StoredTransaction>> {
        Ok(with_busy_retry(|| {
            blocks::transactions_after(&self.conn(), after, limit)
        })?)
    }

    fn save_fees(
        &self,
        fees: &[Fee],
        daily: &[DailyFee],
        pointer: &str,
        to: i64,
    ) -> exporter_core::Result<()> {
        let applied = with_busy_retry(|| {
            self.with_transaction(|tx| fees::save_fees(tx, fees, daily, pointer, to))
        })?;
        if !applied {
            tracing::debug!("Fee cursor {} already at or past {}, batch skipped", pointer, to);
        }
        Ok(())
    }

    fn insert_genesis_accounts(&self, accounts: &[AccountCoin]) -> exporter_core::Result<()> {
        Ok(with_busy_retry(|| {
            self.with_transaction(|tx| accounts::upsert_account_coins(tx, accounts))
        })?)
    }
}
