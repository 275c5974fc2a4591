//! Proposals, deposits and votes

use crate::sql::{opt_ts_from_sql, opt_ts_to_sql, ts_to_sql};
use crate::Result;
use exporter_core::{Deposit, NotificationStatus, Proposal, Vote};
use rusqlite::{params, Connection, OptionalExtension};

const LIVE_STATUSES: [&str; 2] = [
    "PROPOSAL_STATUS_DEPOSIT_PERIOD",
    "PROPOSAL_STATUS_VOTING_PERIOD",
];

/// Insert or merge proposals; an empty incoming value never replaces a stored one
pub(crate) fn upsert_proposals(conn: &Connection, proposals: &[Proposal]) -> Result<()> {
    let mut stmt = conn.prepare_cached(
        r#"
        INSERT INTO proposal (
            id, tx_hash, proposer, title, description, proposal_type, proposal_status,
            tally_yes, tally_abstain, tally_no, tally_no_with_veto,
            initial_deposit_amount, initial_deposit_denom, total_deposit_amount, total_deposit_denom,
            submit_time, deposit_end_time, voting_start_time, voting_end_time,
            metadata, metadata_chunk, gov_rest_path, chunk
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23)
        ON CONFLICT(id) DO UPDATE SET
            tx_hash = COALESCE(NULLIF(excluded.tx_hash, ''), proposal.tx_hash),
            proposer = COALESCE(NULLIF(excluded.proposer, ''), proposal.proposer),
            title = COALESCE(NULLIF(excluded.title, ''), proposal.title),
            description = COALESCE(NULLIF(excluded.description, ''), proposal.description),
            proposal_type = COALESCE(NULLIF(excluded.proposal_type, ''), proposal.proposal_type),
            proposal_status = COALESCE(NULLIF(excluded.proposal_status, ''), proposal.proposal_status),
            tally_yes = COALESCE(NULLIF(excluded.tally_yes, ''), proposal.tally_yes),
            tally_abstain = COALESCE(NULLIF(excluded.tally_abstain, ''), proposal.tally_abstain),
            tally_no = COALESCE(NULLIF(excluded.tally_no, ''), proposal.tally_no),
            tally_no_with_veto = COALESCE(NULLIF(excluded.tally_no_with_veto, ''), proposal.tally_no_with_veto),
            initial_deposit_amount = COALESCE(NULLIF(excluded.initial_deposit_amount, ''), proposal.initial_deposit_amount),
            initial_deposit_denom = COALESCE(NULLIF(excluded.initial_deposit_denom, ''), proposal.initial_deposit_denom),
            total_deposit_amount = COALESCE(NULLIF(excluded.total_deposit_amount, ''), proposal.total_deposit_amount),
            total_deposit_denom = COALESCE(NULLIF(excluded.total_deposit_denom, ''), proposal.total_deposit_denom),
            submit_time = COALESCE(excluded.submit_time, proposal.submit_time),
            deposit_end_time = COALESCE(excluded.deposit_end_time, proposal.deposit_end_time),
            voting_start_time = COALESCE(excluded.voting_start_time, proposal.voting_start_time),
            voting_end_time = COALESCE(excluded.voting_end_time, proposal.voting_end_time),
            metadata = COALESCE(NULLIF(excluded.metadata, ''), proposal.metadata),
            metadata_chunk = COALESCE(NULLIF(excluded.metadata_chunk, ''), proposal.metadata_chunk),
            gov_rest_path = COALESCE(NULLIF(excluded.gov_rest_path, ''), proposal.gov_rest_path),
            chunk = COALESCE(NULLIF(excluded.chunk, ''), proposal.chunk)
        "#,
    )?;
    for p in proposals {
        stmt.execute(params![
            p.id as i64,
            p.tx_hash,
            p.proposer,
            p.title,
            p.description,
            p.proposal_type,
            p.proposal_status,
            p.yes,
            p.abstain,
            p.no,
            p.no_with_veto,
            p.initial_deposit_amount,
            p.initial_deposit_denom,
            p.total_deposit_amount,
            p.total_deposit_denom,
            opt_ts_to_sql(&p.submit_time),
            opt_ts_to_sql(&p.deposit_end_time),
            opt_ts_to_sql(&p.voting_start_time),
            opt_ts_to_sql(&p.voting_end_time),
            p.metadata,
            p.metadata_chunk,
            p.gov_rest_path,
            p.chunk,
        ])?;
    }
    Ok(())
}

pub(crate) fn proposal(conn: &Connection, id: u64) -> Result<Option<Proposal>> {
    type Times = [Option<String>; 4];
    let row = conn
        .query_row(
            r#"
            SELECT tx_hash, proposer, title, description, proposal_type, proposal_status,
                   tally_yes, tally_abstain, tally_no, tally_no_with_veto,
                   initial_deposit_amount, initial_deposit_denom,
                   total_deposit_amount, total_deposit_denom,
                   submit_time, deposit_end_time, voting_start_time, voting_end_time,
                   metadata, metadata_chunk, gov_rest_path, chunk
            FROM proposal WHERE id = ?1
            "#,
            params![id as i64],
            |row| {
                let proposal = Proposal {
                    id,
                    tx_hash: row.get(0)?,
                    proposer: row.get(1)?,
                    title: row.get(2)?,
                    description: row.get(3)?,
                    proposal_type: row.get(4)?,
                    proposal_status: row.get(5)?,
                    yes: row.get(6)?,
                    abstain: row.get(7)?,
                    no: row.get(8)?,
                    no_with_veto: row.get(9)?,
                    initial_deposit_amount: row.get(10)?,
                    initial_deposit_denom: row.get(11)?,
                    total_deposit_amount: row.get(12)?,
                    total_deposit_denom: row.get(13)?,
                    submit_time: None,
                    deposit_end_time: None,
                    voting_start_time: None,
                    voting_end_time: None,
                    metadata: row.get(18)?,
                    metadata_chunk: row.get(19)?,
                    gov_rest_path: row.get(20)?,
                    chunk: row.get(21)?,
                };
                let times: Times = [row.get(14)?, row.get(15)?, row.get(16)?, row.get(17)?];
                Ok((proposal, times))
            },
        )
        .optional()?;

    let Some((mut proposal, [submit, deposit_end, voting_start, voting_end])) = row else {
        return Ok(None);
    };
    proposal.submit_time = opt_ts_from_sql(submit)?;
    proposal.deposit_end_time = opt_ts_from_sql(deposit_end)?;
    proposal.voting_start_time = opt_ts_from_sql(voting_start)?;
    proposal.voting_end_time = opt_ts_from_sql(voting_end)?;
    Ok(Some(proposal))
}

pub(crate) fn proposal_count(conn: &Connection) -> Result<u64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM proposal", [], |row| row.get(0))?;
    Ok(count.max(0) as u64)
}

pub(crate) fn live_proposal_ids(conn: &Connection) -> Result<Vec<u64>> {
    let mut stmt = conn.prepare_cached(
        "SELECT id FROM proposal WHERE proposal_status IN (?1, ?2) ORDER BY id ASC",
    )?;
    let rows = stmt.query_map(params![LIVE_STATUSES[0], LIVE_STATUSES[1]], |row| {
        row.get::<_, i64>(0)
    })?;
    let mut ids = Vec::new();
    for row in rows {
        ids.push(row? as u64);
    }
    Ok(ids)
}

pub(crate) fn proposal_notification(conn: &Connection, id: u64) -> Result<NotificationStatus> {
    let status: Option<i64> = conn
        .query_row(
            "SELECT notification_status FROM proposal WHERE id = ?1",
            params![id as i64],
            |row| row.get(0),
        )
        .optional()?;
    Ok(NotificationStatus(status.unwrap_or(0) as u8))
}

pub(crate) fn update_proposal_notification(
    conn: &Connection,
    id: u64,
    status: NotificationStatus,
) -> Result<()> {
    conn.execute(
        "UPDATE proposal SET notification_status = ?2 WHERE id = ?1",
        params![id as i64, status.0 as i64],
    )?;
    Ok(())
}

pub(crate) fn insert_deposits(conn: &Connection, deposits: &[Deposit]) -> Result<()> {
    let mut stmt = conn.prepare_cached(
        r#"
        INSERT OR IGNORE INTO deposit (
            height, proposal_id, depositor, amount, denom, tx_hash, gas_wanted, gas_used, timestamp
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )?;
    for d in deposits {
        stmt.execute(params![
            d.height,
            d.proposal_id as i64,
            d.depositor,
            d.amount,
            d.denom,
            d.tx_hash,
            d.gas_wanted,
            d.gas_used,
            ts_to_sql(&d.timestamp),
        ])?;
    }
    Ok(())
}

pub(crate) fn insert_votes(conn: &Connection, votes: &[Vote]) -> Result<()> {
    let mut stmt = conn.prepare_cached(
        r#"
        INSERT OR IGNORE INTO vote (
            height, proposal_id, voter, option, weight, tx_hash, gas_wanted, gas_used, timestamp
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )?;
    for v in votes {
        stmt.execute(params![
            v.height,
            v.proposal_id as i64,
            v.voter,
            v.option,
            v.weight,
            v.tx_hash,
            v.gas_wanted,
            v.gas_used,
            ts_to_sql(&v.timestamp),
        ])?;
    }
    Ok(())
}
