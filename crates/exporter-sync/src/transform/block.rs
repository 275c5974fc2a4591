//! Block rows

use crate::Result;
use chrono::{DateTime, Utc};
use exporter_core::{Block, BlockData, ChainParams, RawBlock, GENESIS_PARENT_HASH};
use std::time::Duration;

/// Refined block row
pub fn block_row(block: &BlockData, params: &ChainParams) -> Block {
    let parent_hash = if params.is_first_height(block.height) {
        GENESIS_PARENT_HASH.to_string()
    } else {
        block.last_block_hash.clone()
    };
    Block {
        chain_id: block.chain_id.clone(),
        height: block.height,
        hash: block.hash.clone(),
        parent_hash,
        proposer: block.proposer_address.clone(),
        num_signatures: block.num_signatures(),
        num_txs: block.num_txs(),
        timestamp: block.time,
    }
}

/// Staged form of a block
pub fn raw_block(block: &BlockData) -> Result<RawBlock> {
    Ok(RawBlock {
        id: 0,
        chain_id: block.chain_id.clone(),
        height: block.height,
        block_hash: block.hash.clone(),
        num_txs: block.num_txs(),
        chunk: serde_json::to_string(&block.raw)?,
    })
}

/// Rebuild a block row from its staged form
pub fn block_from_raw(raw: &RawBlock, params: &ChainParams) -> Result<Block> {
    let data = BlockData::from_rpc_result(serde_json::from_str(&raw.chunk)?)?;
    Ok(block_row(&data, params))
}

/// Whether a block produced at `block_time` is further behind `now` than `threshold`
pub fn is_catching_up(block_time: DateTime<Utc>, now: DateTime<Utc>, threshold: Duration) -> bool {
    match (now - block_time).to_std() {
        Ok(lag) => lag > threshold,
        Err(_) => false,
    }
}
