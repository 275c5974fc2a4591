//! Evidence rows

use exporter_core::{BlockData, Evidence};

/// One row per evidence item of the block, keyed by the block's evidence hash
pub fn evidence_rows(block: &BlockData) -> Vec<Evidence> {
    block
        .evidence
        .iter()
        .map(|item| Evidence {
            proposer: String::new(),
            height: item.height,
            hash: block.evidence_hash.clone(),
            timestamp: block.time,
        })
        .collect()
}
