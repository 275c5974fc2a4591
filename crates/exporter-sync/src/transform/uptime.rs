//! Missed signatures

use exporter_core::{BlockData, MissDetail, ValidatorSetEntry};

/// Validators whose signature is absent from `block`'s last commit
///
/// Signatures are positional over `validators`, the set at the commit height.
/// Misses are recorded at the previous block with its proposer and time.
pub fn miss_details(
    block: &BlockData,
    previous: &BlockData,
    validators: &[ValidatorSetEntry],
) -> Vec<MissDetail> {
    block
        .signatures
        .iter()
        .zip(validators)
        .filter(|(sig, _)| !sig.signed)
        .map(|(_, validator)| MissDetail {
            address: validator.address.clone(),
            height: previous.height,
            proposer: previous.proposer_address.clone(),
            timestamp: previous.time,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn block(height: i64, signatures: serde_json::Value) -> BlockData {
        BlockData::from_rpc_result(json!({
            "block_id": {"hash": format!("H{height}")},
            "block": {
                "header": {
                    "chain_id": "test-1",
                    "height": height.to_string(),
                    "time": "2024-01-01T00:00:00Z",
                    "proposer_address": format!("PROP{height}")
                },
                "data": {"txs": []},
                "last_commit": {"height": (height - 1).to_string(), "signatures": signatures}
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_null_signature_is_a_miss_at_previous_height() {
        let current = block(
            11,
            json!([
                {"validator_address": "A", "signature": "c2ln"},
                {"validator_address": "", "signature": null}
            ]),
        );
        let previous = block(10, json!([]));
        let set = vec![
            ValidatorSetEntry { address: "A".into(), voting_power: 10 },
            ValidatorSetEntry { address: "B".into(), voting_power: 5 },
        ];
        let misses = miss_details(&current, &previous, &set);
        assert_eq!(misses.len(), 1);
        assert_eq!(misses[0].address, "B");
        assert_eq!(misses[0].height, 10);
        assert_eq!(misses[0].proposer, "PROP10");
    }

    #[test]
    fn test_first_block_records_nothing() {
        let first = block(1, json!([]));
        let set = vec![ValidatorSetEntry { address: "A".into(), voting_power: 10 }];
        assert!(miss_details(&first, &first, &set).is_empty());
    }
}
