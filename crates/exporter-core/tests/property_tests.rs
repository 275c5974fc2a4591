//! Property-based tests for exporter-core
//!
//! Uses proptest to check address and amount invariants over random inputs

use exporter_core::coin::{amount_of, sum_by_denom};
use exporter_core::{
    acc_from_valoper, consensus_address_from_pubkey, valconspub_from_pubkey, valoper_from_acc,
    ChainMsg, Coin,
};
use proptest::prelude::*;
use serde_json::json;

// ============================================================================
// Strategies
// ============================================================================

fn key_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 20)
}

fn coins_strategy() -> impl Strategy<Value = Vec<Coin>> {
    prop::collection::vec(
        (prop::sample::select(vec!["ucore", "uatom", "ibc/ABC"]), 0u128..1_000_000_000_000)
            .prop_map(|(denom, amount)| Coin::new(denom, amount)),
        0..12,
    )
}

// ============================================================================
// Addresses
// ============================================================================

proptest! {
    /// Operator and account forms of a key convert into each other
    #[test]
    fn prop_operator_account_roundtrip(key in key_strategy()) {
        let acc = valconspub_from_pubkey(&key, "core").unwrap();
        let valoper = valoper_from_acc(&acc, "corevaloper").unwrap();
        prop_assert!(valoper.starts_with("corevaloper1"));
        prop_assert_eq!(acc_from_valoper(&valoper, "core").unwrap(), acc);
    }

    /// Consensus addresses are 20 upper-hex bytes
    #[test]
    fn prop_consensus_address_shape(key in prop::collection::vec(any::<u8>(), 32)) {
        let address = consensus_address_from_pubkey(&key);
        prop_assert_eq!(address.len(), 40);
        prop_assert!(address.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }
}

// ============================================================================
// Amounts
// ============================================================================

proptest! {
    /// Grouping by denom keeps every denom's total
    #[test]
    fn prop_sum_by_denom_matches_amount_of(coins in coins_strategy()) {
        let sums = sum_by_denom(&coins);
        for (denom, total) in &sums {
            prop_assert_eq!(*total, amount_of(&coins, denom));
        }
        let grand: u128 = coins.iter().map(|c| c.amount).sum();
        prop_assert_eq!(sums.values().sum::<u128>(), grand);
    }
}

#[test]
fn test_exec_walk_reaches_wrapped_messages() {
    let send = |from: &str| {
        json!({
            "@type": "/cosmos.bank.v1beta1.MsgSend",
            "from_address": from,
            "to_address": "core1to",
            "amount": [{"denom": "ucore", "amount": "1"}]
        })
    };
    let msg = ChainMsg::decode(&json!({
        "@type": "/cosmos.authz.v1beta1.MsgExec",
        "grantee": "core1grantee",
        "msgs": [send("core1a"), {
            "@type": "/cosmos.authz.v1beta1.MsgExec",
            "grantee": "core1inner",
            "msgs": [send("core1b")]
        }]
    }))
    .unwrap();

    let mut signers = Vec::new();
    msg.walk(&mut |m| signers.extend(m.signers()));
    assert_eq!(
        signers,
        vec!["core1grantee", "core1a", "core1inner", "core1b"]
    );
}
