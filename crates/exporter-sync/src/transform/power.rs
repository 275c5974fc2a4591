//! Voting power change events

use crate::Result;
use chrono::{DateTime, Utc};
use exporter_core::{ChainMsg, PowerEvent, TxResponse, ValidatorSetEntry};

/// Consensus power of `amount` base units, keeping the fractional part
///
/// Quotient and remainder are converted separately so amounts beyond 2^53
/// keep their integer power exact.
pub fn power_delta(amount: u128, power_reduction: u128) -> f64 {
    let reduction = power_reduction.max(1);
    (amount / reduction) as f64 + (amount % reduction) as f64 / reduction as f64
}

struct EventContext<'a> {
    tx: &'a TxResponse,
    msg_index: i64,
    inner_index: i64,
    timestamp: DateTime<Utc>,
    power_reduction: u128,
}

impl EventContext<'_> {
    fn event(&self, operator: &str, msg_type: &str, amount: u128, sign: f64, denom: &str) -> PowerEvent {
        PowerEvent {
            height: self.tx.height,
            tx_hash: self.tx.txhash.clone(),
            msg_index: self.msg_index,
            inner_index: self.inner_index,
            operator_address: operator.to_string(),
            proposer: String::new(),
            msg_type: msg_type.to_string(),
            voting_power_delta: sign * power_delta(amount, self.power_reduction),
            denom: denom.to_string(),
            timestamp: self.timestamp,
        }
    }

    fn collect(&self, msg: &ChainMsg, out: &mut Vec<PowerEvent>) {
        let tag = msg.tag().unwrap_or_default();
        match msg {
            ChainMsg::CreateValidator {
                validator_address,
                value,
                ..
            } => out.push(self.event(validator_address, tag, value.amount, 1.0, &value.denom)),
            ChainMsg::Delegate {
                validator_address,
                amount,
                ..
            } => out.push(self.event(validator_address, tag, amount.amount, 1.0, &amount.denom)),
            ChainMsg::Undelegate {
                validator_address,
                amount,
                ..
            } => out.push(self.event(validator_address, tag, amount.amount, -1.0, &amount.denom)),
            ChainMsg::BeginRedelegate {
                validator_src_address,
                validator_dst_address,
                amount,
                ..
            } => {
                out.push(self.event(validator_dst_address, tag, amount.amount, 1.0, &amount.denom));
                out.push(self.event(validator_src_address, tag, amount.amount, -1.0, &amount.denom));
            }
            _ => {}
        }
    }
}

/// Power events of the successful transactions of a block
///
/// Messages wrapped in `authz/exec` count under the index of the wrapper,
/// told apart by their depth-first position inside it.
pub fn power_events(
    txs: &[TxResponse],
    block_time: DateTime<Utc>,
    power_reduction: u128,
) -> Result<Vec<PowerEvent>> {
    let mut events = Vec::new();
    for tx in txs.iter().filter(|tx| tx.is_success()) {
        for (index, msg) in tx.messages()?.iter().enumerate() {
            let mut ctx = EventContext {
                tx,
                msg_index: index as i64,
                inner_index: 0,
                timestamp: tx.time().unwrap_or(block_time),
                power_reduction,
            };
            msg.walk(&mut |m| {
                ctx.collect(m, &mut events);
                ctx.inner_index += 1;
            });
        }
    }
    Ok(events)
}

/// Initial voting power of the genesis validator set
pub fn genesis_power_events(
    validators: &[ValidatorSetEntry],
    height: i64,
    bond_denom: &str,
    timestamp: DateTime<Utc>,
) -> Vec<PowerEvent> {
    validators
        .iter()
        .enumerate()
        .map(|(index, v)| PowerEvent {
            height,
            tx_hash: String::new(),
            msg_index: index as i64,
            inner_index: 0,
            operator_address: String::new(),
            proposer: v.address.clone(),
            msg_type: "staking/create_validator".to_string(),
            voting_power_delta: v.voting_power as f64,
            denom: bond_denom.to_string(),
            timestamp,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_power_delta_keeps_fraction() {
        assert_eq!(power_delta(2_500_000, 1_000_000), 2.5);
        assert_eq!(power_delta(999, 1_000_000), 0.000999);
        let huge: u128 = 123_456_789_012_345_678_901_234;
        assert_eq!(power_delta(huge, 1_000_000).trunc(), (huge / 1_000_000) as f64);
    }

    #[test]
    fn test_redelegation_is_symmetric() {
        let tx = TxResponse::from_value(json!({
            "height": "9", "txhash": "RD", "code": 0, "timestamp": "2024-01-01T00:00:00Z",
            "tx": {"body": {"messages": [{
                "@type": "/cosmos.staking.v1beta1.MsgBeginRedelegate",
                "delegator_address": "core1d",
                "validator_src_address": "corevaloper1src",
                "validator_dst_address": "corevaloper1dst",
                "amount": {"denom": "ucore", "amount": "3000000"}
            }]}}
        }))
        .unwrap();
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let events = power_events(&[tx], now, 1_000_000).unwrap();

        assert_eq!(events.len(), 2);
        let dst = events.iter().find(|e| e.operator_address == "corevaloper1dst").unwrap();
        let src = events.iter().find(|e| e.operator_address == "corevaloper1src").unwrap();
        assert_eq!(dst.voting_power_delta, 3.0);
        assert_eq!(src.voting_power_delta, -3.0);
        assert_eq!((dst.tx_hash.as_str(), dst.msg_index), (src.tx_hash.as_str(), src.msg_index));
    }

    #[test]
    fn test_wrapped_delegations_get_distinct_positions() {
        let delegate = |amount: &str| {
            json!({
                "@type": "/cosmos.staking.v1beta1.MsgDelegate",
                "delegator_address": "core1d",
                "validator_address": "corevaloper1v",
                "amount": {"denom": "ucore", "amount": amount}
            })
        };
        let tx = TxResponse::from_value(json!({
            "height": "9", "txhash": "EX", "code": 0,
            "tx": {"body": {"messages": [{
                "@type": "/cosmos.authz.v1beta1.MsgExec",
                "grantee": "core1g",
                "msgs": [delegate("1000000"), delegate("2000000")]
            }]}}
        }))
        .unwrap();
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let events = power_events(&[tx], now, 1_000_000).unwrap();

        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.msg_index == 0));
        assert_eq!(
            events.iter().map(|e| e.inner_index).collect::<Vec<_>>(),
            vec![1, 2]
        );
        assert_eq!(events.iter().map(|e| e.voting_power_delta).sum::<f64>(), 3.0);
    }

    #[test]
    fn test_failed_tx_has_no_events() {
        let tx = TxResponse::from_value(json!({
            "height": "9", "txhash": "F", "code": 5,
            "tx": {"body": {"messages": [{
                "@type": "/cosmos.staking.v1beta1.MsgDelegate",
                "delegator_address": "core1d",
                "validator_address": "corevaloper1v",
                "amount": {"denom": "ucore", "amount": "1"}
            }]}}
        }))
        .unwrap();
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert!(power_events(&[tx], now, 1_000_000).unwrap().is_empty());
    }
}
