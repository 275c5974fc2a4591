//! Account balance refresh for addresses touched by a block

use crate::client::NodeClient;
use crate::Result;
use chrono::{DateTime, Utc};
use exporter_core::coin::{amount_of, truncated_amount_of};
use exporter_core::{
    acc_from_valoper, valoper_from_acc, AccountCoin, AccountKind, ChainMsg, ChainParams,
    TxResponse,
};
use std::collections::BTreeMap;
use tracing::debug;

/// Address touched by a balance-moving message, with the last transaction that touched it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    /// Account address
    pub address: String,
    /// Hash of the last touching transaction
    pub last_tx: String,
    /// Its time
    pub last_tx_time: Option<DateTime<Utc>>,
}

fn msg_participants(msg: &ChainMsg, account_prefix: &str) -> Result<Vec<String>> {
    let acc = |valoper: &str| acc_from_valoper(valoper, account_prefix);
    Ok(match msg {
        ChainMsg::Send {
            from_address,
            to_address,
            ..
        } => vec![from_address.clone(), to_address.clone()],
        ChainMsg::MultiSend { inputs, outputs } => {
            inputs.iter().chain(outputs.iter()).cloned().collect()
        }
        ChainMsg::Delegate {
            delegator_address,
            validator_address,
            ..
        }
        | ChainMsg::Undelegate {
            delegator_address,
            validator_address,
            ..
        } => vec![delegator_address.clone(), acc(validator_address)?],
        ChainMsg::BeginRedelegate {
            delegator_address,
            validator_src_address,
            validator_dst_address,
            ..
        } => vec![
            delegator_address.clone(),
            acc(validator_src_address)?,
            acc(validator_dst_address)?,
        ],
        _ => Vec::new(),
    })
}

/// Deduplicated participants of the successful transactions of a block
pub fn account_participants(txs: &[TxResponse], params: &ChainParams) -> Result<Vec<Participant>> {
    let mut seen: BTreeMap<String, Participant> = BTreeMap::new();
    for tx in txs.iter().filter(|tx| tx.is_success()) {
        let msgs = tx.messages()?;
        let mut flat = Vec::new();
        for msg in &msgs {
            msg.walk(&mut |m| flat.push(m));
        }
        for msg in flat {
            for address in msg_participants(msg, &params.account_prefix)? {
                if address.is_empty() {
                    continue;
                }
                seen.insert(
                    address.clone(),
                    Participant {
                        address,
                        last_tx: tx.txhash.clone(),
                        last_tx_time: tx.time(),
                    },
                );
            }
        }
    }
    Ok(seen.into_values().collect())
}

/// Current balance breakdown of one address in the bond denom
///
/// Vesting amounts are evaluated at `now` (the processed block time).
pub async fn account_coin(
    client: &dyn NodeClient,
    params: &ChainParams,
    bond_denom: &str,
    participant: &Participant,
    now: DateTime<Utc>,
) -> Result<AccountCoin> {
    let address = participant.address.as_str();
    let account = client.account(address).await?;
    let vesting = match &account.kind {
        AccountKind::Base | AccountKind::Module => None,
        AccountKind::ContinuousVesting(_)
        | AccountKind::DelayedVesting(_)
        | AccountKind::PeriodicVesting(_) => account.kind.vesting_amounts(bond_denom, now.timestamp()),
        AccountKind::Other(type_url) => {
            return Err(exporter_core::Error::UnknownAccountKind(type_url.clone()).into())
        }
    };

    let available = client.balance(address, bond_denom).await?;
    let delegated = amount_of(&client.delegations(address).await?, bond_denom);
    let undelegated = client
        .unbonding_delegations(address)
        .await?
        .iter()
        .flat_map(|u| u.balances.iter())
        .fold(0u128, |acc, b| acc.saturating_add(*b));
    let rewards = truncated_amount_of(&client.total_rewards(address).await?, bond_denom)?;
    let valoper = valoper_from_acc(address, &params.prefixes().validator)?;
    let commission =
        truncated_amount_of(&client.validator_commission(&valoper).await?, bond_denom)?;

    let (vesting_amount, vested) = vesting.map(|v| (v.vesting, v.vested)).unwrap_or((0, 0));
    let total = [available, delegated, undelegated, rewards, commission, vesting_amount]
        .into_iter()
        .fold(0u128, u128::saturating_add);

    debug!("Refreshed {} total {}{}", address, total, bond_denom);
    Ok(AccountCoin {
        address: address.to_string(),
        denom: bond_denom.to_string(),
        total,
        available,
        delegated,
        undelegated,
        rewards,
        commission,
        vesting: vesting_amount,
        vested,
        last_tx: participant.last_tx.clone(),
        last_tx_time: participant.last_tx_time,
    })
}

/// Refreshed balances of every address touched by the block
pub async fn account_coins(
    client: &dyn NodeClient,
    params: &ChainParams,
    bond_denom: &str,
    txs: &[TxResponse],
    block_time: DateTime<Utc>,
) -> Result<Vec<AccountCoin>> {
    let mut rows = Vec::new();
    for participant in account_participants(txs, params)? {
        rows.push(account_coin(client, params, bond_denom, &participant, block_time).await?);
    }
    Ok(rows)
}
