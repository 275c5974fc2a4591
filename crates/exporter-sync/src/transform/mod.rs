//! Node data to store rows
//!
//! Everything here is a pure function of fetched data except the account and
//! proposal builders, which query the node for current balances and tallies.

pub mod account;
pub mod block;
pub mod evidence;
pub mod fee;
pub mod genesis;
pub mod governance;
pub mod power;
pub mod transaction;
pub mod uptime;

pub use account::{account_coin, account_coins, account_participants};
pub use block::{block_from_raw, block_row, is_catching_up, raw_block};
pub use evidence::evidence_rows;
pub use fee::{fee_coins, fee_rows};
pub use genesis::genesis_accounts;
pub use governance::{governance_rows, proposal_from_node, GovernanceRows, ProposalMetadata};
pub use power::{genesis_power_events, power_delta, power_events};
pub use transaction::{raw_transactions, transaction_rows, tx_from_raw};
pub use uptime::miss_details;
