//! Cosmos chain exporter sync engine
//!
//! Pulls blocks and transactions from a node, turns them into refined rows
//! and raw snapshots, and keeps validators, proposals and fee totals current
//! through periodic background tasks.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::result_large_err)]

pub mod background;
pub mod cancel;
pub mod client;
pub mod content;
pub mod disassembler;
pub mod error;
pub mod fees;
pub mod genesis;
pub mod notifier;
pub mod progress;
pub mod proposals;
pub mod refine;
pub mod retrieval;
pub mod retry;
pub mod state;
pub mod sync;
pub mod transform;
pub mod validators;

pub use background::{BackgroundConfig, BackgroundTasks};
pub use cancel::CancelToken;
pub use client::{HttpNodeClient, NodeClient, NodeClientConfig};
pub use content::{ContentStore, IdentityResolver, IpfsGateway, KeybaseResolver};
pub use disassembler::{Disassembler, MsgRecognizer, Recognized};
pub use error::{Error, Result};
pub use fees::{FeeAggregator, FeeConfig};
pub use genesis::import_genesis;
pub use notifier::{LogNotifier, Notifier, SlackNotifier};
pub use progress::{SyncProgress, SyncStage};
pub use proposals::{GovernanceConfig, ProposalWatcher};
pub use refine::{RefineConfig, RefineEngine};
pub use retrieval::{FetchedBlock, RetrievalConfig, Retriever};
pub use retry::{retry, RetryPolicy};
pub use state::SharedState;
pub use sync::{resolve_chain, SyncConfig, SyncEngine, SyncMode};
pub use validators::ValidatorRefresher;
