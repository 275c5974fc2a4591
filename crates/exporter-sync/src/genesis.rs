//! Genesis account import

use crate::transform::genesis_accounts;
use crate::Result;
use exporter_core::ChainStore;
use std::path::Path;
use tracing::info;

/// Read a genesis document and upsert one balance row per account
///
/// Returns the number of accounts written.
pub async fn import_genesis(path: impl AsRef<Path>, store: &dyn ChainStore) -> Result<usize> {
    let path = path.as_ref();
    info!("Importing genesis accounts from {}", path.display());
    let text = tokio::fs::read_to_string(path).await?;
    let genesis: serde_json::Value = serde_json::from_str(&text)?;
    let accounts = genesis_accounts(&genesis)?;
    store.insert_genesis_accounts(&accounts)?;
    info!("Imported {} genesis accounts", accounts.len());
    Ok(accounts.len())
}
