//! Validator set refresh and Keybase pictures

use crate::client::NodeClient;
use crate::content::IdentityResolver;
use crate::state::SharedState;
use crate::{Error, Result};
use base64::Engine;
use exporter_core::{
    acc_from_valoper, consensus_address_from_pubkey, valconspub_from_pubkey, BondStatus,
    ChainParams, ChainStore, StakingValidator, Validator,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Store row for a staking validator at `rank`
pub fn validator_row(validator: &StakingValidator, rank: i64, params: &ChainParams) -> Result<Validator> {
    let prefixes = params.prefixes();
    let (consensus_pubkey, proposer) = if validator.consensus_pubkey.key.is_empty() {
        (String::new(), String::new())
    } else {
        let key = base64::engine::general_purpose::STANDARD
            .decode(&validator.consensus_pubkey.key)
            .map_err(|e| {
                Error::Decode(format!(
                    "consensus key of {}: {}",
                    validator.operator_address, e
                ))
            })?;
        (
            valconspub_from_pubkey(&key, &prefixes.consensus_pub)?,
            consensus_address_from_pubkey(&key),
        )
    };

    let rates = &validator.commission.commission_rates;
    Ok(Validator {
        operator_address: validator.operator_address.clone(),
        address: acc_from_valoper(&validator.operator_address, &prefixes.account)?,
        consensus_pubkey,
        proposer,
        rank,
        status: BondStatus::parse(&validator.status).code(),
        jailed: validator.jailed,
        tokens: validator.tokens.clone(),
        delegator_shares: validator.delegator_shares.clone(),
        moniker: validator.description.moniker.clone(),
        identity: validator.description.identity.clone(),
        website: validator.description.website.clone(),
        details: validator.description.details.clone(),
        unbonding_height: validator.unbonding_height,
        unbonding_time: validator.unbonding_time,
        commission_rate: rates.rate.clone(),
        commission_max_rate: rates.max_rate.clone(),
        commission_change_rate: rates.max_change_rate.clone(),
        commission_update_time: validator.commission.update_time,
        min_self_delegation: validator.min_self_delegation.clone(),
        keybase_url: String::new(),
    })
}

/// Rows ranked by bonded tokens, largest first, starting at `first_rank`
fn ranked_rows(
    validators: &[StakingValidator],
    first_rank: i64,
    params: &ChainParams,
) -> Result<Vec<Validator>> {
    let mut ordered: Vec<&StakingValidator> = validators.iter().collect();
    ordered.sort_by_key(|v| std::cmp::Reverse(v.tokens.parse::<u128>().unwrap_or(0)));
    ordered
        .into_iter()
        .enumerate()
        .map(|(i, v)| validator_row(v, first_rank + i as i64, params))
        .collect()
}

/// Refreshes the validator table
pub struct ValidatorRefresher {
    client: Arc<dyn NodeClient>,
    store: Arc<dyn ChainStore>,
    state: Arc<SharedState>,
    params: ChainParams,
    identities: Option<Arc<dyn IdentityResolver>>,
}

impl ValidatorRefresher {
    /// Create a refresher; identity lookup is off until a resolver is attached
    pub fn new(
        client: Arc<dyn NodeClient>,
        store: Arc<dyn ChainStore>,
        state: Arc<SharedState>,
        params: ChainParams,
    ) -> Self {
        Self {
            client,
            store,
            state,
            params,
            identities: None,
        }
    }

    /// Resolve Keybase pictures through `resolver`
    pub fn with_identity_resolver(mut self, resolver: Arc<dyn IdentityResolver>) -> Self {
        self.identities = Some(resolver);
        self
    }

    /// Upsert bonded, unbonding and unbonded validators with their ranks
    ///
    /// Bonded validators rank from 1 in the order the node returns them.
    /// Unbonding ones follow the highest stored bonded rank, and unbonded
    /// ones follow the highest unbonding rank (or bonded, when there is none).
    /// Skipped while catching up. Returns the number of rows written.
    pub async fn save_validators(&self) -> Result<usize> {
        if self.state.is_catching_up() {
            info!("Skipping validator refresh, catching up");
            return Ok(0);
        }

        let bonded = self.client.validators_by_status(BondStatus::Bonded).await?;
        self.store
            .upsert_validators(&ranked_rows(&bonded, 1, &self.params)?)?;
        let mut written = bonded.len();

        let unbonding = self.client.validators_by_status(BondStatus::Unbonding).await?;
        if !unbonding.is_empty() {
            let highest = self.store.highest_rank_by_status(BondStatus::Bonded.code())?;
            self.store
                .upsert_validators(&ranked_rows(&unbonding, highest + 1, &self.params)?)?;
            written += unbonding.len();
        }

        let unbonded = self.client.validators_by_status(BondStatus::Unbonded).await?;
        if !unbonded.is_empty() {
            let mut highest = self.store.highest_rank_by_status(BondStatus::Unbonding.code())?;
            if highest == 0 {
                highest = self.store.highest_rank_by_status(BondStatus::Bonded.code())?;
            }
            self.store
                .upsert_validators(&ranked_rows(&unbonded, highest + 1, &self.params)?)?;
            written += unbonded.len();
        }

        debug!(
            "Saved validators: {} bonded, {} unbonding, {} unbonded",
            bonded.len(),
            unbonding.len(),
            unbonded.len()
        );
        Ok(written)
    }

    /// Look up Keybase pictures for validators with an identity
    ///
    /// Lookup failures are logged and skipped. Returns the number of URLs stored.
    pub async fn save_validator_identities(&self) -> Result<usize> {
        let Some(resolver) = &self.identities else {
            return Ok(0);
        };
        let mut urls = Vec::new();
        for validator in self.store.validators()? {
            if validator.identity.is_empty() {
                continue;
            }
            match resolver.picture_url(&validator.identity).await {
                Ok(Some(url)) if url != validator.keybase_url => {
                    urls.push((validator.operator_address, url))
                }
                Ok(_) => {}
                Err(e) => warn!(
                    "Keybase lookup failed for {}: {}",
                    validator.operator_address, e
                ),
            }
        }
        if !urls.is_empty() {
            self.store.update_keybase_urls(&urls)?;
            info!("Updated {} Keybase pictures", urls.len());
        }
        Ok(urls.len())
    }
}
