//! HTTP node client over Tendermint RPC and the Cosmos REST gateway

use super::NodeClient;
use crate::{Error, Result};
use async_trait::async_trait;
use exporter_core::coin::truncate_decimal;
use exporter_core::{
    AccountInfo, BlockData, BondStatus, Coin, DecCoin, GovVersion, ProposalData,
    StakingValidator, TallyResult, TxResponse, UnbondingDelegation, ValidatorSetEntry,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Validators requested per `/validators` page
const VALIDATOR_PAGE_SIZE: usize = 100;

/// Endpoints and timeouts
#[derive(Debug, Clone)]
pub struct NodeClientConfig {
    /// Tendermint RPC base URL
    pub rpc_endpoint: String,
    /// Cosmos REST gateway base URL
    pub lcd_endpoint: String,
    /// Connection timeout
    pub connect_timeout: Duration,
    /// Request timeout
    pub request_timeout: Duration,
}

impl Default for NodeClientConfig {
    fn default() -> Self {
        Self {
            rpc_endpoint: "http://localhost:26657".to_string(),
            lcd_endpoint: "http://localhost:1317".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// [`NodeClient`] over reqwest
#[derive(Debug, Clone)]
pub struct HttpNodeClient {
    config: NodeClientConfig,
    http: reqwest::Client,
}

#[derive(Deserialize)]
struct DelegationResponse {
    balance: Coin,
}

#[derive(Deserialize)]
struct UnbondingEntry {
    #[serde(deserialize_with = "exporter_core::codec::u128_from_str")]
    balance: u128,
}

#[derive(Deserialize)]
struct UnbondingResponse {
    validator_address: String,
    #[serde(default)]
    entries: Vec<UnbondingEntry>,
}

impl HttpNodeClient {
    /// Build a client for the given endpoints
    pub fn new(config: NodeClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { config, http })
    }

    /// Configured endpoints
    pub fn config(&self) -> &NodeClientConfig {
        &self.config
    }

    fn rpc_url(&self, path: &str) -> String {
        format!("{}{}", self.config.rpc_endpoint.trim_end_matches('/'), path)
    }

    fn lcd_url(&self, path: &str) -> String {
        format!("{}{}", self.config.lcd_endpoint.trim_end_matches('/'), path)
    }

    async fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<Value> {
        debug!("GET {} {:?}", url, query);
        let response = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| Error::Network(format!("{}: {}", url, e)))?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(Error::Node(format!("{} returned {}: {}", url, status, body)));
        }
        Ok(serde_json::from_str(&body)?)
    }

    /// JSON-RPC call; returns the `result` member
    async fn rpc(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        let mut body = self.get_json(&self.rpc_url(path), query).await?;
        if let Some(err) = body.get("error").filter(|e| !e.is_null()) {
            return Err(Error::Node(format!("{}: {}", path, err)));
        }
        if let Some(result) = body.get_mut("result") {
            return Ok(result.take());
        }
        Ok(body)
    }

    async fn lcd(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        self.get_json(&self.lcd_url(path), query).await
    }

    /// Follow `pagination.next_key` and concatenate the `field` arrays
    async fn lcd_paginated(
        &self,
        path: &str,
        query: &[(&str, String)],
        field: &str,
    ) -> Result<Vec<Value>> {
        let mut items = Vec::new();
        let mut next_key: Option<String> = None;
        loop {
            let mut page_query = query.to_vec();
            if let Some(key) = &next_key {
                page_query.push(("pagination.key", key.clone()));
            }
            let mut body = self.lcd(path, &page_query).await?;
            if let Some(Value::Array(page)) = body.get_mut(field).map(Value::take) {
                items.extend(page);
            }
            match body.pointer("/pagination/next_key").and_then(Value::as_str) {
                Some(key) if !key.is_empty() => next_key = Some(key.to_string()),
                _ => break,
            }
        }
        Ok(items)
    }
}

fn take_field<T: DeserializeOwned>(mut body: Value, pointer: &str) -> Result<T> {
    let value = body
        .pointer_mut(pointer)
        .map(Value::take)
        .ok_or_else(|| Error::Node(format!("missing {} in response", pointer)))?;
    Ok(serde_json::from_value(value)?)
}

fn int_at(body: &Value, pointer: &str) -> Result<i64> {
    match body.pointer(pointer) {
        Some(Value::String(s)) => s
            .parse()
            .map_err(|_| Error::Decode(format!("{} is not an integer: {}", pointer, s))),
        Some(Value::Number(n)) => n
            .as_i64()
            .ok_or_else(|| Error::Decode(format!("{} out of range", pointer))),
        _ => Err(Error::Node(format!("missing {} in response", pointer))),
    }
}

#[async_trait]
impl NodeClient for HttpNodeClient {
    async fn latest_height(&self) -> Result<i64> {
        let status = self.rpc("/status", &[]).await?;
        int_at(&status, "/sync_info/latest_block_height")
    }

    async fn chain_id(&self) -> Result<String> {
        let status = self.rpc("/status", &[]).await?;
        take_field(status, "/node_info/network")
    }

    async fn block(&self, height: i64) -> Result<BlockData> {
        let result = self
            .rpc("/block", &[("height", height.to_string())])
            .await?;
        Ok(BlockData::from_rpc_result(result)?)
    }

    async fn tx(&self, hash: &str) -> Result<TxResponse> {
        let body = self
            .lcd(&format!("/cosmos/tx/v1beta1/txs/{}", hash), &[])
            .await?;
        let mut raw: Value = take_field(body.clone(), "/tx_response")?;
        // Older gateways leave the decoded tx beside the response only
        if raw.get("tx").map_or(true, Value::is_null) {
            if let (Some(obj), Some(tx)) = (raw.as_object_mut(), body.get("tx")) {
                obj.insert("tx".to_string(), tx.clone());
            }
        }
        Ok(TxResponse::from_value(raw)?)
    }

    async fn validator_set(&self, height: i64) -> Result<Vec<ValidatorSetEntry>> {
        let mut entries = Vec::new();
        let mut page = 1usize;
        loop {
            let result = self
                .rpc(
                    "/validators",
                    &[
                        ("height", height.to_string()),
                        ("page", page.to_string()),
                        ("per_page", VALIDATOR_PAGE_SIZE.to_string()),
                    ],
                )
                .await?;
            let total = int_at(&result, "/total")? as usize;
            let batch: Vec<ValidatorSetEntry> = take_field(result, "/validators")?;
            let fetched = batch.len();
            entries.extend(batch);
            if fetched == 0 || entries.len() >= total {
                break;
            }
            page += 1;
        }
        Ok(entries)
    }

    async fn bond_denom(&self) -> Result<String> {
        let body = self.lcd("/cosmos/staking/v1beta1/params", &[]).await?;
        take_field(body, "/params/bond_denom")
    }

    async fn account(&self, address: &str) -> Result<AccountInfo> {
        let body = self
            .lcd(&format!("/cosmos/auth/v1beta1/accounts/{}", address), &[])
            .await?;
        let account = body
            .get("account")
            .ok_or_else(|| Error::Node(format!("no account for {}", address)))?;
        Ok(AccountInfo::from_value(account)?)
    }

    async fn balance(&self, address: &str, denom: &str) -> Result<u128> {
        let body = self
            .lcd(
                &format!("/cosmos/bank/v1beta1/balances/{}/by_denom", address),
                &[("denom", denom.to_string())],
            )
            .await?;
        match body.pointer("/balance/amount").and_then(Value::as_str) {
            Some(amount) => Ok(truncate_decimal(amount)?),
            None => Ok(0),
        }
    }

    async fn delegations(&self, address: &str) -> Result<Vec<Coin>> {
        let items = self
            .lcd_paginated(
                &format!("/cosmos/staking/v1beta1/delegations/{}", address),
                &[],
                "delegation_responses",
            )
            .await?;
        items
            .into_iter()
            .map(|v| -> Result<Coin> {
                Ok(serde_json::from_value::<DelegationResponse>(v)?.balance)
            })
            .collect()
    }

    async fn unbonding_delegations(&self, address: &str) -> Result<Vec<UnbondingDelegation>> {
        let items = self
            .lcd_paginated(
                &format!(
                    "/cosmos/staking/v1beta1/delegators/{}/unbonding_delegations",
                    address
                ),
                &[],
                "unbonding_responses",
            )
            .await?;
        items
            .into_iter()
            .map(|v| -> Result<UnbondingDelegation> {
                let r: UnbondingResponse = serde_json::from_value(v)?;
                Ok(UnbondingDelegation {
                    validator_address: r.validator_address,
                    balances: r.entries.into_iter().map(|e| e.balance).collect(),
                })
            })
            .collect()
    }

    async fn total_rewards(&self, address: &str) -> Result<Vec<DecCoin>> {
        let body = self
            .lcd(
                &format!("/cosmos/distribution/v1beta1/delegators/{}/rewards", address),
                &[],
            )
            .await?;
        match body.get("total") {
            Some(Value::Array(_)) => take_field(body, "/total"),
            _ => Ok(Vec::new()),
        }
    }

    async fn validator_commission(&self, operator_address: &str) -> Result<Vec<DecCoin>> {
        let body = self
            .lcd(
                &format!(
                    "/cosmos/distribution/v1beta1/validators/{}/commission",
                    operator_address
                ),
                &[],
            )
            .await?;
        match body.pointer("/commission/commission") {
            Some(Value::Array(_)) => take_field(body, "/commission/commission"),
            _ => Ok(Vec::new()),
        }
    }

    async fn validators_by_status(&self, status: BondStatus) -> Result<Vec<StakingValidator>> {
        let items = self
            .lcd_paginated(
                "/cosmos/staking/v1beta1/validators",
                &[("status", status.as_query().to_string())],
                "validators",
            )
            .await?;
        items
            .into_iter()
            .map(|v| serde_json::from_value(v).map_err(Error::from))
            .collect()
    }

    async fn proposals(&self, version: GovVersion) -> Result<Vec<ProposalData>> {
        let items = self
            .lcd_paginated(
                &format!("/cosmos/gov/{}/proposals", version.path()),
                &[],
                "proposals",
            )
            .await?;
        items
            .into_iter()
            .map(|v| decode_proposal(version, v))
            .collect()
    }

    async fn proposal(&self, version: GovVersion, id: u64) -> Result<ProposalData> {
        let body = self
            .lcd(&format!("/cosmos/gov/{}/proposals/{}", version.path(), id), &[])
            .await?;
        let raw = take_field(body, "/proposal")?;
        decode_proposal(version, raw)
    }

    async fn tally(&self, version: GovVersion, id: u64) -> Result<TallyResult> {
        let body = self
            .lcd(
                &format!("/cosmos/gov/{}/proposals/{}/tally", version.path(), id),
                &[],
            )
            .await?;
        take_field(body, "/tally")
    }
}

fn decode_proposal(version: GovVersion, raw: Value) -> Result<ProposalData> {
    Ok(match version {
        GovVersion::V1 => ProposalData::from_v1(raw)?,
        GovVersion::V1Beta1 => ProposalData::from_v1beta1(raw)?,
    })
}

#[cfg(all(test, feature = "live_node"))]
mod live_tests {
    use super::*;

    fn client() -> HttpNodeClient {
        let config = NodeClientConfig {
            rpc_endpoint: std::env::var("EXPORTER_RPC").unwrap_or_default(),
            lcd_endpoint: std::env::var("EXPORTER_LCD").unwrap_or_default(),
            ..Default::default()
        };
        HttpNodeClient::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_live_latest_block() {
        let client = client();
        let height = client.latest_height().await.unwrap();
        let block = client.block(height).await.unwrap();
        assert_eq!(block.height, height);
        assert!(!client.validator_set(height).await.unwrap().is_empty());
    }
}
