//! TOML configuration
//!
//! Every section has defaults, so an empty file (or no file) is a valid
//! configuration for a local node.

use anyhow::Context;
use exporter_core::{ChainParams, GovVersion};
use exporter_sync::{
    BackgroundConfig, FeeConfig, GovernanceConfig, NodeClientConfig, RefineConfig,
    RetrievalConfig, SyncConfig,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Whole configuration file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub chain: ChainParams,
    pub client: ClientSection,
    pub database: DatabaseSection,
    pub sync: SyncSection,
    pub tasks: TasksSection,
    pub alarm: AlarmSection,
    pub logging: LoggingSection,
}

/// Node and side-channel endpoints
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientSection {
    pub rpc_endpoint: String,
    pub lcd_endpoint: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    /// Empty disables proposal metadata fetching
    pub ipfs_gateway: String,
    /// Empty disables validator pictures
    pub keybase_url: String,
    pub side_channel_timeout_secs: u64,
}

impl Default for ClientSection {
    fn default() -> Self {
        Self {
            rpc_endpoint: "http://localhost:26657".to_string(),
            lcd_endpoint: "http://localhost:1317".to_string(),
            connect_timeout_secs: 10,
            request_timeout_secs: 30,
            ipfs_gateway: "https://ipfs.io".to_string(),
            keybase_url: "https://keybase.io".to_string(),
            side_channel_timeout_secs: 10,
        }
    }
}

/// Database files
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    pub path: PathBuf,
    pub raw_path: PathBuf,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            path: PathBuf::from("chain-exporter.db"),
            raw_path: PathBuf::from("chain-exporter-raw.db"),
        }
    }
}

/// Height loop settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncSection {
    pub mode: String,
    pub genesis_file_path: Option<PathBuf>,
    pub tx_concurrency: usize,
    pub tx_retry_attempts: u32,
    pub tx_retry_delay_ms: u64,
    pub pass_delay_ms: u64,
    pub catching_up_threshold_secs: u64,
    pub export_accounts: bool,
    pub refine_batch_size: usize,
    pub refine_tail_delay_ms: u64,
    pub progress_log_interval_secs: u64,
}

impl Default for SyncSection {
    fn default() -> Self {
        Self {
            mode: "basic".to_string(),
            genesis_file_path: None,
            tx_concurrency: 60,
            tx_retry_attempts: 5,
            tx_retry_delay_ms: 1000,
            pass_delay_ms: 1000,
            catching_up_threshold_secs: 60,
            export_accounts: true,
            refine_batch_size: 100,
            refine_tail_delay_ms: 2000,
            progress_log_interval_secs: 30,
        }
    }
}

/// Background task intervals
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TasksSection {
    pub validator_interval_secs: u64,
    pub identity_interval_secs: u64,
    pub proposal_watch_interval_secs: u64,
    pub proposal_update_interval_secs: u64,
    pub fee_batch_size: usize,
    pub fee_idle_delay_ms: u64,
    pub gov_version: GovVersion,
}

impl Default for TasksSection {
    fn default() -> Self {
        Self {
            validator_interval_secs: 10,
            identity_interval_secs: 20 * 60,
            proposal_watch_interval_secs: 6,
            proposal_update_interval_secs: 10,
            fee_batch_size: 100,
            fee_idle_delay_ms: 2000,
            gov_version: GovVersion::V1,
        }
    }
}

/// Proposal alerts
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AlarmSection {
    /// Slack incoming webhook; alerts only go to the log when unset
    pub slack_webhook: Option<String>,
    /// Explorer base URL linked from alerts
    pub web_uri: String,
}

/// Log output
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Filter used when `RUST_LOG` is unset
    pub filter: String,
    pub json: bool,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load `path`, or the defaults when no path is given
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Parse TOML text
    pub fn parse(text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn node_client(&self) -> NodeClientConfig {
        NodeClientConfig {
            rpc_endpoint: self.client.rpc_endpoint.clone(),
            lcd_endpoint: self.client.lcd_endpoint.clone(),
            connect_timeout: Duration::from_secs(self.client.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.client.request_timeout_secs),
        }
    }

    pub fn retrieval(&self) -> RetrievalConfig {
        RetrievalConfig {
            tx_concurrency: self.sync.tx_concurrency.max(1),
            tx_retry_attempts: self.sync.tx_retry_attempts.max(1),
            tx_retry_delay: Duration::from_millis(self.sync.tx_retry_delay_ms),
        }
    }

    /// Sync settings over resolved chain parameters
    pub fn sync(&self, params: ChainParams) -> SyncConfig {
        SyncConfig {
            params,
            retrieval: self.retrieval(),
            pass_delay: Duration::from_millis(self.sync.pass_delay_ms),
            catching_up_threshold: Duration::from_secs(self.sync.catching_up_threshold_secs),
            export_accounts: self.sync.export_accounts,
        }
    }

    pub fn refine(&self) -> RefineConfig {
        RefineConfig {
            batch_size: self.sync.refine_batch_size.max(1),
            tail_delay: Duration::from_millis(self.sync.refine_tail_delay_ms),
            ..Default::default()
        }
    }

    pub fn background(&self) -> BackgroundConfig {
        BackgroundConfig {
            validator_interval: Duration::from_secs(self.tasks.validator_interval_secs),
            identity_interval: Duration::from_secs(self.tasks.identity_interval_secs),
            proposal_watch_interval: Duration::from_secs(self.tasks.proposal_watch_interval_secs),
            proposal_update_interval: Duration::from_secs(
                self.tasks.proposal_update_interval_secs,
            ),
        }
    }

    pub fn fees(&self) -> FeeConfig {
        FeeConfig {
            batch_size: self.tasks.fee_batch_size.max(1),
            idle_delay: Duration::from_millis(self.tasks.fee_idle_delay_ms),
        }
    }

    pub fn governance(&self) -> GovernanceConfig {
        GovernanceConfig {
            version: self.tasks.gov_version,
            web_uri: self.alarm.web_uri.trim_end_matches('/').to_string(),
            ..Default::default()
        }
    }
}
