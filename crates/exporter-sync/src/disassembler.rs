//! Message disassembly into (message type, account) links
//!
//! Built-in messages carry a fixed tag. Anything else is offered to an ordered
//! list of [`MsgRecognizer`]s; the last one, [`UndefinedRecognizer`], accepts
//! every message so nothing is dropped.

use base64::Engine as _;
use exporter_core::{ChainMsg, Tma, TxResponse};
use once_cell::sync::Lazy;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::info;

/// Tag and extra participants of a message outside the built-in set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recognized {
    /// `module/action` tag
    pub msg_type: String,
    /// Accounts beyond the signers
    pub accounts: Vec<String>,
}

/// Classifies messages the decoder does not know
pub trait MsgRecognizer: Send + Sync {
    /// Tag `value` (of wire type `type_url`), or `None` to pass it on
    fn recognize(&self, type_url: &str, value: &Value) -> Option<Recognized>;
}

static IBC_TAGS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("/ibc.applications.transfer.v1.MsgTransfer", "ibctransfer/transfer"),
        ("/ibc.core.client.v1.MsgCreateClient", "ibcclient/create_client"),
        ("/ibc.core.client.v1.MsgUpdateClient", "ibcclient/update_client"),
        ("/ibc.core.client.v1.MsgUpgradeClient", "ibcclient/upgrade_client"),
        ("/ibc.core.client.v1.MsgSubmitMisbehaviour", "ibcclient/submit_misbehaviour"),
        ("/ibc.core.connection.v1.MsgConnectionOpenInit", "ibcconnection/connection_open_init"),
        ("/ibc.core.connection.v1.MsgConnectionOpenTry", "ibcconnection/connection_open_try"),
        ("/ibc.core.connection.v1.MsgConnectionOpenAck", "ibcconnection/connection_open_ack"),
        ("/ibc.core.connection.v1.MsgConnectionOpenConfirm", "ibcconnection/connection_open_confirm"),
        ("/ibc.core.channel.v1.MsgChannelOpenInit", "ibcchannel/channel_open_init"),
        ("/ibc.core.channel.v1.MsgChannelOpenTry", "ibcchannel/channel_open_try"),
        ("/ibc.core.channel.v1.MsgChannelOpenAck", "ibcchannel/channel_open_ack"),
        ("/ibc.core.channel.v1.MsgChannelOpenConfirm", "ibcchannel/channel_open_confirm"),
        ("/ibc.core.channel.v1.MsgChannelCloseInit", "ibcchannel/channel_close_init"),
        ("/ibc.core.channel.v1.MsgChannelCloseConfirm", "ibcchannel/channel_close_confirm"),
        ("/ibc.core.channel.v1.MsgRecvPacket", "ibcchannel/recv_packet"),
        ("/ibc.core.channel.v1.MsgTimeout", "ibcchannel/timeout"),
        ("/ibc.core.channel.v1.MsgTimeoutOnClose", "ibcchannel/timeout_on_close"),
        ("/ibc.core.channel.v1.MsgAcknowledgement", "ibcchannel/acknowledgement"),
    ])
});

/// Field of the fungible token packet carried by `packet.data`
fn packet_field(value: &Value, field: &str) -> Option<String> {
    let data = value.pointer("/packet/data")?.as_str()?;
    let bytes = base64::engine::general_purpose::STANDARD.decode(data).ok()?;
    let packet: Value = serde_json::from_slice(&bytes).ok()?;
    packet
        .get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// IBC client, connection, channel and transfer messages
#[derive(Debug, Clone, Default)]
pub struct IbcRecognizer;

impl MsgRecognizer for IbcRecognizer {
    fn recognize(&self, type_url: &str, value: &Value) -> Option<Recognized> {
        let tag = *IBC_TAGS.get(type_url)?;
        let accounts = match tag {
            "ibcchannel/recv_packet" => {
                let port = value
                    .pointer("/packet/destination_port")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                if port == "transfer" {
                    packet_field(value, "receiver").into_iter().collect()
                } else {
                    Vec::new()
                }
            }
            "ibcchannel/timeout" | "ibcchannel/timeout_on_close" => {
                packet_field(value, "sender").into_iter().collect()
            }
            _ => Vec::new(),
        };
        Some(Recognized {
            msg_type: tag.to_string(),
            accounts,
        })
    }
}

/// Fallback: tags a message with its wire type name
#[derive(Debug, Clone, Default)]
pub struct UndefinedRecognizer;

impl MsgRecognizer for UndefinedRecognizer {
    fn recognize(&self, type_url: &str, _value: &Value) -> Option<Recognized> {
        info!("Undefined message type {}", type_url);
        Some(Recognized {
            msg_type: type_url.trim_start_matches('/').to_string(),
            accounts: Vec::new(),
        })
    }
}

/// Turns decoded messages into deduplicated TMA rows
pub struct Disassembler {
    recognizers: Vec<Box<dyn MsgRecognizer>>,
}

impl Default for Disassembler {
    fn default() -> Self {
        Self {
            recognizers: vec![Box::new(IbcRecognizer), Box::new(UndefinedRecognizer)],
        }
    }
}

/// Participants of a built-in message beyond its signers
fn built_in_accounts(msg: &ChainMsg) -> Vec<String> {
    match msg {
        ChainMsg::Send { to_address, .. } => vec![to_address.clone()],
        ChainMsg::MultiSend { outputs, .. } => outputs.clone(),
        ChainMsg::SetWithdrawAddress {
            withdraw_address, ..
        } => vec![withdraw_address.clone()],
        ChainMsg::Grant { grantee, .. }
        | ChainMsg::Revoke { grantee, .. }
        | ChainMsg::GrantAllowance { grantee, .. }
        | ChainMsg::RevokeAllowance { grantee, .. } => vec![grantee.clone()],
        _ => Vec::new(),
    }
}

impl Disassembler {
    /// Add a recognizer ahead of the fallback
    pub fn register(&mut self, recognizer: Box<dyn MsgRecognizer>) {
        let at = self.recognizers.len().saturating_sub(1);
        self.recognizers.insert(at, recognizer);
    }

    /// Tag and participants of one message (not descending into `authz/exec`)
    pub fn classify(&self, msg: &ChainMsg) -> Option<(String, Vec<String>)> {
        let mut accounts = msg.signers();
        let msg_type = match (msg.tag(), msg) {
            (Some(tag), _) => {
                accounts.extend(built_in_accounts(msg));
                tag.to_string()
            }
            (None, ChainMsg::Other { type_url, value }) => {
                let found = self
                    .recognizers
                    .iter()
                    .find_map(|r| r.recognize(type_url, value))?;
                accounts.extend(found.accounts);
                found.msg_type
            }
            (None, _) => return None,
        };
        accounts.retain(|a| !a.is_empty());
        Some((msg_type, accounts))
    }

    /// Type to accounts map of one transaction, wrapped messages included
    pub fn message_accounts(&self, msgs: &[ChainMsg]) -> BTreeMap<String, BTreeSet<String>> {
        let mut links: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for msg in msgs {
            msg.walk(&mut |m| {
                if let Some((msg_type, accounts)) = self.classify(m) {
                    links.entry(msg_type).or_default().extend(accounts);
                }
            });
        }
        links
    }

    /// TMA rows of one transaction, sorted and unique per (type, account)
    pub fn disassemble(&self, tx_hash: &str, height: i64, msgs: &[ChainMsg]) -> Vec<Tma> {
        self.message_accounts(msgs)
            .into_iter()
            .flat_map(|(msg_type, accounts)| {
                accounts.into_iter().map(move |account_address| Tma {
                    tx_hash: tx_hash.to_string(),
                    msg_type: msg_type.clone(),
                    account_address,
                    height,
                })
            })
            .collect()
    }

    /// TMA rows of every transaction, failed ones included
    pub fn disassemble_txs(&self, txs: &[TxResponse]) -> exporter_core::Result<Vec<Tma>> {
        let mut rows = Vec::new();
        for tx in txs {
            rows.extend(self.disassemble(&tx.txhash, tx.height, &tx.messages()?));
        }
        Ok(rows)
    }
}
