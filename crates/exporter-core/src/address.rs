//! Bech32 address conversion between account, operator and consensus forms

use crate::{Error, Result};
use bech32::{Bech32, Hrp};
use sha2::{Digest, Sha256};

fn reencode(address: &str, target_hrp: &str) -> Result<String> {
    let (_, data) = bech32::decode(address)
        .map_err(|e| Error::InvalidAddress(format!("{address}: {e}")))?;
    let hrp = Hrp::parse(target_hrp)
        .map_err(|e| Error::InvalidAddress(format!("Invalid HRP {target_hrp}: {e}")))?;
    bech32::encode::<Bech32>(hrp, &data)
        .map_err(|e| Error::InvalidAddress(format!("bech32 encode failed: {e}")))
}

/// Convert a validator operator address to the account address of the same key
pub fn acc_from_valoper(valoper: &str, account_prefix: &str) -> Result<String> {
    reencode(valoper, account_prefix)
}

/// Convert an account address to the operator address of the same key
pub fn valoper_from_acc(account: &str, validator_prefix: &str) -> Result<String> {
    reencode(account, validator_prefix)
}

/// Bech32 encode raw consensus public key bytes (`...valconspub1...`)
pub fn valconspub_from_pubkey(pubkey: &[u8], consensus_pub_prefix: &str) -> Result<String> {
    let hrp = Hrp::parse(consensus_pub_prefix)
        .map_err(|e| Error::InvalidAddress(format!("Invalid HRP {consensus_pub_prefix}: {e}")))?;
    bech32::encode::<Bech32>(hrp, pubkey)
        .map_err(|e| Error::InvalidAddress(format!("bech32 encode failed: {e}")))
}

/// Tendermint consensus address of an ed25519 key: first 20 bytes of its SHA-256, upper hex
pub fn consensus_address_from_pubkey(pubkey: &[u8]) -> String {
    let digest = Sha256::digest(pubkey);
    hex::encode_upper(&digest[..20])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(hrp: &str, data: &[u8]) -> String {
        bech32::encode::<Bech32>(Hrp::parse(hrp).unwrap(), data).unwrap()
    }

    #[test]
    fn test_operator_account_roundtrip() {
        let key = [7u8; 20];
        let acc = encode("core", &key);
        let valoper = valoper_from_acc(&acc, "corevaloper").unwrap();
        assert!(valoper.starts_with("corevaloper1"));
        assert_eq!(acc_from_valoper(&valoper, "core").unwrap(), acc);
    }

    #[test]
    fn test_invalid_address_rejected() {
        assert!(acc_from_valoper("not-an-address", "core").is_err());
    }

    #[test]
    fn test_consensus_address_is_20_bytes_upper_hex() {
        let addr = consensus_address_from_pubkey(&[1u8; 32]);
        assert_eq!(addr.len(), 40);
        assert_eq!(addr, addr.to_uppercase());
    }

    #[test]
    fn test_valconspub_prefix() {
        let encoded = valconspub_from_pubkey(&[2u8; 32], "corevalconspub").unwrap();
        assert!(encoded.starts_with("corevalconspub1"));
    }
}
