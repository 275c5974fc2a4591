//! Off-chain lookups: proposal metadata by CID and validator pictures by identity
//!
//! Both are side channels. Callers log and ignore their failures.

use crate::{Error, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

/// Fetches content-addressed documents
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Body of the document with content id `cid`
    async fn fetch(&self, cid: &str) -> Result<String>;
}

/// Resolves a validator identity to a picture URL
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Picture URL, `None` when the identity is unknown
    async fn picture_url(&self, identity: &str) -> Result<Option<String>>;
}

/// Public IPFS HTTP gateway
#[derive(Debug, Clone)]
pub struct IpfsGateway {
    http: reqwest::Client,
    base_url: String,
}

impl IpfsGateway {
    /// Gateway at `base_url` (e.g. `https://ipfs.io`)
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: reqwest::Client::builder().timeout(timeout).build()?,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl ContentStore for IpfsGateway {
    async fn fetch(&self, cid: &str) -> Result<String> {
        let url = format!("{}/ipfs/{}", self.base_url.trim_end_matches('/'), cid);
        let response = self.http.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(Error::Network(format!(
                "{} returned {}",
                url,
                response.status()
            )));
        }
        Ok(response.text().await?)
    }
}

#[derive(Deserialize, Default)]
struct KeybasePicture {
    #[serde(default)]
    url: String,
}

#[derive(Deserialize, Default)]
struct KeybasePictures {
    #[serde(default)]
    primary: KeybasePicture,
}

#[derive(Deserialize)]
struct KeybaseUser {
    #[serde(default)]
    pictures: Option<KeybasePictures>,
}

#[derive(Deserialize)]
struct KeybaseLookup {
    #[serde(default)]
    them: Option<Vec<Option<KeybaseUser>>>,
}

/// Keybase user lookup by PGP key suffix
#[derive(Debug, Clone)]
pub struct KeybaseResolver {
    http: reqwest::Client,
    base_url: String,
}

impl KeybaseResolver {
    /// Resolver against `base_url` (e.g. `https://keybase.io`)
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: reqwest::Client::builder().timeout(timeout).build()?,
            base_url: base_url.into(),
        })
    }
}

fn last_picture(lookup: KeybaseLookup) -> Option<String> {
    lookup
        .them
        .unwrap_or_default()
        .into_iter()
        .flatten()
        .filter_map(|user| user.pictures)
        .map(|p| p.primary.url)
        .filter(|url| !url.is_empty())
        .last()
}

#[async_trait]
impl IdentityResolver for KeybaseResolver {
    async fn picture_url(&self, identity: &str) -> Result<Option<String>> {
        let url = format!(
            "{}/_/api/1.0/user/lookup.json",
            self.base_url.trim_end_matches('/')
        );
        let response = self
            .http
            .get(&url)
            .query(&[("fields", "pictures"), ("key_suffix", identity)])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Error::Network(format!(
                "keybase lookup for {} returned {}",
                identity,
                response.status()
            )));
        }
        let lookup: KeybaseLookup = response.json().await?;
        Ok(last_picture(lookup))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keybase_picture_extraction() {
        let lookup: KeybaseLookup = serde_json::from_str(
            r#"{"status":{"code":0,"name":"OK"},"them":[
                {"id":"1","pictures":{"primary":{"url":"https://a/pic.jpg","source":null}}}
            ]}"#,
        )
        .unwrap();
        assert_eq!(last_picture(lookup).as_deref(), Some("https://a/pic.jpg"));

        let empty: KeybaseLookup =
            serde_json::from_str(r#"{"status":{"code":0},"them":[null]}"#).unwrap();
        assert_eq!(last_picture(empty), None);
    }
}
