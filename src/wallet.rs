use std::path::Path;

use alloy::signers::local::PrivateKeySigner;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::error::{ConfigError, ValidationError};

static PRIVATE_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^0x[0-9a-fA-F]{64}$").expect("private key pattern compiles"));

pub const UNNAMED: &str = "Unnamed";

/// One entry of the wallet file. Nothing here is trusted until [`validate`]
/// has accepted it.
///
/// [`validate`]: WalletEntry::validate
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct WalletEntry {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "privatekey")]
    pub private_key: Option<String>,
}

impl WalletEntry {
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(UNNAMED)
    }

    pub fn validate(&self) -> Result<PrivateKeySigner, ValidationError> {
        let key = self
            .private_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(ValidationError::MissingKey)?;
        if !key.starts_with("0x") {
            return Err(ValidationError::MissingPrefix);
        }
        if !PRIVATE_KEY.is_match(key) {
            return Err(ValidationError::MalformedKey);
        }
        key.parse::<PrivateKeySigner>()
            .map_err(|_| ValidationError::InvalidScalar)
    }
}

/// A wallet that passed validation.
#[derive(Debug, Clone)]
pub struct Wallet {
    pub name: String,
    pub signer: PrivateKeySigner,
}

#[derive(Debug, Deserialize)]
struct WalletFile {
    wallets: Option<Vec<WalletEntry>>,
}

/// Reads `{ "wallets": [...] }`. Individual entries are not validated here.
pub fn load(path: &Path) -> Result<Vec<WalletEntry>, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::WalletFileMissing(path.display().to_string()));
    }
    let unreadable = |reason: String| ConfigError::WalletFileUnreadable {
        path: path.display().to_string(),
        reason,
    };
    let raw = std::fs::read_to_string(path).map_err(|e| unreadable(e.to_string()))?;
    parse(&raw).map_err(|e| match e {
        ConfigError::WalletFileUnreadable { reason, .. } => unreadable(reason),
        other => other,
    })
}

fn parse(raw: &str) -> Result<Vec<WalletEntry>, ConfigError> {
    let value: serde_json::Value =
        serde_json::from_str(raw).map_err(|e| ConfigError::WalletFileUnreadable {
            path: String::new(),
            reason: e.to_string(),
        })?;
    if !value.get("wallets").is_some_and(|w| w.is_array()) {
        return Err(ConfigError::WalletListMissing);
    }
    let file: WalletFile =
        serde_json::from_value(value).map_err(|e| ConfigError::WalletFileUnreadable {
            path: String::new(),
            reason: e.to_string(),
        })?;
    file.wallets.ok_or(ConfigError::WalletListMissing)
}
