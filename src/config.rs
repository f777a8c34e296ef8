use std::{num::NonZeroU32, path::PathBuf, time::Duration};

use alloy::primitives::{address, Address};
use clap::Parser;
use serde::Deserialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use url::Url;

use crate::error::ConfigError;

pub const DEFAULT_RPC_URL: &str = "https://1rpc.io/sepolia";
pub const DEFAULT_GRAPHQL_URL: &str = "https://graphql.union.build/v1/graphql";

/// Command line arguments.
#[derive(Debug, Parser)]
#[command(
    name = "union-bridger",
    about = "Repeated Sepolia to Holesky USDC transfers over Union"
)]
pub struct Args {
    /// JSON file with `{ "wallets": [ { "name"?, "privatekey" } ] }`.
    #[arg(long, env = "BRIDGER_WALLETS", default_value = "wallet.json")]
    pub wallets: PathBuf,

    /// Transactions per wallet. Prompted for when absent.
    #[arg(short = 'n', long)]
    pub transactions: Option<NonZeroU32>,

    /// Optional TOML file overriding the network defaults.
    #[arg(long, env = "BRIDGER_NETWORK")]
    pub network: Option<PathBuf>,

    /// RPC endpoints in failover order. Replaces the network file's list.
    #[arg(long = "rpc-url", env = "BRIDGER_RPC_URLS", value_delimiter = ',')]
    pub rpc_urls: Vec<Url>,

    /// Seconds to keep the last log lines visible before a failing exit.
    #[arg(long, default_value_t = 5)]
    pub exit_delay: u64,
}

impl Args {
    pub fn exit_delay(&self) -> Duration {
        Duration::from_secs(self.exit_delay)
    }

    /// Resolves the network settings: defaults, then the TOML file, then flags.
    pub fn network_config(&self) -> Result<NetworkConfig, ConfigError> {
        let mut network = match &self.network {
            Some(path) => NetworkConfig::from_file(path)?,
            None => NetworkConfig::default(),
        };
        if !self.rpc_urls.is_empty() {
            network.rpc_urls = self.rpc_urls.clone();
        }
        if network.rpc_urls.is_empty() {
            return Err(ConfigError::NoRpcEndpoints);
        }
        Ok(network)
    }
}

/// Parses the answer to the transaction count prompt.
pub fn parse_transaction_count(input: &str) -> Result<NonZeroU32, ConfigError> {
    input
        .trim()
        .parse::<u32>()
        .ok()
        .and_then(NonZeroU32::new)
        .ok_or_else(|| ConfigError::InvalidTransactionCount(input.trim().to_string()))
}

/// Reads one line from `reader` and parses it as the transaction count.
pub async fn read_transaction_count<R>(reader: &mut R) -> Result<NonZeroU32, ConfigError>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    reader.read_line(&mut line).await?;
    parse_transaction_count(&line)
}

/// Addresses, endpoints and timings of the bridge route.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub rpc_urls: Vec<Url>,
    pub graphql_url: Url,
    pub bridge: Address,
    pub channel_id: u32,
    pub asset: AssetConfig,
    pub explorer_url: String,
    pub union_explorer_url: String,
    pub timings: Timings,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            rpc_urls: vec![Url::parse(DEFAULT_RPC_URL).expect("default rpc url is valid")],
            graphql_url: Url::parse(DEFAULT_GRAPHQL_URL).expect("default graphql url is valid"),
            bridge: address!("5FbE74A283f7954f10AA04C2eDf55578811aeb03"),
            channel_id: 8,
            asset: AssetConfig::default(),
            explorer_url: "https://sepolia.etherscan.io".to_string(),
            union_explorer_url: "https://app.union.build/explorer".to_string(),
            timings: Timings::default(),
        }
    }
}

impl NetworkConfig {
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let err = |reason: String| ConfigError::NetworkFile {
            path: path.display().to_string(),
            reason,
        };
        let raw = std::fs::read_to_string(path).map_err(|e| err(e.to_string()))?;
        toml::from_str(&raw).map_err(|e| err(e.to_string()))
    }

    pub fn tx_link(&self, tx_hash: impl std::fmt::Display) -> String {
        format!("{}/tx/{}", self.explorer_url, tx_hash)
    }

    pub fn packet_link(&self, packet_hash: &str) -> String {
        format!("{}/transfers/{}", self.union_explorer_url, packet_hash)
    }
}

/// The token moved by every transfer and its counterpart on the destination.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AssetConfig {
    pub base_token: Address,
    pub quote_token: Address,
    /// Amount in the token's smallest unit.
    pub amount: u64,
    pub symbol: String,
    pub name: String,
    pub decimals: u8,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            base_token: address!("1c7D4B196Cb0C7B01d743Fbc6116a902379C7238"),
            quote_token: address!("57978Bfe465ad9B1c0bf80f6C1539d300705EA50"),
            amount: 10_000,
            symbol: "USDC".to_string(),
            name: "USDC".to_string(),
            decimals: 6,
        }
    }
}

/// Fixed delays of the run. Values are milliseconds in the TOML file.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Timings {
    /// Pause after an approval before the first transfer.
    #[serde(with = "millis")]
    pub after_approval: Duration,
    /// Pause between two transfers of the same wallet.
    #[serde(with = "millis")]
    pub between_transactions: Duration,
    pub poll_retries: u32,
    #[serde(with = "millis")]
    pub poll_interval: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            after_approval: Duration::from_secs(3),
            between_transactions: Duration::from_secs(1),
            poll_retries: 50,
            poll_interval: Duration::from_millis(5000),
        }
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Duration, D::Error> {
        u64::deserialize(de).map(Duration::from_millis)
    }
}
