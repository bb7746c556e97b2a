//! Configuration module for the monitor bot

use crate::utils::error::{Error, Result};
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signer};
use std::env;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

/// Program id of the deployed BOOM protocol.
pub const DEFAULT_PROGRAM_ID: &str = "GC56De2SrwjGsCCFimwqxzxwjpHBEsubP3AV1yXwVtrn";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Configuration file version
    #[serde(default = "default_version")]
    pub version: String,
    /// Solana RPC configuration
    #[serde(default)]
    pub solana: SolanaConfig,

    /// Wallet configuration
    #[serde(default)]
    pub wallet: WalletConfig,

    /// BOOM protocol addresses and trigger arguments
    #[serde(default)]
    pub protocol: ProtocolConfig,

    /// Monitor loop configuration
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// Price feed configuration
    #[serde(default)]
    pub feed: FeedConfig,
}

/// Solana RPC configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolanaConfig {
    /// RPC endpoint URL
    pub rpc_url: String,

    /// Commitment level
    pub commitment: String,

    /// Timeout for RPC requests in seconds
    pub timeout_seconds: u64,
}

/// Wallet configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletConfig {
    /// Wallet private key (base58 encoded)
    pub private_key: Option<String>,

    /// Wallet file path (alternative to private_key)
    pub keypair_path: Option<String>,
}

/// BOOM protocol configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// BOOM program id (base58)
    pub program_id: String,

    /// Mint of the token being watched (base58). Required to run the monitor.
    pub token_mint: Option<String>,

    /// Cap value revealed in the trigger instruction, in lamport-scale units.
    /// Must hash to the cap_hash stored on chain or the program rejects it.
    pub revealed_cap_lamports: u64,
}

/// Monitor loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Market cap threshold in USD that arms the trigger
    pub market_cap_threshold_usd: f64,

    /// Seconds between price checks
    pub poll_interval_secs: f64,

    /// Whole-token supply assumed when the RPC supply query fails
    #[serde(default = "default_supply")]
    pub default_supply: u64,

    /// Decimals of the watched mint
    #[serde(default = "default_token_decimals")]
    pub token_decimals: u8,

    /// When true, the trigger path stops before any transaction is sent
    pub dry_run: bool,
}

/// Price feed configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Feed selector: "jupiter", "pyth" or "synthetic"
    pub source: String,

    /// Jupiter price API base URL
    pub jupiter_api_url: String,

    /// Pyth Hermes base URL
    pub hermes_url: String,

    /// Pyth price feed id (hex), required when source = "pyth"
    pub pyth_feed_id: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            solana: SolanaConfig::default(),
            wallet: WalletConfig::default(),
            protocol: ProtocolConfig::default(),
            monitor: MonitorConfig::default(),
            feed: FeedConfig::default(),
        }
    }
}

impl Default for SolanaConfig {
    fn default() -> Self {
        Self {
            rpc_url: "https://api.devnet.solana.com".to_string(),
            commitment: "confirmed".to_string(),
            timeout_seconds: 30,
        }
    }
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            private_key: None,
            keypair_path: Some("~/.config/solana/id.json".to_string()),
        }
    }
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            program_id: DEFAULT_PROGRAM_ID.to_string(),
            token_mint: None,
            revealed_cap_lamports: 100_000_000_000,
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            market_cap_threshold_usd: 100_000.0,
            poll_interval_secs: 5.0,
            default_supply: default_supply(),
            token_decimals: default_token_decimals(),
            dry_run: true,
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            source: "jupiter".to_string(),
            jupiter_api_url: "https://price.jup.ag/v6".to_string(),
            hermes_url: "https://hermes.pyth.network".to_string(),
            pyth_feed_id: None,
        }
    }
}

// --------- Helper default functions for serde ---------
fn default_version() -> String {
    "0.1.0".to_string()
}
fn default_supply() -> u64 {
    1_000_000_000
}
fn default_token_decimals() -> u8 {
    9
}

impl Config {
    /// Serialize default config to TOML string
    pub fn default_toml() -> Result<String> {
        Ok(toml::to_string_pretty(&Self::default())?)
    }

    /// Load configuration from a specific file path
    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| {
            Error::ConfigError(format!("Failed to read config file {:?}: {}", path.as_ref(), e))
        })?;
        let mut cfg: Self = toml::from_str(&content)
            .map_err(|e| Error::ConfigError(format!("Failed to parse config file: {}", e)))?;
        cfg.merge_env()?;
        Ok(cfg)
    }

    /// Save the configuration to a file
    pub fn save<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {}", e)))?;
        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::ConfigError(format!("Failed to create directory {:?}: {}", parent, e))
            })?;
        }
        std::fs::write(path, content).map_err(|e| {
            Error::ConfigError(format!("Failed to write config file {:?}: {}", path, e))
        })?;
        Ok(())
    }

    /// Validate the configuration for required fields and reasonable values
    pub fn validate(&self) -> Result<()> {
        // Check config version
        if self.version.trim().is_empty() {
            return Err(Error::ConfigError(
                "Config version must be set (e.g., '0.1.0')".to_string(),
            ));
        }
        // Solana config
        if self.solana.rpc_url.trim().is_empty() {
            return Err(Error::ConfigError("Solana RPC URL must be set".to_string()));
        }
        if self.solana.commitment.trim().is_empty() {
            return Err(Error::ConfigError("Solana commitment must be set".to_string()));
        }
        if self.solana.timeout_seconds == 0 {
            return Err(Error::ConfigError(
                "Solana timeout_seconds must be > 0".to_string(),
            ));
        }
        // Protocol config
        Pubkey::from_str(&self.protocol.program_id).map_err(|e| {
            Error::ConfigError(format!(
                "protocol.program_id is not a valid pubkey: {}", e
            ))
        })?;
        if let Some(ref mint) = self.protocol.token_mint {
            Pubkey::from_str(mint).map_err(|e| {
                Error::ConfigError(format!("protocol.token_mint is not a valid pubkey: {}", e))
            })?;
        }
        if self.protocol.revealed_cap_lamports == 0 {
            return Err(Error::ConfigError(
                "protocol.revealed_cap_lamports must be > 0".to_string(),
            ));
        }
        // Monitor config. NaN compares false against everything, so the
        // threshold and interval checks must reject non-finite values
        // explicitly; TOML and env parsing both accept nan/inf literals.
        if !self.monitor.market_cap_threshold_usd.is_finite()
            || self.monitor.market_cap_threshold_usd <= 0.0
        {
            return Err(Error::ConfigError(
                "monitor.market_cap_threshold_usd must be a finite number > 0".to_string(),
            ));
        }
        if !self.monitor.poll_interval_secs.is_finite() || self.monitor.poll_interval_secs <= 0.0 {
            return Err(Error::ConfigError(
                "monitor.poll_interval_secs must be a finite number > 0".to_string(),
            ));
        }
        if self.monitor.token_decimals > 18 {
            return Err(Error::ConfigError(
                "monitor.token_decimals cannot exceed 18".to_string(),
            ));
        }
        // Feed config
        match self.feed.source.as_str() {
            | "jupiter" | "pyth" | "synthetic" => {}
            | other => {
                return Err(Error::ConfigError(format!(
                    "feed.source must be jupiter, pyth or synthetic (got '{}')",
                    other
                )));
            }
        }
        Ok(())
    }

    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        // Try to load from current directory
        if let Ok(config) = Self::from_file("boom-monitor.toml") {
            return Ok(config);
        }

        // Try to load from user config directory
        if let Some(mut path) = dirs::config_dir() {
            path.push("boom-monitor");
            path.push("config.toml");
            if path.exists() {
                return Self::from_file(path);
            }
        }

        // Return default config if no config file found
        let mut config = Self::default();
        config.merge_env()?;
        Ok(config)
    }

    /// Merge environment variables into the configuration
    pub fn merge_env(&mut self) -> Result<()> {
        if let Ok(rpc_url) = env::var("BOOM_RPC_URL") {
            self.solana.rpc_url = rpc_url;
        }

        if let Ok(private_key) = env::var("BOOM_PRIVATE_KEY") {
            self.wallet.private_key = Some(private_key);
        }

        if let Ok(keypair_path) = env::var("BOOM_KEYPAIR_PATH") {
            self.wallet.keypair_path = Some(keypair_path);
        }

        if let Ok(program_id) = env::var("BOOM_PROGRAM_ID") {
            self.protocol.program_id = program_id;
        }

        if let Ok(token_mint) = env::var("BOOM_TOKEN_MINT") {
            self.protocol.token_mint = Some(token_mint);
        }

        if let Ok(revealed) = env::var("BOOM_REVEALED_CAP_LAMPORTS") {
            self.protocol.revealed_cap_lamports = revealed.parse().map_err(|e| {
                Error::ConfigError(format!("BOOM_REVEALED_CAP_LAMPORTS: {}", e))
            })?;
        }

        if let Ok(threshold) = env::var("BOOM_MARKET_CAP_THRESHOLD") {
            self.monitor.market_cap_threshold_usd = threshold.parse().map_err(|e| {
                Error::ConfigError(format!("BOOM_MARKET_CAP_THRESHOLD: {}", e))
            })?;
        }

        if let Ok(interval) = env::var("BOOM_POLL_INTERVAL_SECONDS") {
            self.monitor.poll_interval_secs = interval.parse().map_err(|e| {
                Error::ConfigError(format!("BOOM_POLL_INTERVAL_SECONDS: {}", e))
            })?;
        }

        if let Ok(supply) = env::var("BOOM_DEFAULT_SUPPLY") {
            self.monitor.default_supply = supply.parse().map_err(|e| {
                Error::ConfigError(format!("BOOM_DEFAULT_SUPPLY: {}", e))
            })?;
        }

        if let Ok(dry_run) = env::var("BOOM_DRY_RUN") {
            self.monitor.dry_run = matches!(
                dry_run.to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }

        if let Ok(source) = env::var("BOOM_FEED") {
            self.feed.source = source;
        }

        if let Ok(api_url) = env::var("BOOM_JUPITER_API_URL") {
            self.feed.jupiter_api_url = api_url;
        }

        if let Ok(feed_id) = env::var("BOOM_PYTH_FEED_ID") {
            self.feed.pyth_feed_id = Some(feed_id);
        }

        Ok(())
    }

    /// Parsed BOOM program id
    pub fn program_id(&self) -> Result<Pubkey> {
        Ok(Pubkey::from_str(&self.protocol.program_id)?)
    }

    /// Parsed mint of the watched token. Absent mint is the one setting the
    /// monitor cannot start without.
    pub fn token_mint(&self) -> Result<Pubkey> {
        match self.protocol.token_mint {
            | Some(ref mint) => Ok(Pubkey::from_str(mint)?),
            | None => Err(Error::ConfigurationMissing(
                "protocol.token_mint (set it in the config file or BOOM_TOKEN_MINT)".to_string(),
            )),
        }
    }

    pub fn load_keypair(&self) -> Result<Keypair> {
        // Try to load from private key first
        if let Some(ref private_key) = self.wallet.private_key {
            let bytes: Vec<u8> = bs58::decode(private_key).into_vec()?;
            let keypair = Keypair::from_bytes(&bytes)
                .map_err(|e| Error::WalletError(format!("Keypair from_bytes error: {}", e)))?;
            return Ok(keypair);
        }

        // Then try to load from keypair file
        if let Some(ref keypair_path) = self.wallet.keypair_path {
            let path = expand_tilde(keypair_path);

            // Missing file: run on a throwaway key rather than aborting.
            // Dry runs still work; a live trigger signed by it will be
            // rejected for lack of authority/funds.
            if !path.exists() {
                let keypair = Keypair::new();
                log::warn!(
                    "Keypair file {:?} not found, using ephemeral keypair {}",
                    path,
                    keypair.pubkey()
                );
                return Ok(keypair);
            }

            if let Ok(s) = fs::read_to_string(&path) {
                let trimmed = s.trim();

                // solana-keygen JSON byte array format
                if let Ok(bytes) = serde_json::from_str::<Vec<u8>>(trimmed) {
                    if let Ok(kp) = Keypair::from_bytes(&bytes) {
                        return Ok(kp);
                    }
                }

                // base58 string (the format written by `boom-monitor init`)
                if let Ok(decoded) = bs58::decode(trimmed.trim_matches('"')).into_vec() {
                    if let Ok(kp) = Keypair::from_bytes(&decoded) {
                        return Ok(kp);
                    }
                }
            }

            // Fallback: treat file contents as raw 64-byte keypair bytes
            let keypair_bytes = fs::read(&path)?;
            let keypair = Keypair::from_bytes(&keypair_bytes)
                .map_err(|e| Error::WalletError(format!("Keypair from_bytes error: {}", e)))?;
            return Ok(keypair);
        }

        Err(Error::WalletError("No wallet private key or keypair file provided".to_string()))
    }
}

/// Expand a leading `~/` to the user's home directory
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
