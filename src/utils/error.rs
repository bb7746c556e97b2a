//! Error handling for the monitor bot.

use thiserror::Error;

/// Main error type for the monitor bot
#[derive(Debug, Error)]
pub enum Error {
    /// Wallet-related errors
    #[error("Wallet error: {0}")]
    WalletError(String),
    /// Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A required setting is absent (e.g. no token mint configured)
    #[error("Missing configuration: {0}")]
    ConfigurationMissing(String),

    /// The price source could not be reached or returned a failure status
    #[error("Price source unavailable: {0}")]
    SourceUnavailable(String),

    /// The source answered but does not know the requested token
    #[error("Token not found by price source: {0}")]
    TokenNotFound(String),

    /// The selected feed is missing a setting it cannot run without
    #[error("Price feed not configured: {0}")]
    FeedNotConfigured(String),

    /// The source answered with a payload we cannot interpret
    #[error("Malformed feed response: {0}")]
    MalformedResponse(String),

    /// Token supply could not be fetched from the RPC node
    #[error("Token supply unavailable: {0}")]
    SupplyUnavailable(String),

    /// An on-chain account lookup failed
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// Transaction signing failed
    #[error("Signing failure: {0}")]
    SigningFailure(String),

    /// Transaction submission was refused by the RPC node
    #[error("Submission failure: {0}")]
    SubmissionFailure(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// TOML serialization/deserialization errors
    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialization error: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),

    /// Request errors
    #[error("Request error: {0}")]
    ReqwestError(#[from] reqwest::Error),

    /// Other errors
    #[error("Error: {0}")]
    Other(String),
}

/// Result type for the monitor bot
pub type Result<T> = std::result::Result<T, Error>;

// Add From conversion for bs58::decode::Error
impl From<bs58::decode::Error> for Error {
    fn from(err: bs58::decode::Error) -> Self {
        Error::WalletError(format!("bs58 decode error: {}", err))
    }
}

impl From<solana_sdk::pubkey::ParsePubkeyError> for Error {
    fn from(err: solana_sdk::pubkey::ParsePubkeyError) -> Self {
        Error::ConfigError(format!("invalid pubkey: {}", err))
    }
}

impl From<&str> for Error {
    fn from(err: &str) -> Self {
        Error::Other(err.to_string())
    }
}

impl From<String> for Error {
    fn from(err: String) -> Self {
        Error::Other(err)
    }
}

// Allow automatic conversion from anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let config_error = Error::ConfigError("missing field".to_string());
        assert_eq!(
            config_error.to_string(),
            "Configuration error: missing field"
        );

        let missing = Error::ConfigurationMissing("token_mint".to_string());
        assert_eq!(missing.to_string(), "Missing configuration: token_mint");

        let source = Error::SourceUnavailable("HTTP 503".to_string());
        assert_eq!(source.to_string(), "Price source unavailable: HTTP 503");

        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let wrapped_io_error = Error::from(io_error);
        assert!(wrapped_io_error.to_string().contains("I/O error"));

        let string_error = Error::from("custom error");
        assert_eq!(string_error.to_string(), "Error: custom error");
    }

    #[test]
    fn test_pubkey_parse_conversion() {
        use std::str::FromStr;

        let err = solana_sdk::pubkey::Pubkey::from_str("not-a-pubkey").unwrap_err();
        let wrapped = Error::from(err);
        assert!(matches!(wrapped, Error::ConfigError(_)));
        assert!(wrapped.to_string().contains("invalid pubkey"));
    }

    #[test]
    fn test_result_type() {
        fn might_fail() -> Result<()> {
            if true {
                Ok(())
            } else {
                Err(Error::Other("error".to_string()))
            }
        }

        assert!(might_fail().is_ok());
    }
}
