//! Jupiter price feed implementation

use crate::{Error, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use super::{FeedKind, PriceData, PriceFeed};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Price feed backed by the Jupiter price API
pub struct JupiterFeed {
    client: Client,
    api_url: String,
}

#[derive(Debug, Deserialize)]
struct PriceResponse {
    /// Mint -> price entry; entries stay untyped because the API has shipped
    /// both numeric and string prices
    #[serde(default)]
    data: HashMap<String, serde_json::Value>,
}

impl JupiterFeed {
    /// Create a new Jupiter feed against the given API base URL
    pub fn new(api_url: &str) -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
        })
    }
}

/// Extract the USD price for `mint` from a Jupiter price response body
fn parse_price_response(body: &PriceResponse, mint: &str) -> Result<f64> {
    let entry = body
        .data
        .get(mint)
        .ok_or_else(|| Error::TokenNotFound(mint.to_string()))?;

    let price = entry
        .get("price")
        .ok_or_else(|| Error::MalformedResponse("price field missing".to_string()))?;

    match price {
        | serde_json::Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| Error::MalformedResponse("price is not representable".to_string())),
        | serde_json::Value::String(s) => s
            .parse::<f64>()
            .map_err(|e| Error::MalformedResponse(format!("price '{}': {}", s, e))),
        | other => Err(Error::MalformedResponse(format!(
            "price has unexpected type: {}",
            other
        ))),
    }
}

#[async_trait]
impl PriceFeed for JupiterFeed {
    fn kind(&self) -> FeedKind {
        FeedKind::Jupiter
    }

    async fn get_price(&self, mint: &str) -> Result<PriceData> {
        let url = format!("{}/price", self.api_url);
        let response = self
            .client
            .get(&url)
            .query(&[("ids", mint)])
            .send()
            .await
            .map_err(|e| Error::SourceUnavailable(format!("jupiter: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::SourceUnavailable(format!(
                "jupiter returned HTTP {}",
                response.status()
            )));
        }

        let body: PriceResponse = response
            .json()
            .await
            .map_err(|e| Error::MalformedResponse(format!("jupiter: {}", e)))?;

        let price_usd = parse_price_response(&body, mint)?;
        log::debug!("Jupiter price for {}: ${:.8}", mint, price_usd);

        Ok(PriceData {
            price_usd,
            // Jupiter publishes no confidence interval
            confidence: 0.0,
            timestamp: Utc::now().timestamp(),
            source: FeedKind::Jupiter,
        })
    }

    async fn close(&self) {
        // reqwest clients release their connections on drop
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINT: &str = "So11111111111111111111111111111111111111112";

    fn response(body: &str) -> PriceResponse {
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn test_jupiter_feed_initialization() {
        let feed = JupiterFeed::new("https://price.jup.ag/v6");
        assert!(feed.is_ok());
        assert_eq!(feed.unwrap().kind(), FeedKind::Jupiter);
    }

    #[test]
    fn test_parse_numeric_price() {
        let body = response(
            r#"{"data":{"So11111111111111111111111111111111111111112":{"id":"So11111111111111111111111111111111111111112","price":0.00015}},"timeTaken":0.0012}"#,
        );
        let price = parse_price_response(&body, MINT).unwrap();
        assert!((price - 0.00015).abs() < 1e-12);
    }

    #[test]
    fn test_parse_string_price() {
        let body = response(
            r#"{"data":{"So11111111111111111111111111111111111111112":{"price":"0.00015"}}}"#,
        );
        let price = parse_price_response(&body, MINT).unwrap();
        assert!((price - 0.00015).abs() < 1e-12);
    }

    #[test]
    fn test_unknown_token_is_token_not_found() {
        let body = response(r#"{"data":{},"timeTaken":0.0004}"#);
        let err = parse_price_response(&body, MINT).unwrap_err();
        assert!(matches!(err, Error::TokenNotFound(_)));
    }

    #[test]
    fn test_missing_price_field_is_malformed() {
        let body = response(
            r#"{"data":{"So11111111111111111111111111111111111111112":{"id":"x"}}}"#,
        );
        let err = parse_price_response(&body, MINT).unwrap_err();
        assert!(matches!(err, Error::MalformedResponse(_)));
    }

    #[test]
    fn test_non_numeric_price_is_malformed() {
        let body = response(
            r#"{"data":{"So11111111111111111111111111111111111111112":{"price":"n/a"}}}"#,
        );
        let err = parse_price_response(&body, MINT).unwrap_err();
        assert!(matches!(err, Error::MalformedResponse(_)));

        let body = response(
            r#"{"data":{"So11111111111111111111111111111111111111112":{"price":null}}}"#,
        );
        let err = parse_price_response(&body, MINT).unwrap_err();
        assert!(matches!(err, Error::MalformedResponse(_)));
    }
}
