//! Pyth price feed implementation (Hermes HTTP API)

use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use super::{FeedKind, PriceData, PriceFeed};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Price feed backed by Pyth's Hermes service
pub struct PythFeed {
    client: Client,
    hermes_url: String,
    feed_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FeedEntry {
    price: RawPrice,
}

/// Fixed-point price as Hermes publishes it: `price * 10^expo` is the USD
/// value. Hermes has shipped the mantissas both as strings and as numbers.
#[derive(Debug, Deserialize)]
struct RawPrice {
    price: serde_json::Value,
    conf: serde_json::Value,
    expo: i32,
    publish_time: i64,
}

impl PythFeed {
    /// Create a new Pyth feed. A missing feed id is allowed here and only
    /// rejected when a price is actually requested.
    pub fn new(hermes_url: &str, feed_id: Option<String>) -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            client,
            hermes_url: hermes_url.trim_end_matches('/').to_string(),
            feed_id,
        })
    }
}

fn numeric(value: &serde_json::Value, field: &str) -> Result<f64> {
    match value {
        | serde_json::Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| Error::MalformedResponse(format!("{} is not representable", field))),
        | serde_json::Value::String(s) => s
            .parse::<f64>()
            .map_err(|e| Error::MalformedResponse(format!("{} '{}': {}", field, s, e))),
        | other => Err(Error::MalformedResponse(format!(
            "{} has unexpected type: {}",
            field, other
        ))),
    }
}

/// Convert the first feed entry into `(price_usd, confidence, publish_time)`
fn parse_feed_response(entries: &[FeedEntry]) -> Result<(f64, f64, i64)> {
    let entry = entries
        .first()
        .ok_or_else(|| Error::TokenNotFound("hermes returned no price feeds".to_string()))?;

    let scale = 10f64.powi(entry.price.expo);
    let price_usd = numeric(&entry.price.price, "price")? * scale;
    let confidence = numeric(&entry.price.conf, "conf")? * scale;

    Ok((price_usd, confidence, entry.price.publish_time))
}

#[async_trait]
impl PriceFeed for PythFeed {
    fn kind(&self) -> FeedKind {
        FeedKind::Pyth
    }

    async fn get_price(&self, _mint: &str) -> Result<PriceData> {
        let feed_id = self.feed_id.as_ref().ok_or_else(|| {
            Error::FeedNotConfigured("pyth selected but feed.pyth_feed_id is unset".to_string())
        })?;

        let url = format!("{}/api/latest_price_feeds", self.hermes_url);
        let response = self
            .client
            .get(&url)
            .query(&[("ids[]", feed_id.as_str())])
            .send()
            .await
            .map_err(|e| Error::SourceUnavailable(format!("hermes: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::SourceUnavailable(format!(
                "hermes returned HTTP {}",
                response.status()
            )));
        }

        let entries: Vec<FeedEntry> = response
            .json()
            .await
            .map_err(|e| Error::MalformedResponse(format!("hermes: {}", e)))?;

        let (price_usd, confidence, publish_time) = parse_feed_response(&entries)?;
        log::debug!(
            "Pyth price for feed {}: ${:.8} (±{:.8})",
            feed_id,
            price_usd,
            confidence
        );

        Ok(PriceData {
            price_usd,
            confidence,
            timestamp: publish_time,
            source: FeedKind::Pyth,
        })
    }

    async fn close(&self) {
        // reqwest clients release their connections on drop
    }
}
