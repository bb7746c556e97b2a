//! Synthetic price feed for tests and dry runs without network access

use crate::Result;
use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use tokio::sync::Mutex;

use super::{FeedKind, PriceData, PriceFeed};

const NOISE_MIN: f64 = -0.0001;
const NOISE_MAX: f64 = 0.0003;

/// Deterministic-ish upward price ramp. Every call advances the price by the
/// configured increment plus bounded noise, so with the default increment the
/// series never decreases and always reaches any threshold eventually.
pub struct SyntheticFeed {
    cursor: Mutex<f64>,
    increment: f64,
}

impl SyntheticFeed {
    pub fn new(start_price: f64, increment: f64) -> Self {
        Self {
            cursor: Mutex::new(start_price),
            increment,
        }
    }
}

impl Default for SyntheticFeed {
    fn default() -> Self {
        Self::new(0.001, 0.0001)
    }
}

#[async_trait]
impl PriceFeed for SyntheticFeed {
    fn kind(&self) -> FeedKind {
        FeedKind::Synthetic
    }

    async fn get_price(&self, _mint: &str) -> Result<PriceData> {
        let noise = rand::thread_rng().gen_range(NOISE_MIN..NOISE_MAX);

        let mut cursor = self.cursor.lock().await;
        *cursor += self.increment + noise;
        let price_usd = *cursor;

        Ok(PriceData {
            price_usd,
            confidence: price_usd * 0.01,
            timestamp: Utc::now().timestamp(),
            source: FeedKind::Synthetic,
        })
    }

    async fn close(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_price_never_decreases_with_default_increment() {
        let feed = SyntheticFeed::default();

        let mut last = 0.0;
        for _ in 0..50 {
            let data = feed.get_price("any-mint").await.unwrap();
            assert!(data.price_usd >= last);
            last = data.price_usd;
        }
        // 50 steps of at least `increment + NOISE_MIN` = 0 and at most
        // 0.0001 + NOISE_MAX each
        assert!(last > 0.001);
        assert!(last < 0.001 + 50.0 * (0.0001 + NOISE_MAX));
    }

    #[tokio::test]
    async fn test_confidence_is_one_percent_of_price() {
        let feed = SyntheticFeed::default();
        let data = feed.get_price("any-mint").await.unwrap();
        assert!((data.confidence - data.price_usd * 0.01).abs() < 1e-12);
        assert_eq!(data.source, FeedKind::Synthetic);
    }

    #[tokio::test]
    async fn test_configured_ramp_crosses_quickly() {
        let feed = SyntheticFeed::new(1.0, 0.5);
        let first = feed.get_price("any-mint").await.unwrap();
        let second = feed.get_price("any-mint").await.unwrap();
        assert!(first.price_usd > 1.0);
        assert!(second.price_usd > first.price_usd);
    }
}
