//! End-to-end tests of the monitoring loop against scripted feed and chain
//! doubles. No network involved.

use assert_matches::assert_matches;
use async_trait::async_trait;
use boom_monitor::blockchain::{BoomTokenState, ChainClient, TriggerOutcome};
use boom_monitor::config::Config;
use boom_monitor::feed::{FeedKind, PriceData, PriceFeed};
use boom_monitor::monitor::{BoomMonitor, LoopOutcome};
use boom_monitor::{Error, Result};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const MINT: &str = "So11111111111111111111111111111111111111112";

/// 1B tokens at 9 decimals, so `price * 1e9` is the market cap
const SUPPLY_1B: u64 = 1_000_000_000_000_000_000;

/// Feed that replays a fixed script; `None` steps simulate an outage.
/// An exhausted script keeps failing, which the loop treats like any
/// other outage.
struct ScriptedFeed {
    script: Mutex<VecDeque<Option<f64>>>,
}

impl ScriptedFeed {
    fn new(steps: &[Option<f64>]) -> Self {
        Self {
            script: Mutex::new(steps.iter().copied().collect()),
        }
    }
}

#[async_trait]
impl PriceFeed for ScriptedFeed {
    fn kind(&self) -> FeedKind {
        FeedKind::Synthetic
    }

    async fn get_price(&self, _mint: &str) -> Result<PriceData> {
        let step = self.script.lock().unwrap().pop_front();
        match step {
            | Some(Some(price_usd)) => Ok(PriceData {
                price_usd,
                confidence: 0.0,
                timestamp: 1_700_000_000,
                source: FeedKind::Synthetic,
            }),
            | Some(None) => Err(Error::SourceUnavailable("scripted outage".to_string())),
            | None => Err(Error::SourceUnavailable("script exhausted".to_string())),
        }
    }

    async fn close(&self) {}
}

/// Chain double that records trigger calls and replays scripted outcomes,
/// defaulting to acceptance once the script runs out.
struct RecordingChain {
    supply: Option<u64>,
    outcomes: Mutex<VecDeque<TriggerOutcome>>,
    trigger_calls: Arc<AtomicUsize>,
    last_dry_run: Arc<Mutex<Option<bool>>>,
}

impl RecordingChain {
    fn accepting(supply: Option<u64>) -> (Self, Arc<AtomicUsize>) {
        Self::scripted(supply, vec![])
    }

    fn scripted(
        supply: Option<u64>,
        outcomes: Vec<TriggerOutcome>,
    ) -> (Self, Arc<AtomicUsize>) {
        let trigger_calls = Arc::new(AtomicUsize::new(0));
        let chain = Self {
            supply,
            outcomes: Mutex::new(outcomes.into()),
            trigger_calls: trigger_calls.clone(),
            last_dry_run: Arc::new(Mutex::new(None)),
        };
        (chain, trigger_calls)
    }
}

#[async_trait]
impl ChainClient for RecordingChain {
    fn authority(&self) -> Pubkey {
        Pubkey::new_unique()
    }

    async fn get_token_supply(&self, _mint: &Pubkey) -> Result<u64> {
        match self.supply {
            | Some(raw) => Ok(raw),
            | None => Err(Error::SupplyUnavailable("scripted".to_string())),
        }
    }

    async fn get_boom_token_state(&self, mint: &Pubkey) -> Result<Option<BoomTokenState>> {
        Ok(Some(BoomTokenState::unparsed(*mint)))
    }

    async fn trigger_explosion(
        &self,
        _mint: &Pubkey,
        _revealed_cap: u64,
        _price_proof: &[u8],
        dry_run: bool,
    ) -> TriggerOutcome {
        self.trigger_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_dry_run.lock().unwrap() = Some(dry_run);
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(TriggerOutcome::DryRunAccepted)
    }
}

fn fast_config() -> Config {
    let mut config = Config::default();
    config.protocol.token_mint = Some(MINT.to_string());
    config.monitor.poll_interval_secs = 0.01;
    config
}

#[tokio::test]
async fn first_crossing_fires_exactly_once() {
    // 50k, 80k, then 120k against the default 100k threshold
    let feed = ScriptedFeed::new(&[
        Some(0.00005),
        Some(0.00008),
        Some(0.00012),
        Some(0.00020),
    ]);
    let (chain, trigger_calls) = RecordingChain::accepting(Some(SUPPLY_1B));

    let mut monitor =
        BoomMonitor::from_parts(fast_config(), Box::new(feed), Box::new(chain)).unwrap();
    let outcome = monitor.run_loop(CancellationToken::new()).await;

    assert_eq!(outcome, LoopOutcome::Exploded);
    assert_eq!(trigger_calls.load(Ordering::SeqCst), 1);
    assert_eq!(monitor.state().checks_count, 3);
    assert!(monitor.state().explosion_triggered);
    assert!((monitor.state().last_market_cap - 120_000.0).abs() < 1e-6);
}

#[tokio::test]
async fn below_threshold_never_triggers() {
    let feed = ScriptedFeed::new(&[Some(0.00001); 64]);
    let (chain, trigger_calls) = RecordingChain::accepting(Some(SUPPLY_1B));

    let mut monitor =
        BoomMonitor::from_parts(fast_config(), Box::new(feed), Box::new(chain)).unwrap();

    let cancel = CancellationToken::new();
    let handle = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(80)).await;
        handle.cancel();
    });

    let outcome = monitor.run_loop(cancel).await;

    assert_eq!(outcome, LoopOutcome::Stopped);
    assert_eq!(trigger_calls.load(Ordering::SeqCst), 0);
    assert!(!monitor.state().explosion_triggered);
    assert!(monitor.state().checks_count >= 1);
    assert!((monitor.state().last_market_cap - 10_000.0).abs() < 1e-6);
}

#[tokio::test]
async fn non_finite_poll_interval_falls_back_and_keeps_running() {
    let feed = ScriptedFeed::new(&[Some(0.00001); 4]);
    let (chain, trigger_calls) = RecordingChain::accepting(Some(SUPPLY_1B));

    // from_parts skips validate(), so the loop has to survive this on its own
    let mut config = fast_config();
    config.monitor.poll_interval_secs = f64::NAN;

    let mut monitor =
        BoomMonitor::from_parts(config, Box::new(feed), Box::new(chain)).unwrap();

    let cancel = CancellationToken::new();
    let handle = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.cancel();
    });

    let outcome = monitor.run_loop(cancel).await;

    // The fallback interval is seconds long, so exactly one check happens
    // before the cancel lands
    assert_eq!(outcome, LoopOutcome::Stopped);
    assert_eq!(trigger_calls.load(Ordering::SeqCst), 0);
    assert_eq!(monitor.state().checks_count, 1);
}

#[tokio::test]
async fn rejected_trigger_keeps_the_loop_alive_until_a_retry_lands() {
    let feed = ScriptedFeed::new(&[Some(0.0002); 8]);
    let (chain, trigger_calls) = RecordingChain::scripted(
        Some(SUPPLY_1B),
        vec![
            TriggerOutcome::Rejected("blockhash fetch: connection refused".to_string()),
            TriggerOutcome::Submitted(Signature::default()),
        ],
    );

    let mut monitor =
        BoomMonitor::from_parts(fast_config(), Box::new(feed), Box::new(chain)).unwrap();
    let outcome = monitor.run_loop(CancellationToken::new()).await;

    assert_eq!(outcome, LoopOutcome::Exploded);
    // First attempt was rejected, the next cycle retried and succeeded
    assert_eq!(trigger_calls.load(Ordering::SeqCst), 2);
    assert_eq!(monitor.state().checks_count, 2);
    assert!(monitor.state().explosion_triggered);
}

#[tokio::test]
async fn fetch_failure_keeps_state_but_counts_the_check() {
    let feed = ScriptedFeed::new(&[Some(0.00005), None, Some(0.00006)]);
    let (chain, _) = RecordingChain::accepting(Some(SUPPLY_1B));

    let mut monitor =
        BoomMonitor::from_parts(fast_config(), Box::new(feed), Box::new(chain)).unwrap();

    let first = monitor.check_price().await.unwrap();
    assert!((first - 50_000.0).abs() < 1e-6);

    // The outage cycle returns nothing but still counts as a check, and the
    // last observation survives it
    assert!(monitor.check_price().await.is_none());
    assert_eq!(monitor.state().checks_count, 2);
    assert!((monitor.state().last_market_cap - 50_000.0).abs() < 1e-6);
    let held = monitor.state().last_price.unwrap();
    assert!((held.price_usd - 0.00005).abs() < 1e-12);

    let third = monitor.check_price().await.unwrap();
    assert!((third - 60_000.0).abs() < 1e-6);
    assert_eq!(monitor.state().checks_count, 3);
}

#[tokio::test]
async fn supply_failure_falls_back_to_configured_estimate() {
    let feed = ScriptedFeed::new(&[Some(0.00004)]);
    let (chain, _) = RecordingChain::accepting(None);

    let mut monitor =
        BoomMonitor::from_parts(fast_config(), Box::new(feed), Box::new(chain)).unwrap();

    // Default estimate is 1B whole tokens
    let cap = monitor.check_price().await.unwrap();
    assert!((cap - 40_000.0).abs() < 1e-6);

    let status = monitor.status();
    assert!(status.supply_estimated);
}

#[tokio::test]
async fn dry_run_flag_reaches_the_chain() {
    let feed = ScriptedFeed::new(&[Some(0.0002)]);
    let (chain, _) = RecordingChain::accepting(Some(SUPPLY_1B));
    let dry_run_seen = chain.last_dry_run.clone();

    // Default config keeps dry_run on
    let mut monitor =
        BoomMonitor::from_parts(fast_config(), Box::new(feed), Box::new(chain)).unwrap();
    let outcome = monitor.run_loop(CancellationToken::new()).await;

    assert_eq!(outcome, LoopOutcome::Exploded);
    assert_matches!(*dry_run_seen.lock().unwrap(), Some(true));
}

#[tokio::test]
async fn live_mode_passes_dry_run_off() {
    let feed = ScriptedFeed::new(&[Some(0.0002)]);
    let (chain, _) = RecordingChain::accepting(Some(SUPPLY_1B));
    let dry_run_seen = chain.last_dry_run.clone();

    let mut config = fast_config();
    config.monitor.dry_run = false;

    let mut monitor = BoomMonitor::from_parts(config, Box::new(feed), Box::new(chain)).unwrap();
    monitor.run_loop(CancellationToken::new()).await;

    assert_matches!(*dry_run_seen.lock().unwrap(), Some(false));
}

#[tokio::test]
async fn status_snapshot_serializes() {
    let feed = ScriptedFeed::new(&[Some(0.00005)]);
    let (chain, _) = RecordingChain::accepting(Some(SUPPLY_1B));

    let mut monitor =
        BoomMonitor::from_parts(fast_config(), Box::new(feed), Box::new(chain)).unwrap();
    monitor.check_price().await.unwrap();

    let value = serde_json::to_value(monitor.status()).unwrap();
    assert_eq!(value["checks_count"], 1);
    assert_eq!(value["explosion_triggered"], false);
    assert_eq!(value["threshold"], 100_000.0);
    assert!(value["last_price"].is_number());
    assert!(value["uptime_seconds"].is_number());
}
