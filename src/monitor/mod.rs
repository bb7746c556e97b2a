//! Price monitoring loop for the BOOM protocol.
//!
//! Polls a price feed, computes the implied market capitalization and fires
//! the trigger_explosion instruction exactly once when the configured
//! threshold is crossed.

use std::time::{Duration, Instant};

use chrono::Utc;
use serde::Serialize;
use solana_sdk::pubkey::Pubkey;
use tokio_util::sync::CancellationToken;

use crate::blockchain::{ChainClient, SolanaClient, TriggerOutcome};
use crate::config::Config;
use crate::feed::{create_price_feed, PriceData, PriceFeed};
use crate::Result;

/// State of the price monitor. Written by the loop task only.
#[derive(Debug)]
pub struct MonitorState {
    pub is_running: bool,
    pub last_price: Option<PriceData>,
    pub last_market_cap: f64,
    pub last_check_time: Option<i64>,
    pub checks_count: u64,
    pub explosion_triggered: bool,
    pub supply_estimated: bool,
    pub started_at: Instant,
}

impl Default for MonitorState {
    fn default() -> Self {
        Self {
            is_running: false,
            last_price: None,
            last_market_cap: 0.0,
            last_check_time: None,
            checks_count: 0,
            explosion_triggered: false,
            supply_estimated: false,
            started_at: Instant::now(),
        }
    }
}

/// Read-only snapshot of the monitor for external display
#[derive(Debug, Clone, Serialize)]
pub struct MonitorStatus {
    pub is_running: bool,
    pub last_price: Option<f64>,
    pub last_market_cap: f64,
    pub threshold: f64,
    pub checks_count: u64,
    pub explosion_triggered: bool,
    pub supply_estimated: bool,
    pub uptime_seconds: f64,
}

/// How the monitoring loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopOutcome {
    /// The trigger fired (live or dry-run); the job is done
    Exploded,
    /// Cancelled or stopped before any trigger fired
    Stopped,
}

/// Price monitoring bot for the BOOM protocol
pub struct BoomMonitor {
    config: Config,
    state: MonitorState,
    mint: Option<Pubkey>,
    feed: Option<Box<dyn PriceFeed>>,
    chain: Option<Box<dyn ChainClient>>,
}

impl BoomMonitor {
    /// Create a monitor that has not been started yet
    pub fn new(config: Config) -> Self {
        Self {
            config,
            state: MonitorState::default(),
            mint: None,
            feed: None,
            chain: None,
        }
    }

    /// Build a running monitor from pre-built parts. Used by tests that
    /// substitute the feed and chain with doubles.
    pub fn from_parts(
        config: Config,
        feed: Box<dyn PriceFeed>,
        chain: Box<dyn ChainClient>,
    ) -> Result<Self> {
        let mint = config.token_mint()?;
        Ok(Self {
            config,
            state: MonitorState {
                is_running: true,
                ..MonitorState::default()
            },
            mint: Some(mint),
            feed: Some(feed),
            chain: Some(chain),
        })
    }

    /// Initialize and start the monitor.
    ///
    /// Fails fast when no token mint is configured; everything else the bot
    /// needs can be defaulted, the mint cannot.
    pub async fn start(&mut self) -> Result<()> {
        let mint = self.config.token_mint()?;
        let program_id = self.config.program_id()?;

        log::info!(
            "Starting BOOM monitor: token={}, threshold=${:.2}, interval={}s, dry_run={}",
            mint,
            self.config.monitor.market_cap_threshold_usd,
            self.config.monitor.poll_interval_secs,
            self.config.monitor.dry_run
        );

        let feed = create_price_feed(&self.config.feed)?;
        let keypair = self.config.load_keypair()?;
        let client = SolanaClient::new(&self.config.solana, program_id, keypair);

        log::info!(
            "Monitor initialized: wallet={}, program={}, feed={}",
            client.authority(),
            program_id,
            feed.kind()
        );

        self.mint = Some(mint);
        self.feed = Some(feed);
        self.chain = Some(Box::new(client));
        self.state.is_running = true;
        self.state.started_at = Instant::now();

        Ok(())
    }

    /// Stop the monitor and release feed connections
    pub async fn stop(&mut self) {
        log::info!("Stopping BOOM monitor");
        self.state.is_running = false;

        if let Some(feed) = &self.feed {
            feed.close().await;
        }
    }

    /// Run one price check and return the implied market cap in USD.
    ///
    /// Counts the attempt even when the fetch fails; a failed fetch leaves
    /// the last observation and last market cap untouched.
    pub async fn check_price(&mut self) -> Option<f64> {
        self.state.checks_count += 1;

        let (feed, mint) = match (&self.feed, self.mint) {
            | (Some(feed), Some(mint)) => (feed, mint),
            | _ => return None,
        };

        let price_data = match feed.get_price(&mint.to_string()).await {
            | Ok(data) => data,
            | Err(e) => {
                log::warn!("Price fetch failed: {}", e);
                return None;
            }
        };

        self.state.last_price = Some(price_data);
        self.state.last_check_time = Some(Utc::now().timestamp());

        // Market cap needs the circulating supply; fall back to the
        // configured whole-token estimate when the RPC query fails.
        let supply_tokens = match &self.chain {
            | Some(chain) => match chain.get_token_supply(&mint).await {
                | Ok(raw) => {
                    self.state.supply_estimated = false;
                    raw as f64 / 10f64.powi(self.config.monitor.token_decimals as i32)
                }
                | Err(e) => {
                    log::warn!("Supply fetch failed, using configured default: {}", e);
                    self.state.supply_estimated = true;
                    self.config.monitor.default_supply as f64
                }
            },
            | None => {
                self.state.supply_estimated = true;
                self.config.monitor.default_supply as f64
            }
        };

        let market_cap = price_data.price_usd * supply_tokens;
        self.state.last_market_cap = market_cap;

        log::info!(
            "Price check{}: price=${:.8} via {}, supply={:.0}, market_cap=${:.2}, threshold=${:.2}",
            if self.state.supply_estimated { " (estimated supply)" } else { "" },
            price_data.price_usd,
            price_data.source,
            supply_tokens,
            market_cap,
            self.config.monitor.market_cap_threshold_usd
        );

        Some(market_cap)
    }

    /// Attempt the on-chain trigger. Refuses to fire twice.
    pub async fn trigger_explosion(&mut self) -> TriggerOutcome {
        if self.state.explosion_triggered {
            log::warn!("Explosion already triggered, refusing to fire again");
            return TriggerOutcome::Rejected("explosion already triggered".to_string());
        }

        let (chain, mint) = match (&self.chain, self.mint) {
            | (Some(chain), Some(mint)) => (chain, mint),
            | _ => {
                log::error!("Cannot trigger explosion: monitor was never started");
                return TriggerOutcome::Rejected("monitor not started".to_string());
            }
        };

        log::info!(
            "Triggering explosion: token={}, market_cap=${:.2}, threshold=${:.2}",
            mint,
            self.state.last_market_cap,
            self.config.monitor.market_cap_threshold_usd
        );

        let outcome = chain
            .trigger_explosion(
                &mint,
                self.config.protocol.revealed_cap_lamports,
                &[],
                self.config.monitor.dry_run,
            )
            .await;

        match &outcome {
            | TriggerOutcome::Submitted(signature) => {
                self.state.explosion_triggered = true;
                log::info!(
                    "Explosion triggered: signature={}, market_cap=${:.2}",
                    signature,
                    self.state.last_market_cap
                );
            }
            | TriggerOutcome::DryRunAccepted => {
                self.state.explosion_triggered = true;
                log::info!("Explosion accepted in dry-run mode, nothing was submitted");
            }
            | TriggerOutcome::Rejected(reason) => {
                log::error!("Explosion trigger failed: {}", reason);
            }
        }

        outcome
    }

    /// Main monitoring loop.
    ///
    /// Runs until the trigger fires or the token is cancelled. A rejected
    /// trigger keeps the loop alive so a later cycle can retry.
    pub async fn run_loop(&mut self, cancel: CancellationToken) -> LoopOutcome {
        log::info!("Starting monitor loop");

        // Duration::from_secs_f64 panics on NaN, negative and overflowing
        // values. validate() rejects those, but from_parts does not go
        // through it, so fall back instead of trusting the field.
        let interval = Duration::try_from_secs_f64(self.config.monitor.poll_interval_secs)
            .unwrap_or_else(|_| {
                log::warn!(
                    "Invalid poll interval {}s, falling back to 5s",
                    self.config.monitor.poll_interval_secs
                );
                Duration::from_secs(5)
            });

        while self.state.is_running && !self.state.explosion_triggered {
            if let Some(market_cap) = self.check_price().await {
                if market_cap >= self.config.monitor.market_cap_threshold_usd {
                    log::info!(
                        "Threshold reached: market_cap=${:.2} >= ${:.2}",
                        market_cap,
                        self.config.monitor.market_cap_threshold_usd
                    );

                    if self.trigger_explosion().await.fired() {
                        log::info!("BOOM! Token exploded");
                        break;
                    }
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    log::info!("Monitor loop cancelled");
                    self.state.is_running = false;
                    break;
                }
                _ = tokio::time::sleep(interval) => {}
            }
        }

        let outcome = if self.state.explosion_triggered {
            LoopOutcome::Exploded
        } else {
            LoopOutcome::Stopped
        };

        log::info!(
            "Monitor loop ended: checks={}, explosion_triggered={}, runtime={:.1}s",
            self.state.checks_count,
            self.state.explosion_triggered,
            self.state.started_at.elapsed().as_secs_f64()
        );

        outcome
    }

    /// Current monitor status
    pub fn status(&self) -> MonitorStatus {
        MonitorStatus {
            is_running: self.state.is_running,
            last_price: self.state.last_price.map(|p| p.price_usd),
            last_market_cap: self.state.last_market_cap,
            threshold: self.config.monitor.market_cap_threshold_usd,
            checks_count: self.state.checks_count,
            explosion_triggered: self.state.explosion_triggered,
            supply_estimated: self.state.supply_estimated,
            uptime_seconds: self.state.started_at.elapsed().as_secs_f64(),
        }
    }

    /// Direct access to the state, mainly for assertions in tests
    pub fn state(&self) -> &MonitorState {
        &self.state
    }
}
