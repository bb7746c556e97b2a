//! CLI entrypoint for the BOOM monitor bot

use anyhow::{Context, Result};
use boom_monitor::blockchain::{boom_token_pda, protocol_pda, ChainClient, SolanaClient};
use boom_monitor::config::Config;
use boom_monitor::monitor::{BoomMonitor, LoopOutcome};
use boom_monitor::utils::init_logging;
use clap::{Parser, Subcommand};
use colored::Colorize;
use solana_sdk::pubkey::Pubkey;
use std::path::Path;
use std::str::FromStr;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Parser)]
#[command(
    name = "boom-monitor",
    author,
    version,
    about = "BOOM protocol market-cap monitor",
    long_about = None
)]
struct Args {
    /// Path to the configuration file (TOML)
    #[arg(short, long, default_value = "boom-monitor.toml")]
    config: String,

    /// Print the default configuration to stdout and exit
    #[arg(long)]
    print_default_config: bool,

    /// Command to execute
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Watch the market cap and fire the trigger when the threshold is crossed
    Run {
        /// Submit the real transaction instead of the default dry run
        #[arg(long)]
        live: bool,
        /// Override the configured token mint
        #[arg(long)]
        mint: Option<String>,
    },
    /// Generate a default configuration and wallet keypair
    Init {
        /// Output path for config file
        #[arg(short, long, default_value = "boom-monitor.toml")]
        config: String,
        /// Output path for keypair file
        #[arg(long, default_value = "wallet.json")]
        keypair: String,
        /// Overwrite existing files
        #[arg(long)]
        force: bool,
    },
    /// Derive the protocol PDAs for a mint and check whether they exist
    Derive {
        /// Token mint to derive for (defaults to the configured mint)
        #[arg(long)]
        mint: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_logging("info");

    let args = Args::parse();

    if args.print_default_config {
        println!("{}", Config::default_toml()?);
        return Ok(());
    }

    if let Some(cmd) = &args.command {
        match cmd {
            | Command::Run { live, mint } => {
                let mut config = load_config(&args.config)?;
                if *live {
                    config.monitor.dry_run = false;
                }
                if let Some(mint) = mint {
                    config.protocol.token_mint = Some(mint.clone());
                }
                return run_monitor(config).await;
            }
            | Command::Init { config, keypair, force } => {
                return init_files(config, keypair, *force);
            }
            | Command::Derive { mint } => {
                let config = load_config(&args.config)?;
                return derive_addresses(&config, mint.as_deref()).await;
            }
        }
    }

    let config = load_config(&args.config)?;
    run_monitor(config).await
}

/// Load the configuration from the given path, falling back to the default
/// search locations (and env overrides) when it does not exist.
fn load_config(path: &str) -> Result<Config> {
    let config = if Path::new(path).exists() {
        Config::from_file(path).context("Failed to load configuration")?
    } else {
        log::warn!("Configuration file '{}' not found - using defaults", path);
        Config::load().context("Failed to load configuration")?
    };
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

async fn run_monitor(config: Config) -> Result<()> {
    println!("{}", "💥 BOOM Protocol Price Monitor".bold().blue());
    println!();

    let token_mint = match config.protocol.token_mint.clone() {
        | Some(mint) => mint,
        | None => {
            eprintln!("{}", "Error: no token mint configured".red());
            eprintln!("Set protocol.token_mint in the config file or export BOOM_TOKEN_MINT=<mint>");
            std::process::exit(1);
        }
    };

    println!("{} {}", "Token:".cyan(), token_mint);
    println!(
        "{} ${:.2}",
        "Threshold:".cyan(),
        config.monitor.market_cap_threshold_usd
    );
    println!("{} {}", "RPC:".cyan(), config.solana.rpc_url);
    println!("{} {}", "Feed:".cyan(), config.feed.source);
    println!("{} {}", "Dry Run:".cyan(), config.monitor.dry_run);
    println!();

    let mut monitor = BoomMonitor::new(config);
    monitor.start().await.context("Failed to start monitor")?;

    let cancel = CancellationToken::new();
    let cancel_on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("Shutdown signal received. Stopping...");
            cancel_on_signal.cancel();
        }
    });

    let outcome = monitor.run_loop(cancel).await;
    monitor.stop().await;

    let status = monitor.status();
    println!();
    println!("{}", "Final Status:".bold());
    println!("  Checks: {}", status.checks_count);
    if status.last_market_cap > 0.0 {
        println!("  Last Market Cap: ${:.2}", status.last_market_cap);
    } else {
        println!("  Last Market Cap: N/A");
    }
    println!("  Explosion Triggered: {}", status.explosion_triggered);

    if outcome == LoopOutcome::Exploded {
        println!();
        println!("{}", "💥 BOOM! Token exploded.".bold().yellow());
    }

    Ok(())
}

fn init_files(config_path: &str, keypair_path: &str, force: bool) -> Result<()> {
    use solana_sdk::signature::{Keypair, Signer};
    use std::fs;
    use std::path::PathBuf;

    let cfg_path = PathBuf::from(config_path);
    let kp_path = PathBuf::from(keypair_path);

    if (cfg_path.exists() || kp_path.exists()) && !force {
        eprintln!("Config or keypair already exists. Use --force to overwrite.");
        std::process::exit(1);
    }

    if let Some(parent) = cfg_path.parent() {
        fs::create_dir_all(parent)?;
    }
    if let Some(parent) = kp_path.parent() {
        fs::create_dir_all(parent)?;
    }

    fs::write(&cfg_path, Config::default_toml()?)?;
    println!("✅ Wrote default config to {}", cfg_path.display());

    let kp = Keypair::new();
    let secret = bs58::encode(kp.to_bytes()).into_string();
    fs::write(&kp_path, format!("\"{}\"", secret))?;
    println!(
        "✅ Wrote new keypair to {} (pubkey={})",
        kp_path.display(),
        kp.pubkey()
    );
    Ok(())
}

async fn derive_addresses(config: &Config, mint_override: Option<&str>) -> Result<()> {
    let program_id = config.program_id().context("Invalid program id")?;

    let mint = match mint_override {
        | Some(mint) => Pubkey::from_str(mint).context("Invalid mint")?,
        | None => config.token_mint().context("No token mint configured")?,
    };

    let (protocol, protocol_bump) = protocol_pda(&program_id);
    let (boom_token, token_bump) = boom_token_pda(&program_id, &mint);

    println!("{} {}", "Program:".cyan(), program_id);
    println!("{} {}", "Mint:".cyan(), mint);
    println!(
        "{} {} (bump {})",
        "Protocol PDA:".cyan(),
        protocol,
        protocol_bump
    );
    println!(
        "{} {} (bump {})",
        "Boom token PDA:".cyan(),
        boom_token,
        token_bump
    );

    let keypair = config.load_keypair().context("Failed to load keypair")?;
    let client = SolanaClient::new(&config.solana, program_id, keypair);

    match client.account_exists(&protocol).await {
        | Ok(true) => println!("{} exists", "Protocol account:".cyan()),
        | Ok(false) => println!("{} not found", "Protocol account:".cyan()),
        | Err(e) => println!(
            "{} {}",
            "Protocol account:".cyan(),
            format!("lookup failed: {}", e).red()
        ),
    }

    match client.get_boom_token_state(&mint).await {
        | Ok(Some(_)) => println!("{} exists", "Boom token account:".cyan()),
        | Ok(None) => println!(
            "{} not found (token not registered)",
            "Boom token account:".cyan()
        ),
        | Err(e) => println!(
            "{} {}",
            "Boom token account:".cyan(),
            format!("lookup failed: {}", e).red()
        ),
    }

    Ok(())
}
