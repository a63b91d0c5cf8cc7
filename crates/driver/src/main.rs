//! Batch distribution CLI.
//!
//! Reads a recipients JSON map (address -> total allocation), decomposes
//! each allocation into bounded chunks, and pushes them through a remote
//! settlement node's privileged sale endpoint.

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use xpleb_driver::{
    BatchDriver, DriverConfig, FeeEstimator, FixedFeeEstimator, HttpFeeEstimator,
    HttpSaleEndpoint,
};
use xpleb_types::{Address, Quantity};

#[derive(Debug, Parser)]
#[command(name = "xpleb-driver")]
#[command(about = "XPLEB batch distribution driver")]
#[command(version)]
struct Cli {
    /// Path to the recipients JSON file (map of address to total amount)
    #[arg(long)]
    recipients: PathBuf,

    /// Base URL of the settlement node RPC (e.g. http://127.0.0.1:8080)
    #[arg(long)]
    rpc: String,

    /// Largest quantity per owner_buy call (must be at least 1)
    #[arg(long, default_value_t = 100, value_parser = clap::value_parser!(u64).range(1..))]
    chunk_limit: Quantity,

    /// Attempts per chunk before aborting the run
    #[arg(long, default_value_t = 8)]
    max_attempts: u32,

    /// Fee escalation per retry, in percent
    #[arg(long, default_value_t = 25)]
    escalation_percent: u32,

    /// Skip recipients before this index (resume an interrupted run)
    #[arg(long, default_value_t = 0)]
    start_index: usize,

    /// Starting ordering nonce for the operator identity
    #[arg(long, default_value_t = 0)]
    start_nonce: u64,

    /// Fixed priority fee in atomic units (ignored with --fee-url)
    #[arg(long, default_value_t = 150_000_000_000)]
    priority_fee: u128,

    /// Fixed ceiling fee in atomic units (ignored with --fee-url)
    #[arg(long, default_value_t = 300_000_000_000)]
    max_fee: u128,

    /// External fee-estimation source returning {max_priority_fee, max_fee}
    #[arg(long)]
    fee_url: Option<String>,
}

fn load_recipients(path: &PathBuf) -> Result<Vec<(Address, Quantity)>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("read recipients file {}", path.display()))?;
    let map: BTreeMap<String, Quantity> =
        serde_json::from_str(&raw).context("parse recipients JSON")?;

    let mut recipients = Vec::with_capacity(map.len());
    for (address, amount) in map {
        let address: Address = address
            .parse()
            .with_context(|| format!("invalid recipient address {address}"))?;
        if amount == 0 {
            bail!("recipient {address} has a zero allocation");
        }
        recipients.push((address, amount));
    }
    Ok(recipients)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let recipients = load_recipients(&cli.recipients)?;
    let total: u64 = recipients.iter().map(|(_, amount)| amount).sum();
    println!(
        "loaded {} recipients, {} units total",
        recipients.len(),
        total
    );

    let fees: Box<dyn FeeEstimator> = match &cli.fee_url {
        Some(url) => Box::new(HttpFeeEstimator::new(url.clone())),
        None => Box::new(FixedFeeEstimator::new(cli.priority_fee, cli.max_fee)),
    };

    let config = DriverConfig {
        chunk_limit: cli.chunk_limit,
        max_attempts: cli.max_attempts,
        escalation_percent: cli.escalation_percent,
        start_index: cli.start_index,
    };

    let endpoint = HttpSaleEndpoint::new(cli.rpc.clone());
    let mut driver = BatchDriver::new(endpoint, fees, config).with_start_nonce(cli.start_nonce);

    let report = driver
        .run(&recipients)
        .context("distribution run aborted")?;

    println!(
        "done: {} submissions, {} units settled across {} recipients",
        report.submissions.len(),
        report.total_settled,
        report.recipients_settled
    );
    for submission in &report.submissions {
        println!(
            "{}  {} x{} nonce={} attempts={}",
            submission.tx_id,
            submission.recipient,
            submission.quantity,
            submission.nonce,
            submission.attempts
        );
    }

    Ok(())
}
