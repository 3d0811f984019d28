//! mcusweep: sweep the Tuya MCU send-command space of a BLE peripheral
//!
//! Finds the target by advertised name, captures its baseline response and
//! tries every 24-bit value until the device answers differently. Progress
//! is kept in the home directory so an interrupted sweep picks up where it
//! left off.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use mcusweep_controller::ble::{BleConfig, BleLink};
use mcusweep_controller::config::{
    DEFAULT_PROGRESS_EVERY, DEFAULT_START_VALUE, DEFAULT_TARGET_NAME,
};
use mcusweep_controller::{hex, JsonFileStore, ProgressStore, SearchOutcome, Session, SweepConfig};
use mcusweep_proto::ble::DEFAULT_MTU;
use mcusweep_proto::MAX_SEARCH_VALUE;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mcusweep")]
#[command(about = "Sweep the Tuya MCU send-command space of a BLE peripheral")]
struct Cli {
    /// Directory holding skiplist.json and storedvalue.json
    /// [default: $MCUSWEEP_HOME, else ~/.mcusweep]
    #[arg(long, global = true)]
    home: Option<PathBuf>,

    /// Bluetooth adapter index
    #[arg(long, global = true, default_value = "0")]
    adapter: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Find the target device and sweep until its state changes
    Run {
        /// Advertised name of the target device
        #[arg(short, long, default_value = DEFAULT_TARGET_NAME)]
        target: String,
        /// First value when no progress is stored
        #[arg(long, default_value_t = DEFAULT_START_VALUE,
              value_parser = clap::value_parser!(u32).range(1..=MAX_SEARCH_VALUE as i64))]
        start: u32,
        /// Last value to try, inclusive
        #[arg(long, default_value_t = MAX_SEARCH_VALUE,
              value_parser = clap::value_parser!(u32).range(1..=MAX_SEARCH_VALUE as i64))]
        upper_bound: u32,
        /// Pause between attempts in milliseconds
        #[arg(long, default_value = "100")]
        delay_ms: u64,
        /// Largest frame the link accepts
        #[arg(long, default_value_t = DEFAULT_MTU)]
        mtu: usize,
        /// Timeout for each BLE write or read in seconds
        #[arg(long, default_value = "5")]
        io_timeout: u64,
        /// Attempts between progress log lines
        #[arg(long, default_value_t = DEFAULT_PROGRESS_EVERY)]
        progress_every: u32,
        /// Abort if a handshake response is not a well-formed frame
        #[arg(long)]
        strict_handshake: bool,
    },
    /// List nearby devices, marking excluded ones and the target
    Scan {
        /// Scan duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
        /// Advertised name of the target device
        #[arg(short, long, default_value = DEFAULT_TARGET_NAME)]
        target: String,
    },
    /// Show stored sweep progress and the exclusion list
    Status,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let home = cli.home.unwrap_or_else(mcusweep_home);
    let ble = BleConfig { adapter_index: cli.adapter, ..BleConfig::default() };

    match cli.command {
        Commands::Run {
            target,
            start,
            upper_bound,
            delay_ms,
            mtu,
            io_timeout,
            progress_every,
            strict_handshake,
        } => {
            let config = SweepConfig {
                target_name: target,
                mtu_limit: mtu,
                start_value: start,
                search_upper_bound: upper_bound,
                attempt_delay: Duration::from_millis(delay_ms),
                progress_every,
                strict_handshake,
            };
            let ble = BleConfig { io_timeout: Duration::from_secs(io_timeout), ..ble };
            run_sweep(home, config, ble).await?;
        }
        Commands::Scan { duration, target } => {
            scan_devices(home, ble, duration, &target).await?;
        }
        Commands::Status => {
            show_status(home)?;
        }
    }

    Ok(())
}

fn mcusweep_home() -> PathBuf {
    std::env::var("MCUSWEEP_HOME").map(PathBuf::from).unwrap_or_else(|_| {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".mcusweep")
    })
}

async fn run_sweep(
    home: PathBuf,
    config: SweepConfig,
    ble: BleConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = JsonFileStore::open(&home)?;
    let link = BleLink::new(ble).await?;

    println!("Progress directory: {}", home.display());
    println!("Scanning for \"{}\"...", config.target_name);

    let report = Session::new(config, link, store).run().await?;

    println!("Device: {}", report.device);
    println!("Baseline: {}", hex(&report.baseline.response));
    match report.outcome {
        SearchOutcome::Halted { value, baseline, response, attempts } => {
            println!("State changed after {} attempts, halting; review the device", attempts);
            println!("  value:        {} (0x{:06x})", value, value);
            println!("  state was:    {}", hex(&baseline));
            println!("  state is now: {}", hex(&response));
        }
        SearchOutcome::Exhausted { upper_bound, attempts } => {
            println!(
                "Finished sweep up to {} ({} attempts this run) without a state change; review the strategy",
                upper_bound, attempts
            );
        }
    }

    Ok(())
}

async fn scan_devices(
    home: PathBuf,
    ble: BleConfig,
    duration: u64,
    target: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = JsonFileStore::open(&home)?;
    let excluded = store.load_exclusions()?;
    let link = BleLink::new(ble).await?;

    println!("Scanning for devices ({} seconds)...", duration);
    let devices = link.survey(Duration::from_secs(duration)).await?;

    println!("\nFound {} devices:", devices.len());
    for device in devices {
        let rssi = device.rssi.map(|r| format!("{} dBm", r)).unwrap_or_else(|| "N/A".to_string());
        let marker = if excluded.contains(&device.identity.id) {
            " [EXCLUDED]"
        } else if device.identity.name.as_deref() == Some(target) {
            " [TARGET]"
        } else {
            ""
        };
        println!("  {} RSSI: {}{}", device.identity, rssi, marker);
    }

    Ok(())
}

fn show_status(home: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let store = JsonFileStore::open(&home)?;

    println!("Progress directory: {}", home.display());
    match store.load_search_value()? {
        Some(value) => {
            let done = f64::from(value) / f64::from(MAX_SEARCH_VALUE) * 100.0;
            println!("Last attempted value: {} (0x{:06x}, {:.2}% of the space)", value, value, done);
        }
        None => println!("Last attempted value: none, a sweep starts at {}", DEFAULT_START_VALUE),
    }

    let excluded = store.load_exclusions()?;
    println!("Excluded devices: {}", excluded.len());
    for id in excluded {
        println!("  {}", id);
    }

    Ok(())
}
