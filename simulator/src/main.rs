mod telemetry;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use telemetry::{OccupancySensor, Reading};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Occupancy sensor simulator: posts readings to the telemetry ingestor.
#[derive(Debug, Parser)]
struct Args {
    /// Ingest endpoint
    #[arg(long, env = "INGEST_URL", default_value = "http://localhost:8080/api/send_telemetry")]
    url: String,

    /// Number of simulated devices
    #[arg(long, env = "DEVICES", default_value_t = 5)]
    devices: usize,

    /// Delay between sampling rounds
    #[arg(long, env = "INTERVAL_MS", default_value_t = 1000)]
    interval_ms: u64,

    /// Rounds to send before exiting; 0 runs until Ctrl-C
    #[arg(long, env = "COUNT", default_value_t = 0)]
    count: u64,

    /// Seconds a sensor stays occupied after the last motion
    #[arg(long, env = "HOLD_SECS", default_value_t = 10)]
    hold_secs: u64,

    /// Chance of detecting motion on each sample
    #[arg(
        long,
        env = "MOTION_PROBABILITY",
        default_value_t = 0.2,
        value_parser = parse_probability
    )]
    motion_probability: f64,
}

fn parse_probability(raw: &str) -> Result<f64, String> {
    let value: f64 = raw.parse().map_err(|e| format!("{}", e))?;
    if !(0.0..=1.0).contains(&value) {
        return Err(format!("{} is not a probability between 0 and 1", raw));
    }
    Ok(value)
}

#[derive(Debug, Default)]
struct Tally {
    ok: u64,
    rejected: u64,
    failed: u64,
    unreachable: u64,
}

impl Tally {
    fn record(&mut self, reading: &Reading, outcome: Result<StatusCode, reqwest::Error>) {
        match outcome {
            Ok(status) if status.is_success() => self.ok += 1,
            Ok(status) if status.is_client_error() => {
                self.rejected += 1;
                warn!("{} rejected with {}", reading.device_id, status);
            }
            Ok(status) => {
                self.failed += 1;
                warn!("{} failed with {}", reading.device_id, status);
            }
            Err(e) => {
                self.unreachable += 1;
                error!("Failed to send reading for {}: {}", reading.device_id, e);
            }
        }
    }
}

async fn send(client: &Client, url: &str, reading: &Reading) -> Result<StatusCode, reqwest::Error> {
    let resp = client.post(url).json(reading).send().await?;
    Ok(resp.status())
}

async fn run(args: &Args, client: &Client, tally: &mut Tally) {
    let mut rng = rand::thread_rng();
    let hold = Duration::from_secs(args.hold_secs);
    let mut sensors: Vec<OccupancySensor> = (0..args.devices)
        .map(|i| OccupancySensor::new(format!("ESP32-{}", i), hold, args.motion_probability))
        .collect();

    let mut ticker = tokio::time::interval(Duration::from_millis(args.interval_ms.max(1)));
    let mut round = 0u64;

    while args.count == 0 || round < args.count {
        ticker.tick().await;
        round += 1;

        for sensor in sensors.iter_mut() {
            let reading = sensor.sample(&mut rng, Utc::now());
            let outcome = send(client, &args.url, &reading).await;
            tally.record(&reading, outcome);
        }

        if round % 60 == 0 {
            info!(
                "Round {}: {} stored, {} rejected, {} failed",
                round, tally.ok, tally.rejected, tally.failed
            );
        }
    }

    info!("Sent {} rounds from {} devices", round, sensors.len());
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    info!(
        "Starting occupancy simulator: {} devices every {}ms -> {}",
        args.devices, args.interval_ms, args.url
    );

    let client = Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .context("building HTTP client")?;

    let mut tally = Tally::default();
    tokio::select! {
        _ = run(&args, &client, &mut tally) => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
    }

    info!(
        "Summary: {} stored, {} rejected, {} failed, {} unreachable",
        tally.ok, tally.rejected, tally.failed, tally.unreachable
    );
    Ok(())
}
