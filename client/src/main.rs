use clap::Parser;
use client::input::InputManager;
use client::network::{ClientConfig, NetworkClient};
use log::{error, info, warn};
use std::time::{Duration, Instant};
use tokio::time::{interval, MissedTickBehavior};

const STATS_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:9999")]
    server: String,

    /// Display name sent with the connect request
    #[arg(short, long, default_value = "Player")]
    name: String,

    /// Stop after this many seconds (0 runs until disconnected)
    #[arg(short, long, default_value = "0")]
    duration_secs: u64,

    /// Fly without shooting
    #[arg(long)]
    no_fire: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    let config = ClientConfig::default();
    let frame_duration = config.tick_interval;

    info!("Starting client...");
    let mut network = NetworkClient::new(&args.server, config).await?;
    let slot = network.connect(&args.name).await?;
    info!("Playing as '{}' in slot {}", args.name, slot);

    let mut input_manager = InputManager::new(!args.no_fire);
    let mut frame = interval(frame_duration);
    frame.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let started = Instant::now();
    let mut last_stats = Instant::now();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = frame.tick() => {}
            _ = &mut ctrl_c => {
                info!("Interrupted");
                break;
            }
        }

        let input = input_manager.update();
        if let Err(e) = network.send_input(&input).await {
            error!("Error sending input: {}", e);
        }

        network.receive_state().await;

        if !network.is_connected() {
            warn!("Lost connection to server");
            break;
        }

        if args.duration_secs > 0 && started.elapsed() >= Duration::from_secs(args.duration_secs) {
            info!("Run time of {} s reached", args.duration_secs);
            break;
        }

        if last_stats.elapsed() >= STATS_INTERVAL {
            network.log_stats();
            if let Some(latency) = network.latency_estimate() {
                info!("Estimated latency: {:?}", latency);
            }
            last_stats = Instant::now();
        }
    }

    network.disconnect().await;
    Ok(())
}
