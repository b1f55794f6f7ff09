use clap::Parser;
use log::{debug, info};
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tokio::time::{interval, Duration};

use radarlink::fmcw::{self, Radar, SAMPLE_RATE, SWEEP_BANDWIDTH};

/// Send simulated FMCW radar frames to a radarlink receiver.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Receiver address
    #[arg(short, long, default_value = "127.0.0.1:5005")]
    target: SocketAddr,

    /// Delay between frames in milliseconds
    #[arg(short, long, default_value_t = 50)]
    interval_ms: u64,

    /// Magnitudes per frame (half the FFT size)
    #[arg(short, long, default_value_t = 128, value_parser = clap::value_parser!(u16).range(4..))]
    bins: u16,

    /// Frames to send, 0 for no limit
    #[arg(short = 'n', long, default_value_t = 0)]
    count: u64,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let radar = Radar::new(usize::from(args.bins) * 2, SAMPLE_RATE, SWEEP_BANDWIDTH);
    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    info!("Sending {} bins every {} ms to {}", radar.bins(), args.interval_ms, args.target);

    let mut ticker = interval(Duration::from_millis(args.interval_ms.max(1)));
    let mut sent = 0u64;
    while args.count == 0 || sent < args.count {
        ticker.tick().await;
        let line = fmcw::simulate_frame(&radar, sent).encode(2);
        let len = socket.send_to(line.as_bytes(), args.target).await?;
        debug!("Sent frame {} ({} bytes)", sent, len);
        sent += 1;
    }

    info!("Sent {} frames", sent);
    Ok(())
}
