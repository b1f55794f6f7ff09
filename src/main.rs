use clap::{Parser, ValueEnum};
use log::info;
use std::net::SocketAddr;
use std::path::PathBuf;

use radarlink::config::Config;
use radarlink::consumer::{DumpConsumer, PlotConsumer};
use radarlink::receiver::Receiver;
use radarlink::sink::{JsonLines, TerminalPlot};

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    /// Live column chart of every valid frame
    Plot,
    /// Print the sender and first bytes of every datagram
    Dump,
    /// One JSON object per valid frame
    Json,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// What to do with received datagrams
    #[arg(short, long, value_enum, default_value_t = Mode::Plot)]
    mode: Mode,

    /// Bind address, overrides the config file
    #[arg(short, long)]
    listen: Option<SocketAddr>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    std::panic::set_hook(Box::new(|info| {
        eprintln!("Panic: {:?}", info);
    }));

    let args = Args::parse();

    info!("Loading config from {:?}", args.config);
    let mut config = Config::load_or_default(&args.config)?;
    if let Some(addr) = args.listen {
        config.set_listen_addr(addr);
    }

    let mut receiver = Receiver::bind(&config).await?;
    info!("Listening on {} in {:?} mode", receiver.local_addr()?, args.mode);

    match args.mode {
        Mode::Dump => {
            let mut consumer = DumpConsumer::new(std::io::stdout(), config.preview_len);
            consumer.start()?;
            receiver.run(&mut consumer).await
        }
        Mode::Plot => {
            let sink = TerminalPlot::from_config(std::io::stdout(), &config);
            receiver.run(&mut PlotConsumer::new(sink)).await
        }
        Mode::Json => {
            let sink = JsonLines::new(std::io::stdout());
            receiver.run(&mut PlotConsumer::new(sink)).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_plot() {
        let args = Args::parse_from(["radarlink"]);
        assert_eq!(args.mode, Mode::Plot);
        assert_eq!(args.config, PathBuf::from("config.toml"));
        assert!(args.listen.is_none());
    }

    #[test]
    fn listen_override_parses() {
        let args = Args::parse_from(["radarlink", "-m", "dump", "--listen", "127.0.0.1:5005"]);
        assert_eq!(args.mode, Mode::Dump);
        assert_eq!(args.listen, Some("127.0.0.1:5005".parse().unwrap()));
    }
}
