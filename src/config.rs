use serde::Deserialize;
use std::path::Path;
use std::fs;
use std::net::SocketAddr;
use std::time::Duration;
use anyhow::Context;
use log::warn;

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Config {
    #[serde(default = "default_listen_address")]
    pub listen_address: String,
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,
    /// Largest datagram read in one receive; longer datagrams are truncated.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
    /// Number of payload bytes echoed by the diagnostic consumer.
    #[serde(default = "default_preview_len")]
    pub preview_len: usize,
    #[serde(default = "default_redraw_pause_ms")]
    pub redraw_pause_ms: u64,
    #[serde(default = "default_plot_width")]
    pub plot_width: usize,
    #[serde(default = "default_plot_height")]
    pub plot_height: usize,
    #[serde(default = "default_clear_screen")]
    pub clear_screen: bool,
}

fn default_listen_address() -> String {
    "192.168.2.10".to_string()
}

fn default_listen_port() -> u16 {
    5005
}

fn default_buffer_size() -> usize {
    4096
}

fn default_preview_len() -> usize {
    20
}

fn default_redraw_pause_ms() -> u64 {
    10
}

fn default_plot_width() -> usize {
    64
}

fn default_plot_height() -> usize {
    16
}

fn default_clear_screen() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_address: default_listen_address(),
            listen_port: default_listen_port(),
            buffer_size: default_buffer_size(),
            preview_len: default_preview_len(),
            redraw_pause_ms: default_redraw_pause_ms(),
            plot_width: default_plot_width(),
            plot_height: default_plot_height(),
            clear_screen: default_clear_screen(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: Config = toml::from_str(&content)
            .context("Failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    /// Like [`Config::load`], but a missing file means built-in defaults.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            warn!("Config file not found at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.listen_address, self.listen_port)
    }

    pub fn set_listen_addr(&mut self, addr: SocketAddr) {
        self.listen_address = addr.ip().to_string();
        self.listen_port = addr.port();
    }

    pub fn redraw_pause(&self) -> Duration {
        Duration::from_millis(self.redraw_pause_ms)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.buffer_size == 0 {
            anyhow::bail!("buffer_size must be greater than zero");
        }
        if self.plot_width == 0 || self.plot_height == 0 {
            anyhow::bail!("plot_width and plot_height must be greater than zero");
        }
        Ok(())
    }
}
