//! Runs a snakenet server.
//!
//! ```text
//! snakenet-server --config snakenet.yaml --bind 0.0.0.0:8080 --tick-rate 15
//! ```
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

use std::path::PathBuf;

use clap::Parser;
use snakenet::{ServerConfig, SnakenetError, SnakenetServer};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// YAML config file. Defaults are used for anything it leaves out.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on, overriding the config file.
    #[arg(short, long)]
    bind: Option<String>,

    /// Match heartbeat in Hz, overriding the config file.
    #[arg(short, long)]
    tick_rate: Option<u32>,
}

impl Args {
    fn server_config(&self) -> Result<ServerConfig, SnakenetError> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::load(path)?,
            None => ServerConfig::default(),
        };
        if let Some(bind) = &self.bind {
            config.bind = bind.clone();
        }
        if let Some(hz) = self.tick_rate {
            config.lobby.tick_rate_hz = hz;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), SnakenetError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = args.server_config()?;
    tracing::info!(
        bind = %config.bind,
        tick_rate_hz = config.lobby.tick_rate_hz,
        slots = config.lobby.player_slots,
        "starting snakenet"
    );

    let server = SnakenetServer::builder().config(config).build().await?;
    tokio::select! {
        result = server.run() => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutting down");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_override_defaults() {
        let args = Args::parse_from(["snakenet-server", "--bind", "0.0.0.0:9000", "--tick-rate", "20"]);
        let config = args.server_config().unwrap();
        assert_eq!(config.bind, "0.0.0.0:9000");
        assert_eq!(config.lobby.tick_rate_hz, 20);
    }

    #[test]
    fn test_args_without_flags_use_defaults() {
        let args = Args::parse_from(["snakenet-server"]);
        assert_eq!(args.server_config().unwrap(), ServerConfig::default());
    }
}
