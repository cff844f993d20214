//! Harvests the AP inventory of one controller and prints the count followed
//! by the JSON array.
//!
//! Every flag falls back to an environment variable (a `.env` file is loaded
//! first): `SSH_HOST`, `SSH_USER`, `SSH_PW`, `SSH_PORT` and `WLC_POOL_SIZE`.
//!
//! ```text
//! cargo run --example harvest -- [--host wlc] [--record session.jsonl]
//! ```

use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use rwlc::config::ControllerConfig;
use rwlc::controller::Controller;
use rwlc::model::inventory_to_json;
use rwlc::session::{SessionRecordLevel, SessionRecorder, SshSessionFactory};

#[derive(Parser, Debug, Clone)]
#[command(name = "harvest", about = "Wireless LAN controller AP inventory harvest")]
struct Args {
    /// Controller address
    #[arg(long, env = "SSH_HOST")]
    host: String,

    /// CLI login user
    #[arg(long, env = "SSH_USER")]
    user: String,

    /// CLI login password
    #[arg(long, env = "SSH_PW", hide_env_values = true)]
    password: String,

    #[arg(long, env = "SSH_PORT", default_value = "22")]
    port: u16,

    /// Concurrent sessions used for the per-AP detail queries
    #[arg(long, env = "WLC_POOL_SIZE", default_value = "2")]
    pool_size: usize,

    /// Write the controller sessions to this JSONL file
    #[arg(long)]
    record: Option<PathBuf>,
}

impl Args {
    fn controller_config(&self) -> anyhow::Result<ControllerConfig> {
        let mut config = ControllerConfig::new(&self.host, &self.user, &self.password);
        config.port = self.port;
        config.pool_size = self.pool_size;
        config.validate().context("invalid controller settings")?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    let config = args.controller_config()?;
    let recorder = SessionRecorder::new(SessionRecordLevel::KeyEventsOnly);
    let mut factory = SshSessionFactory::new(config.clone())?;
    if args.record.is_some() {
        factory = factory.with_recorder(recorder.clone());
    }

    let host = config.host.clone();
    let mut wlc = Controller::new(config, factory)?;
    wlc.connect()
        .await
        .with_context(|| format!("connecting to {host}"))?;

    let result = wlc.harvest_inventory().await;
    wlc.logout().await;
    let aps = result.context("harvesting inventory")?;

    println!("{}", aps.len());
    println!("{}", inventory_to_json(&aps)?);

    if let Some(path) = args.record {
        fs::write(&path, recorder.to_jsonl()?)
            .with_context(|| format!("writing recording to {}", path.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> Args {
        let mut argv = vec![
            "harvest", "--host", "10.0.0.5", "--user", "admin", "--password", "secret", "--port",
            "2222", "--pool-size", "3",
        ];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).expect("valid args")
    }

    #[test]
    fn flags_build_controller_config() {
        let args = parse(&["--record", "session.jsonl"]);
        let config = args.controller_config().expect("config");

        assert_eq!(config.device_addr(), "admin@10.0.0.5:2222");
        assert_eq!(config.pool_size, 3);
        assert_eq!(config.api_concurrency, 4);
        assert_eq!(args.record, Some(PathBuf::from("session.jsonl")));
    }

    #[test]
    fn zero_pool_size_is_rejected() {
        let args = parse(&["--pool-size", "0"]);
        assert!(args.controller_config().is_err());
    }

    #[test]
    fn non_numeric_port_fails_to_parse() {
        let result = Args::try_parse_from([
            "harvest", "--host", "wlc", "--user", "a", "--password", "b", "--port", "ssh",
        ]);
        assert!(result.is_err());
    }
}
