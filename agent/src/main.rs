//! Pulse child - heartbeat sender for process-watchdog testing
//!
//! Reads its instance parameters from an INI file, then reports liveness to
//! the supervisor on `localhost:<udp_port>` until its role says otherwise:
//! - `crash`: exits with status 0 once the observation ceiling is reached
//! - `noheartbeat` / `noping`: goes silent for a bounded window, then resumes
//! - anything else: keeps beating

use anyhow::{Context, Result};
use clap::Parser;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use pulse_core::{parse_index, parse_role, HeartbeatSimulator, InstanceConfig, InstanceLayout, IniConfig, Palette};
use pulse_env::{EnvError, TokioContext, UdpSink};

/// Pause between attempts to open the heartbeat socket.
const CONNECT_RETRY: Duration = Duration::from_secs(1);

#[derive(Parser, Debug)]
#[command(name = "pulse-child")]
#[command(about = "Send heartbeats to a process watchdog, then misbehave on cue", long_about = None)]
struct Args {
    /// 1-based instance index (defaults to 1)
    #[arg(allow_hyphen_values = true)]
    index: Option<String>,

    /// Failure role: crash, noheartbeat, noping
    role: Option<String>,

    /// INI file holding the [processWatchdog] settings
    #[arg(short, long, default_value = "config.ini")]
    config: PathBuf,

    /// Instance layout (auto, flat, sections)
    #[arg(long, default_value = "auto")]
    layout: InstanceLayout,

    /// Disable per-instance console colors
    #[arg(long)]
    no_color: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if args.verbose { "debug" } else { "info" }));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_ansi(!args.no_color)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    let program = std::env::args().next().unwrap_or_else(|| "pulse-child".into());
    info!("{}: Application started", program);

    let (index, index_err) = parse_index(args.index.as_deref());
    if let Some(e) = index_err {
        warn!("{}", e);
    }
    info!("Index set to {}", index);

    let (role, role_err) = parse_role(args.role.as_deref());
    if let Some(e) = role_err {
        warn!("{}", e);
    }
    info!("Role set to {}", role);

    // Config errors abort before any socket or timer exists
    let store = IniConfig::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    let resolved = InstanceConfig::resolve(&store, index, args.layout)
        .with_context(|| format!("resolving instance {} from {}", index, args.config.display()))?;
    for warning in &resolved.warnings {
        warn!("{}", warning);
    }
    let config = resolved.config;

    info!("UDP_PORT set to {}", config.udp_port);
    info!("Heartbeat delay set to {}", config.heartbeat_delay);
    info!("Heartbeat interval set to {}", config.heartbeat_interval);
    info!("Process name set to {} ({} layout)", config.name, resolved.layout);

    let palette = if args.no_color {
        Palette::plain()
    } else {
        Palette::for_index(index)
    };

    let port = config.udp_port;
    let sink = connect_with_retry(|| UdpSink::connect_localhost(port), CONNECT_RETRY).await;

    let mut simulator =
        HeartbeatSimulator::new(TokioContext::shared(), sink, config, role).with_palette(palette);
    let exit = simulator.run().await;

    // Release the socket before leaving
    drop(simulator);
    std::process::exit(exit.code());
}

/// Keeps trying to open the sink; only configuration errors end startup.
async fn connect_with_retry<T, F, Fut>(mut connect: F, pause: Duration) -> T
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, EnvError>>,
{
    let mut attempt: u64 = 1;
    loop {
        match connect().await {
            Ok(sink) => return sink,
            Err(e) => {
                warn!("Heartbeat socket unavailable (attempt {}): {}", attempt, e);
                attempt += 1;
                tokio::time::sleep(pause).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positional_arguments() {
        let args = Args::try_parse_from(["pulse-child", "3", "noping"]).unwrap();
        assert_eq!(args.index.as_deref(), Some("3"));
        assert_eq!(args.role.as_deref(), Some("noping"));
        assert_eq!(args.config, PathBuf::from("config.ini"));
        assert_eq!(args.layout, InstanceLayout::Auto);
    }

    #[test]
    fn test_no_arguments_uses_defaults() {
        let args = Args::try_parse_from(["pulse-child"]).unwrap();
        assert_eq!(parse_index(args.index.as_deref()), (1, None));
        assert_eq!(parse_role(args.role.as_deref()).0, pulse_core::Role::Crash);
    }

    #[test]
    fn test_negative_index_reaches_fallback() {
        let args = Args::try_parse_from(["pulse-child", "-2"]).unwrap();
        let (index, err) = parse_index(args.index.as_deref());
        assert_eq!(index, 1);
        assert!(err.is_some());
    }

    #[tokio::test]
    async fn test_connect_retries_until_socket_opens() {
        let attempts = std::cell::Cell::new(0u32);
        let opened = connect_with_retry(
            || {
                attempts.set(attempts.get() + 1);
                let attempt = attempts.get();
                async move {
                    if attempt < 3 {
                        Err(EnvError::resolve("localhost:9"))
                    } else {
                        Ok(attempt)
                    }
                }
            },
            Duration::from_millis(1),
        )
        .await;
        assert_eq!(opened, 3);
    }

    #[tokio::test]
    async fn test_connect_localhost_first_try() {
        let sink = connect_with_retry(|| UdpSink::connect_localhost(9), Duration::from_millis(1)).await;
        assert_eq!(sink.target().port(), 9);
        assert!(sink.target().ip().is_loopback());
    }

    #[test]
    fn test_layout_flag() {
        let args =
            Args::try_parse_from(["pulse-child", "--layout", "sections", "-c", "demo.ini", "2"]).unwrap();
        assert_eq!(args.layout, InstanceLayout::AppSections);
        assert_eq!(args.config, PathBuf::from("demo.ini"));
        assert!(Args::try_parse_from(["pulse-child", "--layout", "tree"]).is_err());
    }
}
