//! Gyrorace coordinator server.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin gyrorace-server
//! cargo run --bin gyrorace-server -- --ws-addr 0.0.0.0:8080 --http-addr 0.0.0.0:3000
//! ```

use std::time::Duration;

use clap::Parser;
use gyrorace::prelude::*;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "gyrorace-server")]
#[command(about = "Realtime room coordinator for gyroscope racing games", long_about = None)]
struct Args {
    /// Address for WebSocket clients
    #[arg(long, default_value = "127.0.0.1:8080")]
    ws_addr: String,

    /// Address for the HTTP score API
    #[arg(long, default_value = "127.0.0.1:3000")]
    http_addr: String,

    /// Seconds after which the sweeper evicts a room
    #[arg(long, default_value_t = 7_200)]
    room_ttl_secs: u64,

    /// Seconds between sweeps
    #[arg(long, default_value_t = 1_800)]
    sweep_interval_secs: u64,

    /// Age rooms from creation instead of last activity
    #[arg(long)]
    expire_since_creation: bool,

    /// Close connections silent for this many seconds (off by default)
    #[arg(long)]
    idle_timeout_secs: Option<u64>,

    /// Seconds between WebSocket pings used to detect dead clients
    #[arg(long, default_value_t = 30)]
    ping_interval_secs: u64,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// Installs the tracing subscriber. `RUST_LOG` overrides `default_level`.
fn setup_logger(default_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "gyrorace={default_level},gyrorace_room={default_level},\
                     gyrorace_server={default_level},tower_http={default_level}"
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    setup_logger(&args.log_level);

    let room_config = RoomConfig {
        room_ttl: Duration::from_secs(args.room_ttl_secs),
        sweep_interval: Duration::from_secs(args.sweep_interval_secs.max(1)),
        expiry: if args.expire_since_creation {
            ExpiryPolicy::SinceCreation
        } else {
            ExpiryPolicy::Inactivity
        },
        ..RoomConfig::default()
    };

    let mut builder = GyroraceServer::builder()
        .bind(&args.ws_addr)
        .http_bind(&args.http_addr)
        .room_config(room_config)
        .ping_interval(Duration::from_secs(args.ping_interval_secs.max(1)));
    if let Some(secs) = args.idle_timeout_secs {
        builder = builder.idle_timeout(Duration::from_secs(secs));
    }

    let server = match builder.build().await {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("failed to start server: {}", e);
            std::process::exit(1);
        }
    };

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };
    if let Err(e) = server.run_until(shutdown).await {
        tracing::error!("server error: {}", e);
        std::process::exit(1);
    }
}
