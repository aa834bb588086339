use std::time::Duration;

use clap::Parser;
use potsync::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// WebSocket listen address.
    #[arg(long, env = "POTSYNC_BIND", default_value = "0.0.0.0:8080")]
    bind: String,

    /// Address for `GET /health`. Disabled when unset.
    #[arg(long, env = "POTSYNC_HEALTH_BIND")]
    health_bind: Option<String>,

    /// Maximum distinct players per room.
    #[arg(long, env = "POTSYNC_MAX_PLAYERS", default_value_t = 10)]
    max_players: usize,

    /// Seconds an untouched room survives.
    #[arg(long, env = "POTSYNC_ROOM_TTL_SECS", default_value_t = 24 * 60 * 60)]
    room_ttl_secs: u64,

    /// Chips for a joiner who doesn't ask for an amount.
    #[arg(long, env = "POTSYNC_STARTING_CHIPS", default_value_t = 1000)]
    starting_chips: u64,

    /// Seconds of client silence before a connection is closed.
    #[arg(long, env = "POTSYNC_IDLE_TIMEOUT_SECS", default_value_t = 15)]
    idle_timeout_secs: u64,

    /// Seconds between sweeps of expired rooms from the store.
    #[arg(long, env = "POTSYNC_SWEEP_INTERVAL_SECS", default_value_t = 60)]
    sweep_interval_secs: u64,
}

impl Args {
    fn room_config(&self) -> RoomConfig {
        RoomConfig {
            max_players: self.max_players,
            room_ttl: Duration::from_secs(self.room_ttl_secs),
            starting_chips: self.starting_chips,
            ..RoomConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), PotsyncError> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut builder = PotsyncServerBuilder::new()
        .bind(&args.bind)
        .room_config(args.room_config())
        .idle_timeout(Duration::from_secs(args.idle_timeout_secs))
        .sweep_interval(Duration::from_secs(args.sweep_interval_secs));
    if let Some(addr) = &args.health_bind {
        builder = builder.health_bind(addr);
    }

    let server = builder.build(MemoryStore::new()).await?;
    tracing::info!(
        bind = %args.bind,
        health = ?args.health_bind,
        max_players = args.max_players,
        "starting potsync server"
    );
    server.run().await
}
