//! Qdice Table Server
//!
//! Loads the table list and maps, then ticks every table until ctrl-c.
//! Published messages are logged; a real deployment swaps in its own
//! gateway and score store.

use std::sync::Arc;

use anyhow::Context;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use qdice::{
    config::{Settings, TablesFile},
    network::{BroadcastGateway, MemoryScoreStore, Scheduler, TableServer, TableStore},
    SystemClock, VERSION,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = Settings::load();
    info!("Qdice server v{}", VERSION);
    info!("Tick period: {:?}, turn: {}s", settings.engine.tick_period, settings.engine.turn_seconds);

    let tables_file = TablesFile::load(&settings.tables_path)
        .with_context(|| format!("loading {}", settings.tables_path.display()))?;
    let tables = TableStore::load(
        &tables_file.tables,
        &settings.maps_dir,
        settings.seed_salt,
        settings.engine.chat_backlog,
    )
    .with_context(|| format!("loading maps from {}", settings.maps_dir.display()))?;

    let gateway = BroadcastGateway::new(1024);
    let mut outbound = gateway.subscribe();
    tokio::spawn(async move {
        loop {
            match outbound.recv().await {
                Ok((topic, message)) => match message.to_json() {
                    Ok(json) => debug!(%topic, "{}", json),
                    Err(err) => warn!(%topic, "Unserializable message: {}", err),
                },
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Publish log lagged by {} messages", n);
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let server = TableServer::new(
        Arc::new(tables),
        Arc::new(gateway),
        Arc::new(MemoryScoreStore::new()),
        Arc::new(SystemClock),
        settings.engine.clone(),
    );

    if settings.bot_tables {
        for tag in server.tables().list().await {
            server.seat_bots(&tag).await?;
        }
    }

    let scheduler = Scheduler::new(server);
    let started = scheduler.start_all().await?;
    info!("Ticking {} tables", started);

    tokio::signal::ctrl_c().await.context("waiting for ctrl-c")?;
    info!("Shutting down");
    scheduler.stop_all().await;
    Ok(())
}
