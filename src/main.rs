use tracing::{error, info};

use plugin_forge::{logging, Config, Server, VERSION};

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = Config::from_env()?;

    logging::init(&config.logging);
    info!("Starting plugin_forge {}", VERSION);
    config.log_summary();

    // Accept loops are async; generation runs on the blocking pool.
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async_main(config))
}

async fn async_main(config: Config) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let server = Server::bind(config)?;

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!("Server error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!(
                "Shutting down ({} active connections)...",
                server.active_connections()
            );
        }
    }

    server.trigger_shutdown();
    if server.wait_for_drain(server.drain_timeout()).await {
        info!("All connections drained");
    }

    Ok(())
}
