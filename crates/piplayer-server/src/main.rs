use std::time::Duration;

use piplayer_proto::config::Config;
use piplayer_server::ServerHandle;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().unwrap_or_default();

    let log_dir = config.paths.log_dir.clone();
    std::fs::create_dir_all(&log_dir)?;
    let log_path = log_dir.join("server.log");
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    let log_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "info,piplayer_server=debug,tower_http=warn,hyper=warn".to_string());
    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(log_filter.as_str())
        .with_ansi(false)
        .init();

    eprintln!("piplayer-server log: {}", log_path.display());

    let server = &config.server;
    std::fs::create_dir_all(&server.content_dir)?;
    let addr = format!("{}:{}", server.bind_address, server.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("serving {} on {}", server.content_dir.display(), addr);

    let handle = ServerHandle::spawn(
        listener,
        server.content_dir.clone(),
        Duration::from_secs(server.rescan_interval_secs),
    )
    .await?;
    eprintln!("piplayer-server listening on {}", handle.base_url());

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    handle.shutdown().await;
    Ok(())
}
