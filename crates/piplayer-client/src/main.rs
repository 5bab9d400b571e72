use piplayer_client::command::HttpCommandChannel;
use piplayer_client::render::LogSurface;
use piplayer_client::session::{next_update, Session, SessionEvent, SessionOptions, SessionUpdate};
use piplayer_proto::config::Config;
use piplayer_proto::surface::Surface;
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Load config ──────────────────────────────────────────────────────────
    let mut config = Config::load().unwrap_or_default();
    // `piplayer-client control` overrides the configured surface.
    if let Some(arg) = std::env::args().nth(1) {
        match Surface::parse(&arg) {
            Some(surface) => config.client.surface = surface,
            None => anyhow::bail!("unknown surface {:?} (expected viewer, control or menu)", arg),
        }
    }

    // ── Logging ──────────────────────────────────────────────────────────────
    let log_dir = config.paths.log_dir.clone();
    std::fs::create_dir_all(&log_dir)?;
    let log_path = log_dir.join(format!("client-{}.log", config.client.surface));
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    // Allow RUST_LOG override; keep HTTP client internals quiet by default.
    let log_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        "info,piplayer_client=debug,hyper_util=warn,reqwest=warn,hyper=warn".to_string()
    });
    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(log_filter.as_str())
        .with_ansi(false)
        .init();

    eprintln!("piplayer-client log: {}", log_path.display());
    tracing::info!("piplayer-client starting ({} surface)", config.client.surface);

    // ── Channels ─────────────────────────────────────────────────────────────
    let commands =
        HttpCommandChannel::new(&config.client.server_url, config.client.request_timeout())?;
    let (event_tx, event_rx) = mpsc::channel::<SessionEvent>(1024);

    let session = Session::new(
        SessionOptions::from_config(&config.client),
        commands,
        LogSurface,
        event_tx.clone(),
    );

    // ── Status line on stderr ────────────────────────────────────────────────
    let mut updates = session.subscribe();
    tokio::spawn(async move {
        while let Some(update) = next_update(&mut updates).await {
            if let SessionUpdate::Link(status) = update {
                eprintln!("link: {:?}", status);
            }
        }
    });

    // ── Ctrl-C → Shutdown ────────────────────────────────────────────────────
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = event_tx.send(SessionEvent::Shutdown).await;
        }
    });

    session.run(event_rx).await
}
