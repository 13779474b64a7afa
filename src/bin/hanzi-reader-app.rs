use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use axum::response::Html;
use clap::Parser;
use tower_http::services::{ServeDir, ServeFile};

use hanzi_reader::app::kv::{KvStore, LocalFsKvStore, MemoryKvStore};
use hanzi_reader::app::library::Library;
use hanzi_reader::app::routes::{AppState, router};
use hanzi_reader::app::sync::SyncService;
use hanzi_reader::writer::OutputLayout;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct AppArgs {
    #[arg(long, default_value = "127.0.0.1:8080")]
    addr: SocketAddr,

    /// Scrape output directory to serve lessons from.
    #[arg(long, default_value = "output")]
    output_dir: PathBuf,

    /// Directory for sync records. Without it, records live in memory.
    #[arg(long, env = "HANZI_READER_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Static web assets directory (serve if exists).
    #[arg(long, default_value = "web/dist")]
    web_dir: PathBuf,
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return std::process::ExitCode::FAILURE;
    }
    std::process::ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    hanzi_reader::logging::init("info,tower_http=debug").context("init logging")?;

    let args = AppArgs::parse();
    tracing::info!(?args, "starting hanzi-reader-app");

    let store: Arc<dyn KvStore> = match &args.data_dir {
        Some(dir) => {
            tracing::info!(dir = %dir.display(), "using local filesystem sync store");
            Arc::new(LocalFsKvStore::new(dir))
        }
        None => {
            tracing::warn!("no data dir configured; sync records will not survive a restart");
            Arc::new(MemoryKvStore::new())
        }
    };
    let state = AppState {
        library: Arc::new(Library::new(OutputLayout::new(&args.output_dir))),
        sync: SyncService::new(store),
    };

    let mut app = router(state);

    let web_index = args.web_dir.join("index.html");
    if web_index.exists() {
        let static_files = ServeDir::new(&args.web_dir).not_found_service(ServeFile::new(web_index));
        app = app.fallback_service(static_files);
    } else {
        app = app.fallback(|| async {
            Html(
                r#"<!doctype html>
<html>
  <head><meta charset="utf-8"><title>hanzi-reader</title></head>
  <body>
    <h1>hanzi-reader</h1>
    <p>web assets not found. Build the reader into <code>web/dist</code> or run a dev server.</p>
  </body>
</html>
"#,
            )
        });
    }

    let listener = tokio::net::TcpListener::bind(args.addr)
        .await
        .map_err(|err| anyhow::anyhow!("bind {}: {err}", args.addr))?;
    tracing::info!(addr = %args.addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
