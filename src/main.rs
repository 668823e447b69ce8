use std::sync::Arc;

use clap::Parser;
use snippetbox::auth::TokenVerifier;
use snippetbox::config::{Cli, Config, default_config_dir, default_config_path};
use snippetbox::db::Database;
use snippetbox::handler::{AppState, router};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let args = Cli::parse();

    // With --config the database lives next to the config file,
    // otherwise both live in ~/.snippetbox/
    let (config_path, data_dir) = match args.config_path {
        Some(path) => {
            let path = std::path::PathBuf::from(path);
            let dir = path
                .parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| std::path::PathBuf::from("."));
            (path, dir)
        }
        None => (default_config_path(), default_config_dir()),
    };

    if let Err(e) = std::fs::create_dir_all(&data_dir) {
        eprintln!("failed to create data directory {:?}: {}", data_dir, e);
        std::process::exit(1);
    }

    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    tracing::info!("snippetbox.svc starting");

    let cfg = Config::new(&config_path.to_string_lossy()).unwrap_or_else(|e| {
        tracing::error!(error = %e, path = ?config_path, "failed to load config file");
        std::process::exit(1);
    });
    let db = Arc::new(Database::new(&cfg, &data_dir).await.unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to setup database");
        std::process::exit(1);
    }));

    let webhook_secret: Option<Arc<str>> = cfg.webhook.signing_secret().map(Arc::from);
    if webhook_secret.is_none() {
        tracing::warn!("webhook signing secret not configured, identity webhooks will fail");
    }

    let address = format!("0.0.0.0:{}", cfg.app.get_port());
    let cancellation_token = CancellationToken::new();

    let sync_task = if db.is_synced() {
        let sync_db = db.clone();
        let sync_token = cancellation_token.clone();
        let period = std::time::Duration::from_secs(cfg.app.sync_interval_seconds.max(1));
        Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if let Err(e) = sync_db.sync().await {
                            tracing::warn!(error = %e, "failed to sync replica");
                        }
                    }
                    _ = sync_token.cancelled() => {
                        tracing::info!("replica sync task shutting down");
                        break;
                    }
                }
            }
        }))
    } else {
        None
    };

    let app = router(AppState {
        db,
        auth: Arc::new(TokenVerifier::new(&cfg.auth)),
        webhook_secret,
    });

    let listener = tokio::net::TcpListener::bind(&address).await.unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to setup tcp listener");
        std::process::exit(1);
    });

    tracing::info!("snippetbox.svc running on {}", &address);
    let signal_token = cancellation_token.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            tracing::info!("ctrl+c signal received, preparing to shutdown");
            signal_token.cancel();
        }
    });

    let shutdown_token = cancellation_token.clone();
    let result = axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown_token.cancelled().await })
        .await;
    if let Err(err) = result {
        tracing::error!(error = %err, "server exited with error");
        std::process::exit(1);
    }
    cancellation_token.cancel();

    if let Some(task) = sync_task {
        let _ = task.await;
    }
    tracing::info!("snippetbox.svc going off, graceful shutdown complete");
}
