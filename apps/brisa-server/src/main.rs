use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context as _;
use brisa_server::{create_app, docs, http::HttpConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    brisa_otel::init("info");
    if let Err(err) = run().await {
        error!("{err:#}");
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let app = create_app(None).context("failed to assemble application")?;

    if let Some(out) = std::env::var_os("OPENAPI_OUT").filter(|v| !v.is_empty()) {
        let path = PathBuf::from(out);
        docs::export(app.openapi(), &path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!(path = %path.display(), "openapi document written");
        return Ok(());
    }

    let http = HttpConfig::from_settings(&app.settings().http)?;
    let profile = app.settings().name.clone();
    let (router, mut lifecycle) = app.into_parts();

    lifecycle
        .run_around(|| async move {
            let listener = tokio::net::TcpListener::bind(http.addr)
                .await
                .with_context(|| format!("failed to bind {}", http.addr))?;
            info!(addr = %http.addr, profile = %profile, "brisa listening");

            axum::serve(
                listener,
                router.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("http server exited with error")
        })
        .await
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                error!("failed to install SIGTERM handler: {err}");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
    info!("shutdown signal received");
}
