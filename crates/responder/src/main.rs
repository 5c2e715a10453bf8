use anyhow::Context;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use flora_infra::ResponderConfig;
use flora_responder::{app, services::AppServices};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    flora_observability::init();

    let config = ResponderConfig::from_env().context("invalid configuration")?;
    let services = AppServices::start(&config)
        .await
        .context("failed to start responder")?;

    let addr = config.http.socket_addr();
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "health endpoint listening");

    let (stop_http, http_stopped) = oneshot::channel::<()>();
    let router = app::build_app(services.health());
    let server = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async {
                let _ = http_stopped.await;
            })
            .await
    });

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;
    tracing::info!("shutdown requested");

    let _ = stop_http.send(());
    match server.await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => tracing::error!(error = %err, "http server failed"),
        Err(err) => tracing::error!(error = %err, "http server task failed"),
    }

    if services.consumer_finished() {
        tracing::warn!("consumer had already stopped before shutdown");
    }
    services.shutdown().await.context("broker shutdown failed")?;

    tracing::info!("responder stopped");
    Ok(())
}
