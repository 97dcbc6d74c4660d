use anyhow::Context;
use common::TelemetryGuard;
use gateway::{AppState, DetectSettings, config::get_configuration, logging::setup_logging, router};
use inference::{Detector, backend::ort::OrtBackend};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = get_configuration().context("failed to load configuration")?;

    let _telemetry = match config.otel_endpoint.as_ref() {
        Some(endpoint) => Some(TelemetryGuard::init(
            "gateway",
            endpoint,
            config.log_level,
            config.environment,
        )?),
        None => {
            setup_logging(&config);
            None
        }
    };

    tracing::info!(
        config = ?config,
        environment = config.environment.as_str(),
        "Loaded configuration"
    );

    tracing::info!(model_path = %config.detector.model_path, "Loading detection model");
    let detector = Detector::<OrtBackend>::load(&config.detector).with_context(|| {
        format!(
            "failed to load detection model from {}",
            config.detector.model_path
        )
    })?;
    tracing::info!("Model loaded successfully");

    if config.debug_upload_path.is_some() {
        tracing::warn!(
            path = ?config.debug_upload_path,
            "Debug upload dump enabled, every request overwrites this file"
        );
    }

    let state = AppState::new(
        Arc::new(detector),
        DetectSettings {
            confidence_threshold: config.confidence_threshold,
            max_upload_bytes: config.max_upload_bytes,
            debug_upload_path: config.debug_upload_path.clone(),
        },
    );
    let app = router(state);

    let addr = config.address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!("Food detection API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
