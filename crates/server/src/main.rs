//! Intake Agent Server Entry Point

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use intake_agent_config::{load_settings, Settings};
use intake_agent_core::{PromptStore, SpanExporter, VadConfig, VadHandle};
use intake_agent_server::{create_router, AppState};
use intake_agent_session::SimulatedVoiceConnector;
use intake_agent_store::{DispatchApiClient, HttpSpanExporter, PromptApiClient, RecordApiClient};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration first (tracing init needs the observability settings)
    let config_path = std::env::var("INTAKE_AGENT_CONFIG").ok();
    let config = load_settings(config_path.as_deref())?;

    init_tracing(&config);

    tracing::info!("Starting Intake Agent Server v{}", env!("CARGO_PKG_VERSION"));

    // Single VAD load for the whole process; sessions share the handle
    // read-only.
    let vad = load_vad(&config);

    let timeout = Duration::from_secs(config.stores.request_timeout_secs);
    let records = Arc::new(RecordApiClient::new(&config.stores.record_store_url, timeout)?);

    let prompts: Option<Arc<dyn PromptStore>> = match &config.stores.prompt_store_url {
        Some(url) => Some(Arc::new(PromptApiClient::new(url, timeout)?)),
        None => {
            tracing::info!("no prompt store configured, remote prompt tier disabled");
            None
        }
    };

    let spans: Option<Arc<dyn SpanExporter>> = match &config.stores.span_collector_url {
        Some(url) => Some(Arc::new(HttpSpanExporter::new(url, timeout)?)),
        None => {
            tracing::info!("no span collector configured, span export disabled");
            None
        }
    };

    let dispatcher = Arc::new(DispatchApiClient::new(
        &config.stores.dispatch_url,
        config.stores.outbound_trunk_id.clone(),
        timeout,
    )?);

    // The real voice pipeline is an external collaborator; local runs get
    // the simulated channel with an automatic hangup.
    let voice = Arc::new(SimulatedVoiceConnector::with_auto_hangup(Duration::from_secs(30)));

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);
    let state = AppState::new(config, records, prompts, spans, dispatcher, voice, vad);
    let app = create_router(state);

    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {e}");
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
                tracing::error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}

/// Initialize tracing with optional OpenTelemetry integration.
///
/// When `observability.otlp_endpoint` is configured, traces are exported to
/// the specified OTLP collector.
fn init_tracing(config: &Settings) {
    use opentelemetry_otlp::WithExportConfig;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &config.observability.log_level;
        format!("intake_agent={},tower_http=debug", level).into()
    });

    let subscriber = tracing_subscriber::registry().with(env_filter);

    let fmt_layer = if config.observability.log_json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };

    if let Some(otlp_endpoint) = &config.observability.otlp_endpoint {
        if config.observability.tracing_enabled {
            match opentelemetry_otlp::new_pipeline()
                .tracing()
                .with_exporter(
                    opentelemetry_otlp::new_exporter()
                        .tonic()
                        .with_endpoint(otlp_endpoint),
                )
                .with_trace_config(opentelemetry_sdk::trace::Config::default().with_resource(
                    opentelemetry_sdk::Resource::new(vec![
                        opentelemetry::KeyValue::new("service.name", "intake-agent"),
                        opentelemetry::KeyValue::new(
                            "service.version",
                            env!("CARGO_PKG_VERSION"),
                        ),
                    ]),
                ))
                .install_batch(opentelemetry_sdk::runtime::Tokio)
            {
                Ok(tracer) => {
                    let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);
                    subscriber.with(fmt_layer).with(otel_layer).init();

                    tracing::info!(
                        endpoint = %otlp_endpoint,
                        "OpenTelemetry tracing enabled, exporting to OTLP endpoint"
                    );
                    return;
                }
                Err(e) => {
                    eprintln!(
                        "Failed to initialize OpenTelemetry: {}. Falling back to console logging.",
                        e
                    );
                }
            }
        }
    }

    subscriber.with(fmt_layer).init();
}

/// Load the VAD model once. A missing file is downgraded to the disabled
/// handle so local runs without model assets still work.
fn load_vad(config: &Settings) -> VadHandle {
    match VadHandle::load(&config.agent.vad_model_path, VadConfig::default()) {
        Ok(handle) => handle,
        Err(e) => {
            tracing::warn!(
                path = %config.agent.vad_model_path,
                "VAD model not loaded ({e}), continuing with disabled handle"
            );
            VadHandle::disabled()
        }
    }
}
