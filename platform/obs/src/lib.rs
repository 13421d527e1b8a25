//! Tracing setup shared by every binary in the workspace.

use anyhow::{Result, anyhow};
use once_cell::sync::OnceCell;
use opentelemetry::trace::TracerProvider;
use opentelemetry_otlp::{Protocol, SpanExporter, WithExportConfig};
use opentelemetry_sdk::{self as sdk, Resource};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: OnceCell<()> = OnceCell::new();

const DEFAULT_FILTER: &str = "info,tower_http=warn,sqlx=warn";

/// Configuration for tracing initialization.
#[derive(Clone, Debug)]
pub struct ObsConfig {
    pub service_name: &'static str,
    pub env_filter: Option<String>,
    pub otlp_endpoint: Option<String>,
}

impl Default for ObsConfig {
    fn default() -> Self {
        Self {
            service_name: "challenges-api",
            env_filter: None,
            otlp_endpoint: None,
        }
    }
}

impl ObsConfig {
    /// Read `RUST_LOG` and `OTLP_ENDPOINT`, falling back to the defaults.
    pub fn from_env() -> Self {
        Self {
            env_filter: std::env::var("RUST_LOG").ok(),
            otlp_endpoint: std::env::var("OTLP_ENDPOINT")
                .ok()
                .filter(|endpoint| !endpoint.trim().is_empty()),
            ..Self::default()
        }
    }

    fn filter(&self) -> String {
        self.env_filter
            .clone()
            .unwrap_or_else(|| DEFAULT_FILTER.to_string())
    }
}

/// Flushes exported spans when dropped. Hold it for the life of `main`.
#[must_use = "dropping the guard immediately stops span export"]
#[derive(Default)]
pub struct ObsGuard {
    provider: Option<sdk::trace::SdkTracerProvider>,
}

impl Drop for ObsGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.provider.take() {
            if let Err(err) = provider.shutdown() {
                eprintln!("failed to flush spans: {err}");
            }
        }
    }
}

/// Install tracing subscribers with optional OTLP exporter.
pub fn init_tracing(config: ObsConfig) -> Result<ObsGuard> {
    if INIT.get().is_some() {
        return Ok(ObsGuard::default());
    }

    let env_filter = EnvFilter::try_new(config.filter())?;
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(false);
    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer);

    let guard = if let Some(endpoint) = config.otlp_endpoint {
        let exporter = SpanExporter::builder()
            .with_http()
            .with_protocol(Protocol::HttpBinary)
            .with_endpoint(endpoint)
            .build()?;

        let resource = Resource::builder()
            .with_service_name(config.service_name)
            .build();

        let provider = sdk::trace::SdkTracerProvider::builder()
            .with_resource(resource)
            .with_batch_exporter(exporter)
            .build();
        let tracer = provider.tracer(config.service_name);

        registry
            .with(tracing_opentelemetry::layer().with_tracer(tracer))
            .try_init()?;
        ObsGuard {
            provider: Some(provider),
        }
    } else {
        registry.try_init()?;
        ObsGuard::default()
    };

    INIT.set(())
        .map_err(|_| anyhow!("tracing already initialized"))?;
    Ok(guard)
}
