use std::collections::HashMap;

use opentelemetry::trace::TracerProvider as TracerProviderTrait;
use opentelemetry::KeyValue;
use opentelemetry_otlp::{WithExportConfig, WithHttpConfig};
use opentelemetry_sdk::trace::TracerProvider;
use opentelemetry_sdk::Resource;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Used when `RUST_LOG` is unset: our crates at `info`, dependencies
/// (hyper, reqwest, h2 chatter from every probe) at `warn`.
pub const DEFAULT_FILTER: &str =
    "warn,edgernetes_control=info,edgernetes_meta=info,edgernetes_common=info";

const SERVICE_NAMESPACE: &str = "edgernetes";

/// Identity and export target for one process.
#[derive(Debug, Clone, Default)]
pub struct TelemetryConfig<'a> {
    pub service_name: &'a str,
    pub service_version: &'a str,
    /// OTLP/HTTP traces endpoint; `None` keeps logs on stdout only.
    pub otlp_endpoint: Option<&'a str>,
    /// Sent as a bearer token with every export request.
    pub otlp_token: Option<&'a str>,
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

fn resource(cfg: &TelemetryConfig<'_>) -> Resource {
    Resource::new([
        KeyValue::new("service.name", cfg.service_name.to_string()),
        KeyValue::new("service.version", cfg.service_version.to_string()),
        KeyValue::new("service.namespace", SERVICE_NAMESPACE),
    ])
}

fn export_headers(token: Option<&str>) -> HashMap<String, String> {
    let mut headers = HashMap::new();
    if let Some(token) = token.filter(|t| !t.is_empty()) {
        headers.insert("Authorization".to_string(), format!("Bearer {token}"));
    }
    headers
}

/// Installs the global subscriber.
///
/// Returns the tracer provider when OTLP export is on; call `shutdown()` on
/// it before exit so buffered spans are flushed.
pub fn init_tracing(cfg: &TelemetryConfig<'_>) -> Option<TracerProvider> {
    let fmt_layer = tracing_subscriber::fmt::layer();

    let Some(endpoint) = cfg.otlp_endpoint else {
        tracing_subscriber::registry()
            .with(env_filter())
            .with(fmt_layer)
            .init();
        return None;
    };

    let exporter = match opentelemetry_otlp::SpanExporter::builder()
        .with_http()
        .with_endpoint(endpoint)
        .with_headers(export_headers(cfg.otlp_token))
        .build()
    {
        Ok(e) => e,
        Err(err) => {
            eprintln!("failed to create OTLP exporter: {err}, falling back to stdout only");
            tracing_subscriber::registry()
                .with(env_filter())
                .with(fmt_layer)
                .init();
            return None;
        }
    };

    let provider = TracerProvider::builder()
        .with_batch_exporter(exporter, opentelemetry_sdk::runtime::Tokio)
        .with_resource(resource(cfg))
        .build();

    let otel_layer =
        tracing_opentelemetry::layer().with_tracer(provider.tracer(cfg.service_name.to_string()));

    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt_layer)
        .with(otel_layer)
        .init();

    tracing::info!(
        endpoint,
        service_name = cfg.service_name,
        service_version = cfg.service_version,
        "OTLP tracing enabled"
    );
    Some(provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_parses() {
        let filter = EnvFilter::try_new(DEFAULT_FILTER).unwrap();
        assert_eq!(
            filter.max_level_hint(),
            Some(tracing_subscriber::filter::LevelFilter::INFO)
        );
    }

    #[test]
    fn test_resource_identifies_service() {
        let res = resource(&TelemetryConfig {
            service_name: "edgernetes-control",
            service_version: "0.1.0",
            ..Default::default()
        });
        let get = |k: &'static str| res.get(opentelemetry::Key::from_static_str(k));
        let name = |k| get(k).map(|v| v.to_string());
        assert_eq!(name("service.name").as_deref(), Some("edgernetes-control"));
        assert_eq!(name("service.version").as_deref(), Some("0.1.0"));
        assert_eq!(name("service.namespace").as_deref(), Some("edgernetes"));
    }

    #[test]
    fn test_export_headers() {
        assert!(export_headers(None).is_empty());
        assert!(export_headers(Some("")).is_empty());
        assert_eq!(
            export_headers(Some("s3cret")).get("Authorization").map(String::as_str),
            Some("Bearer s3cret")
        );
    }
}
