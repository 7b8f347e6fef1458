use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{Resource, runtime, trace as sdktrace};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber: env filter, JSON fmt output and, when an
/// endpoint is given, an OTLP span exporter.
pub fn init_tracing(service_name: &str, log_level: &str, otlp_endpoint: Option<&str>) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    let endpoint = otlp_endpoint.filter(|e| !e.is_empty());

    let mut otlp_failure = None;
    let tracer = endpoint.and_then(|endpoint| {
        let otlp_exporter = opentelemetry_otlp::new_exporter()
            .tonic()
            .with_endpoint(endpoint);

        opentelemetry_otlp::new_pipeline()
            .tracing()
            .with_exporter(otlp_exporter)
            .with_trace_config(sdktrace::config().with_resource(Resource::new(vec![
                KeyValue::new("service.name", service_name.to_string()),
            ])))
            .install_batch(runtime::Tokio)
            .map_err(|e| otlp_failure = Some(e))
            .ok()
    });

    // Option<Layer> is itself a layer, so one chain covers both cases.
    let telemetry = tracer.map(|tracer| tracing_opentelemetry::layer().with_tracer(tracer));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(telemetry)
        .with(
            tracing_subscriber::fmt::layer()
                .with_file(true)
                .with_line_number(true)
                .json()
                .flatten_event(true),
        )
        .init();

    // Keep logging to stdout; losing span export is not fatal.
    if let Some(e) = otlp_failure {
        tracing::error!(
            service = %service_name,
            endpoint = endpoint.unwrap_or_default(),
            error = %e,
            "Failed to initialize OTLP tracer, continuing without span export"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // The global subscriber can only be installed once per process.
    #[test]
    fn installs_subscriber_without_otlp_endpoint() {
        init_tracing("service-core-test", "debug", Some(""));
        tracing::info!(check = true, "subscriber installed");
        assert!(tracing::dispatcher::has_been_set());
    }
}
