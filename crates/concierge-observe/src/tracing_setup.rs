//! Subscriber setup for the `concierge` binary.
//!
//! Logs go to stderr through a `fmt` layer that reports span close timing,
//! so every model call and tool execution shows its duration. With `--otel`
//! the same spans are also exported through OpenTelemetry (stdout exporter).
//!
//! ```no_run
//! concierge_observe::tracing_setup::init_tracing(false, false).unwrap();
//! // ... run ...
//! concierge_observe::tracing_setup::shutdown_tracing();
//! ```

use std::sync::OnceLock;

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Instrumentation scope reported on exported spans.
const TRACER_NAME: &str = "concierge";

static TRACER_PROVIDER: OnceLock<SdkTracerProvider> = OnceLock::new();

/// Failure to install the global subscriber.
#[derive(Debug, thiserror::Error)]
#[error("tracing subscriber already installed: {0}")]
pub struct TracingInitError(#[from] tracing_subscriber::util::TryInitError);

/// Directives used when `RUST_LOG` is unset.
///
/// Our crates follow `verbose`; HTTP and SQL internals stay quieter.
fn default_directives(verbose: bool) -> &'static str {
    if verbose {
        "warn,concierge=debug,concierge_core=debug,concierge_infra=debug,concierge_api=debug,tower_http=debug"
    } else {
        "warn,concierge=info,concierge_core=info,concierge_infra=info,concierge_api=info"
    }
}

/// Install the global subscriber. Call once, before any work starts.
///
/// `RUST_LOG` overrides the default directives.
pub fn init_tracing(enable_otel: bool, verbose: bool) -> Result<(), TracingInitError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .with_span_events(FmtSpan::CLOSE);

    // `Option<Layer>` is itself a layer; `None` adds nothing.
    let otel_layer = enable_otel.then(|| {
        let provider = SdkTracerProvider::builder()
            .with_simple_exporter(opentelemetry_stdout::SpanExporter::default())
            .build();
        let tracer = provider.tracer(TRACER_NAME);
        let _ = TRACER_PROVIDER.set(provider.clone());
        opentelemetry::global::set_tracer_provider(provider);
        tracing_opentelemetry::layer().with_tracer(tracer)
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .with(otel_layer)
        .try_init()?;

    Ok(())
}

/// Flush and stop the span exporter. No-op when OpenTelemetry was not enabled.
pub fn shutdown_tracing() {
    let Some(provider) = TRACER_PROVIDER.get() else {
        return;
    };
    if let Err(e) = provider.shutdown() {
        eprintln!("Warning: span exporter shutdown failed: {e}");
    }
}
