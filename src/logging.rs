//! tracing subscriber setup shared by every subcommand.
//!
//! The filter comes from `GLENGINE_LOG`, then `RUST_LOG`, then a default level
//! picked by the `-v`/`-q` flags. With `GLENGINE_TRACE=1` (viewer builds only)
//! spans are also written to `trace.json` for chrome://tracing.

use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Env var checked before `RUST_LOG`.
pub const LOG_ENV: &str = "GLENGINE_LOG";

/// Set to `1` to record a Chrome trace.
pub const TRACE_ENV: &str = "GLENGINE_TRACE";

/// Keeps the chrome trace writer alive; dropping it flushes `trace.json`.
#[derive(Default)]
pub struct LogGuard {
    #[cfg(feature = "viewer")]
    _chrome: Option<tracing_chrome::FlushGuard>,
}

/// Default level for a `-v` count minus a `-q` count.
pub fn default_level(verbosity: i8) -> &'static str {
    match verbosity {
        i8::MIN..=-2 => "error",
        -1 => "warn",
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

fn env_filter(verbosity: i8) -> EnvFilter {
    std::env::var(LOG_ENV)
        .ok()
        .or_else(|| std::env::var("RUST_LOG").ok())
        .and_then(|spec| EnvFilter::try_new(spec).ok())
        .unwrap_or_else(|| {
            // wgpu is chatty at info
            EnvFilter::new(format!("{},wgpu_core=warn,wgpu_hal=warn,naga=warn", default_level(verbosity)))
        })
}

/// Install the global subscriber. Calling it twice is harmless; the second call
/// keeps the first subscriber.
pub fn init(verbosity: i8) -> LogGuard {
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(false);
    let registry = tracing_subscriber::registry().with(env_filter(verbosity)).with(fmt_layer);

    #[cfg(feature = "viewer")]
    {
        if std::env::var(TRACE_ENV).ok().as_deref() == Some("1") {
            let (chrome_layer, guard) = tracing_chrome::ChromeLayerBuilder::new().file("trace.json").build();
            if registry.with(chrome_layer).try_init().is_ok() {
                return LogGuard { _chrome: Some(guard) };
            }
            return LogGuard::default();
        }
    }

    let _ = registry.try_init();
    LogGuard::default()
}
