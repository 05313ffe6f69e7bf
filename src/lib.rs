pub mod agent_engine;
pub mod analysis;
pub mod auth;
pub mod config;
pub mod errors;
pub mod executor;
pub mod perception;

#[cfg(test)]
pub mod testing;

/// Install the global fmt subscriber. `RUST_LOG` wins when set; otherwise
/// `info`, or `debug` when asked for.
pub fn init_tracing(debug: bool) {
    let fallback = if debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(fallback)),
        )
        .init();
}
