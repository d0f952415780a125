use {
    std::sync::Once,
    tracing::Level,
    tracing_subscriber::{EnvFilter, fmt::writer::MakeWriterExt},
};

/// Initializes the tracing setup that is shared between the binaries.
/// `env_filter` has similar syntax to env_logger. It is documented at
/// https://docs.rs/tracing-subscriber/0.3/tracing_subscriber/filter/struct.EnvFilter.html
///
/// Events at `stderr_threshold` or more severe go to stderr, everything else
/// to stdout. `Level::TRACE` sends all events to stderr.
///
/// Panics if a global subscriber is already installed.
pub fn initialize(env_filter: &str, stderr_threshold: Level) {
    set_tracing_subscriber(env_filter, stderr_threshold);
}

/// Like [`initialize`], but can be called multiple times in a row. Later calls
/// are ignored.
///
/// Useful for tests.
pub fn initialize_reentrant(env_filter: &str) {
    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        set_tracing_subscriber(env_filter, Level::ERROR);
    });
}

fn set_tracing_subscriber(env_filter: &str, stderr_threshold: Level) {
    let writer = std::io::stderr
        .with_max_level(stderr_threshold)
        .or_else(std::io::stdout);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(env_filter))
        .with_writer(writer)
        .with_ansi(false)
        .init();
}
