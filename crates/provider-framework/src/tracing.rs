/// Initializes structured logging for a provider process.
///
/// Verbosity comes from `RUST_LOG`, defaulting to `info`:
/// - `RUST_LOG=debug` - include per-call phase transitions
/// - `RUST_LOG=provider_framework=trace` - everything from the engine only
///
/// Secret property values render as `<secret>` in every event, so raising the
/// level never exposes them.
///
/// Safe to call more than once; later calls leave the first subscriber in place.
pub fn setup_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .try_init();
}
