// This is free and unencumbered software released into the public domain.

//! Logging bootstrap.
//!
//! On Android, `tracing` records reach logcat through its `log` bridge and
//! `android_logger`. Elsewhere a `tracing-subscriber` fmt subscriber is
//! installed, filtered by `RUST_LOG`.

use std::sync::Once;

/// Logcat tag.
pub const LOG_TAG: &str = "edgedetection";

static INIT: Once = Once::new();

/// Installs the logger. Only the first call has any effect.
pub fn init() {
    INIT.call_once(install);
}

#[cfg(all(feature = "android", target_os = "android"))]
fn install() {
    android_logger::init_once(
        android_logger::Config::default()
            .with_max_level(log::LevelFilter::Info)
            .with_tag(LOG_TAG),
    );

    std::panic::set_hook(Box::new(|info| {
        let payload = info
            .payload()
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());

        let location = info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_else(|| "unknown".to_string());

        log::error!("PANIC at {}: {}", location, payload);
    }));
}

#[cfg(all(target_os = "android", not(feature = "android")))]
fn install() {}

#[cfg(not(target_os = "android"))]
fn install() {
    use tracing_subscriber::EnvFilter;

    // Examples: RUST_LOG=debug, RUST_LOG=edgedetection=trace
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .try_init();
}
