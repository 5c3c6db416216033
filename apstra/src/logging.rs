//! tracing subscriber set-up

use std::sync::Once;
use tracing::Level;

static INIT: Once = Once::new();

/// Level named by a `TF_LOG` value; unset or unrecognised means INFO
pub fn level_from_tf_log(value: Option<&str>) -> Level {
    match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
        Some("trace") => Level::TRACE,
        Some("debug") => Level::DEBUG,
        Some("warn") => Level::WARN,
        Some("error") => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Installs the global fmt subscriber. Later calls do nothing.
pub fn init() {
    INIT.call_once(|| {
        let level = level_from_tf_log(std::env::var("TF_LOG").ok().as_deref());
        // another subscriber may already be installed by the host
        let _ = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_writer(std::io::stderr)
            .try_init();
        tracing::debug!(%level, "logging initialized");
    });
}
