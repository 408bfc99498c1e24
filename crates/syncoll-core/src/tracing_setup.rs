//! Tracing subscriber initialization shared by the CLI and by tests that
//! want readable output. Mirrors the teacher pipeline's pattern of a single
//! `init()` call driven by `RUST_LOG`, falling back to a sensible default.

use tracing_subscriber::{fmt, EnvFilter};

/// Initializes a global `tracing` subscriber from `RUST_LOG`, defaulting to
/// `info` for this workspace's crates and `warn` for dependencies. Safe to
/// call more than once; later calls are no-ops.
pub fn init() {
    init_with_default("warn,syncoll_core=info,syncoll_pipeline=info,syncoll_cli=info")
}

/// As [`init`], but `default_level` (e.g. `"debug"`, taken from the CLI's
/// `--log-level` flag) is used as this workspace's crates' level when
/// `RUST_LOG` is unset, rather than the hardcoded `info` default.
pub fn init_with_default(default_level: &str) {
    let fallback = format!("warn,syncoll_core={default_level},syncoll_pipeline={default_level},syncoll_cli={default_level}");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    let _ = fmt().with_env_filter(filter).with_target(true).try_init();
}
