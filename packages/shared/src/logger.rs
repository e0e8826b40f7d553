//! Logging setup utilities for the Parley chat backend.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Build the default filter directive applied when `RUST_LOG` is not set.
///
/// Every crate in `targets` gets `default_log_level`; crate names are
/// normalized the way `tracing` reports them (`-` becomes `_`).
pub fn default_filter(targets: &[&str], default_log_level: &str) -> String {
    let mut directives: Vec<String> = targets
        .iter()
        .map(|target| format!("{}={}", target.replace('-', "_"), default_log_level))
        .collect();
    // HTTP request spans emitted by tower-http's TraceLayer
    directives.push(format!("tower_http={}", default_log_level));
    directives.join(",")
}

/// Initialize the tracing subscriber with the specified default log level.
///
/// The log level can be overridden using the `RUST_LOG` environment variable.
///
/// # Arguments
///
/// * `targets` - Crate or binary names to enable (e.g. `["parley-server"]`)
/// * `default_log_level` - The default log level (e.g. "debug", "info", "warn", "error")
///
/// # Examples
///
/// ```no_run
/// use parley_shared::logger::setup_logger;
///
/// setup_logger(&["parley-server"], "info");
/// ```
pub fn setup_logger(targets: &[&str], default_log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter(targets, default_log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_normalizes_crate_names() {
        // テスト項目: クレート名のハイフンがアンダースコアに正規化される
        // given (前提条件):
        let targets = ["parley-server", "parley-shared"];

        // when (操作):
        let filter = default_filter(&targets, "debug");

        // then (期待する結果):
        assert_eq!(
            filter,
            "parley_server=debug,parley_shared=debug,tower_http=debug"
        );
    }

    #[test]
    fn test_default_filter_with_no_targets() {
        // テスト項目: 対象が空でも tower_http のディレクティブは含まれる
        // given (前提条件):
        let targets: [&str; 0] = [];

        // when (操作):
        let filter = default_filter(&targets, "warn");

        // then (期待する結果):
        assert_eq!(filter, "tower_http=warn");
    }
}
