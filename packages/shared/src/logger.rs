//! Logging setup utilities.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber with the specified default log level.
///
/// Both the library crates of the workspace and the binary itself log at
/// `default_log_level`. The level can be overridden using the `RUST_LOG`
/// environment variable.
///
/// # Arguments
///
/// * `binary_name` - The name of the binary (e.g., "roulette-server")
/// * `default_log_level` - The default log level (e.g., "debug", "info")
///
/// # Examples
///
/// ```no_run
/// use roulette_shared::logger::setup_logger;
///
/// setup_logger("roulette-server", "info");
/// ```
pub fn setup_logger(binary_name: &str, default_log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter(binary_name, default_log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build the default `EnvFilter` directive string.
fn default_filter(binary_name: &str, default_log_level: &str) -> String {
    ["roulette_shared", "roulette_server", "roulette_client", binary_name]
        .iter()
        .map(|target| format!("{}={}", target.replace('-', "_"), default_log_level))
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_covers_workspace_crates_and_binary() {
        // テスト項目: デフォルトのフィルタがワークスペースの各クレートとバイナリを含む
        // given (前提条件):
        let binary_name = "roulette-server";

        // when (操作):
        let filter = default_filter(binary_name, "debug");

        // then (期待する結果):
        assert!(filter.contains("roulette_server=debug"));
        assert!(filter.contains("roulette_shared=debug"));
        assert!(filter.contains("roulette_client=debug"));
        assert!(!filter.contains('-'));
    }
}
