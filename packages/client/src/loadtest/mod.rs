//! 負荷テスト
//!
//! `stages × clients_per_stage` 人の模擬ユーザーを段階的に起動し、各ユーザーは
//! 接続 → メッセージ送信 → 切断 → 再接続を繰り返します。受信したメッセージは
//! 送信者と連番を検証し、結果はステータス集計タスクが定期的にログに出力します。
//!
//! 接続先は実サーバー (`Connector::Remote`) とプロセス内のマッチメイカー
//! (`Connector::Local`) のどちらも選べます。

mod config;
mod connector;
mod stats;
mod user;

pub use config::LoadTestConfig;
pub use connector::{Connection, Connector, LocalServer};
pub use stats::{RollingAverage, StatsCollector, Status, Totals, collect};
pub use user::{LoadTestClient, Payload, SessionError, single_user};

use std::sync::Arc;

use tokio::{sync::mpsc, task::JoinSet, time::Instant};

/// Run a load test until `config.duration` elapses or Ctrl+C is pressed.
///
/// Returns the totals over the whole run.
pub async fn run_load_test(config: LoadTestConfig, connector: Connector) -> Totals {
    let config = Arc::new(config);
    let connector = Arc::new(connector);
    let epoch = Instant::now();

    let (status_tx, status_rx) = mpsc::unbounded_channel();
    let collector = tokio::spawn(collect(status_rx, config.report_interval));

    let mut users = JoinSet::new();
    {
        let start_users = async {
            for stage in 1..=config.stages {
                tracing::info!(
                    "Starting stage {}/{} with {} users",
                    stage,
                    config.stages,
                    config.clients_per_stage
                );
                for _ in 0..config.clients_per_stage {
                    users.spawn(single_user(
                        connector.clone(),
                        config.clone(),
                        status_tx.clone(),
                        epoch,
                    ));
                }
                if stage < config.stages {
                    tokio::time::sleep(config.stage_interval).await;
                }
            }
            // Users keep reconnecting on their own from here on.
            std::future::pending::<()>().await
        };

        let stop = async {
            match config.duration {
                Some(duration) => tokio::time::sleep(duration).await,
                None => {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        tracing::error!("Failed to listen for Ctrl+C: {}", e);
                        std::future::pending::<()>().await
                    }
                }
            }
        };

        tokio::select! {
            _ = start_users => {}
            _ = stop => tracing::info!("Stopping load test"),
        }
    }

    users.shutdown().await;
    drop(status_tx);

    match collector.await {
        Ok(totals) => totals,
        Err(e) => {
            tracing::error!("Status collector failed: {}", e);
            Totals::default()
        }
    }
}
