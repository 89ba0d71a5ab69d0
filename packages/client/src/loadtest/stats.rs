//! Status collection for load tests.
//!
//! Simulated users report what happens to them as `Status` values; a single
//! collector task aggregates them and logs a summary every report interval.
//! Window counters are reset after each summary, the totals are kept.

use std::time::Duration;

use tokio::{
    sync::mpsc::UnboundedReceiver,
    time::{Instant, interval_at},
};

/// Something that happened to a simulated user
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Status {
    Connect,
    Disconnect,
    MessageSent,
    MessageReceived,
    /// Time between sending and receiving one message
    Delay(Duration),
    /// The connection closed underneath a user
    BrokenChannel,
    /// The server sent something a correct server never would
    ProtocolError,
}

/// Counters of one reporting window or of the whole run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Totals {
    pub connects: u64,
    pub disconnects: u64,
    pub messages_sent: u64,
    pub messages_received: u64,
    pub broken_channels: u64,
    pub protocol_errors: u64,
}

impl Totals {
    fn record(&mut self, status: Status) {
        match status {
            Status::Connect => self.connects += 1,
            Status::Disconnect => self.disconnects += 1,
            Status::MessageSent => self.messages_sent += 1,
            Status::MessageReceived => self.messages_received += 1,
            Status::BrokenChannel => self.broken_channels += 1,
            Status::ProtocolError => self.protocol_errors += 1,
            Status::Delay(_) => {}
        }
    }
}

/// Incrementally updated mean.
#[derive(Debug, Default)]
pub struct RollingAverage {
    avg: f64,
    n: u64,
}

impl RollingAverage {
    pub fn add(&mut self, value: f64) {
        let n = self.n as f64;
        self.avg = self.avg * n / (n + 1.0) + value / (n + 1.0);
        self.n += 1;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn get(&self) -> f64 {
        self.avg
    }
}

/// Aggregates status reports.
#[derive(Debug)]
pub struct StatsCollector {
    started: Instant,
    window_started: Instant,
    window: Totals,
    total: Totals,
    active: u64,
    /// Average delay of the current window in milliseconds
    avg_delay: RollingAverage,
}

impl StatsCollector {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            started: now,
            window_started: now,
            window: Totals::default(),
            total: Totals::default(),
            active: 0,
            avg_delay: RollingAverage::default(),
        }
    }

    pub fn record(&mut self, status: Status) {
        match status {
            Status::Connect => self.active += 1,
            Status::Disconnect => self.active = self.active.saturating_sub(1),
            Status::Delay(delay) => self.avg_delay.add(delay.as_secs_f64() * 1000.0),
            _ => {}
        }
        self.window.record(status);
        self.total.record(status);
    }

    pub fn active(&self) -> u64 {
        self.active
    }

    pub fn totals(&self) -> Totals {
        self.total
    }

    /// Summarize the current window and start a new one.
    pub fn report(&mut self) -> String {
        let now = Instant::now();
        let window_secs = (now - self.window_started).as_secs_f64();
        let send_rate = if window_secs > 0.0 {
            self.window.messages_sent as f64 / window_secs
        } else {
            0.0
        };

        let summary = format!(
            "elapsed {:.1}s; avg delay {:.4}ms; {} active; {} connects; {} disconnects; \
             {} msgs sent ({:.2} msgs/s); {} msgs received; {} broken channels; \
             {} protocol errors",
            (now - self.started).as_secs_f64(),
            self.avg_delay.get(),
            self.active,
            self.window.connects,
            self.window.disconnects,
            self.window.messages_sent,
            send_rate,
            self.window.messages_received,
            self.window.broken_channels,
            self.window.protocol_errors,
        );

        self.window = Totals::default();
        self.avg_delay.reset();
        self.window_started = now;
        summary
    }
}

impl Default for StatsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Collect status reports until every sender is gone, logging a summary
/// every `report_interval`. Returns the totals of the whole run.
pub async fn collect(mut status: UnboundedReceiver<Status>, report_interval: Duration) -> Totals {
    let mut collector = StatsCollector::new();
    let mut ticker = interval_at(Instant::now() + report_interval, report_interval);

    loop {
        tokio::select! {
            received = status.recv() => match received {
                Some(status) => collector.record(status),
                None => break,
            },
            _ = ticker.tick() => tracing::info!("{}", collector.report()),
        }
    }

    tracing::info!("Final window: {}", collector.report());
    collector.totals()
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;

    #[test]
    fn test_rolling_average() {
        // テスト項目: 移動平均が追加された値の平均になり、リセットで 0 に戻る
        // given (前提条件):
        let mut average = RollingAverage::default();

        // when (操作):
        for value in [1.0, 2.0, 3.0, 6.0] {
            average.add(value);
        }

        // then (期待する結果):
        assert!((average.get() - 3.0).abs() < 1e-9);
        average.reset();
        assert_eq!(average.get(), 0.0);
    }

    #[test]
    fn test_collector_tracks_active_users() {
        // テスト項目: 接続と切断からアクティブユーザー数が計算される
        // given (前提条件):
        let mut collector = StatsCollector::new();

        // when (操作):
        collector.record(Status::Connect);
        collector.record(Status::Connect);
        collector.record(Status::Disconnect);

        // then (期待する結果):
        assert_eq!(collector.active(), 1);
        assert_eq!(collector.totals().connects, 2);
        assert_eq!(collector.totals().disconnects, 1);
    }

    #[test]
    fn test_report_resets_window_but_keeps_totals() {
        // テスト項目: サマリー出力後にウィンドウの値はリセットされ、累計は保持される
        // given (前提条件):
        let mut collector = StatsCollector::new();
        collector.record(Status::MessageSent);
        collector.record(Status::MessageReceived);
        collector.record(Status::Delay(Duration::from_millis(2)));

        // when (操作):
        let first = collector.report();
        let second = collector.report();

        // then (期待する結果):
        assert!(first.contains("1 msgs sent"));
        assert!(first.contains("avg delay 2.0000ms"));
        assert!(second.contains("0 msgs sent"));
        assert_eq!(collector.totals().messages_sent, 1);
        assert_eq!(collector.totals().messages_received, 1);
    }

    #[tokio::test]
    async fn test_collect_returns_totals_when_senders_are_gone() {
        // テスト項目: 送信側がすべて閉じると累計を返して終了する
        // given (前提条件):
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(Status::Connect).unwrap();
        tx.send(Status::BrokenChannel).unwrap();
        tx.send(Status::ProtocolError).unwrap();
        drop(tx);

        // when (操作):
        let totals = collect(rx, Duration::from_secs(3600)).await;

        // then (期待する結果):
        assert_eq!(
            totals,
            Totals {
                connects: 1,
                broken_channels: 1,
                protocol_errors: 1,
                ..Default::default()
            }
        );
    }
}
