//! 运行指标收集模块
//!
//! 发送、轮询、关联与 verdict 的 Prometheus 指标，以及内存中的运行统计聚合。

use std::collections::HashMap;

use contracts::{RunSummary, Verdict, VerdictStatus};
use metrics::{
    counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit,
};

/// Register descriptions with the installed recorder
pub fn describe_metrics() {
    describe_counter!("verifier_sends_total", "Stimulus sends by sender and status");
    describe_histogram!(
        "verifier_send_latency_ms",
        Unit::Milliseconds,
        "Latency of a single send"
    );
    describe_counter!("verifier_sends_skipped_total", "Rows skipped without dispatch");
    describe_gauge!("verifier_sends_in_flight", "Sends currently holding a permit");
    describe_counter!("verifier_polls_total", "Stream polls by source");
    describe_counter!("verifier_records_polled_total", "Raw records returned by polls");
    describe_counter!("verifier_poll_errors_total", "Polls that failed with a transport error");
    describe_counter!(
        "verifier_records_discarded_total",
        "Records older than the run-start watermark"
    );
    describe_counter!("verifier_decode_failures_total", "Records that failed to decode");
    describe_counter!("verifier_correlations_total", "Correlation outcomes per event");
    describe_counter!("verifier_windows_closed_total", "Closed windows by stop reason");
    describe_histogram!(
        "verifier_window_duration_ms",
        Unit::Milliseconds,
        "Watermark to window close"
    );
    describe_gauge!("verifier_rows_expired", "Rows still pending when the window closed");
    describe_counter!("verifier_verdicts_total", "Verdicts by status");
    describe_gauge!("verifier_rows_total", "Rows in the last run");
    describe_gauge!("verifier_rows_passed", "OK verdicts in the last run");
    describe_gauge!("verifier_rows_failed", "MISMATCH plus SEND_FAILED in the last run");
    describe_histogram!(
        "verifier_run_duration_ms",
        Unit::Milliseconds,
        "Whole run duration"
    );
}

/// 记录一次发送结果与耗时
pub fn record_send(sender: &str, success: bool, latency_ms: f64) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "verifier_sends_total",
        "sender" => sender.to_string(),
        "status" => status
    )
    .increment(1);
    histogram!("verifier_send_latency_ms", "sender" => sender.to_string()).record(latency_ms);
}

/// 记录被跳过的行 (disabled / dry run)
pub fn record_send_skipped(count: usize) {
    if count > 0 {
        counter!("verifier_sends_skipped_total").increment(count as u64);
    }
}

/// 记录当前并发发送数
pub fn record_sends_in_flight(in_flight: usize) {
    gauge!("verifier_sends_in_flight").set(in_flight as f64);
}

/// 记录一次轮询拿到的记录数
pub fn record_records_polled(source: &str, count: usize) {
    counter!("verifier_polls_total", "source" => source.to_string()).increment(1);
    if count > 0 {
        counter!("verifier_records_polled_total", "source" => source.to_string())
            .increment(count as u64);
    }
}

/// 记录轮询传输错误
pub fn record_poll_error(source: &str) {
    counter!("verifier_poll_errors_total", "source" => source.to_string()).increment(1);
}

/// 记录早于 run_start 被丢弃的记录
pub fn record_discarded_before_watermark(source: &str) {
    counter!("verifier_records_discarded_total", "source" => source.to_string()).increment(1);
}

/// 记录解码失败
pub fn record_decode_failure(source: &str) {
    counter!("verifier_decode_failures_total", "source" => source.to_string()).increment(1);
}

/// 记录关联结果 (matched_sender / matched_subject / appended / unmatched / conflict)
pub fn record_correlation(outcome: &'static str) {
    counter!("verifier_correlations_total", "outcome" => outcome).increment(1);
}

/// 记录窗口关闭
pub fn record_window_closed(reason: &'static str, elapsed_ms: f64, expired: usize) {
    counter!("verifier_windows_closed_total", "reason" => reason).increment(1);
    histogram!("verifier_window_duration_ms").record(elapsed_ms);
    gauge!("verifier_rows_expired").set(expired as f64);
}

/// 记录 verdict 分布与运行摘要
pub fn record_run_summary(summary: &RunSummary, verdicts: &[Verdict], duration_ms: f64) {
    for verdict in verdicts {
        counter!("verifier_verdicts_total", "status" => verdict.status.as_str()).increment(1);
    }
    gauge!("verifier_rows_total").set(summary.total as f64);
    gauge!("verifier_rows_passed").set(summary.passed as f64);
    gauge!("verifier_rows_failed").set(summary.failed as f64);
    histogram!("verifier_run_duration_ms").record(duration_ms);
}

/// 运行统计聚合器
///
/// 在内存中聚合指标，便于在控制台输出摘要。
#[derive(Debug, Clone, Default)]
pub struct RunStatsAggregator {
    /// 发送成功数
    pub sends_ok: u64,

    /// 发送失败数
    pub sends_failed: u64,

    /// 跳过数
    pub skipped: u64,

    /// 发送耗时统计 (毫秒)
    pub send_latency: RunningStats,

    /// 各状态 verdict 数
    pub verdict_counts: HashMap<VerdictStatus, u64>,

    /// 窗口关闭原因
    pub stop_reason: Option<String>,

    /// 窗口耗时 (毫秒)
    pub window_ms: Option<f64>,
}

impl RunStatsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 累加一次发送
    pub fn record_send(&mut self, success: bool, latency_ms: f64) {
        if success {
            self.sends_ok += 1;
        } else {
            self.sends_failed += 1;
        }
        self.send_latency.push(latency_ms);
    }

    pub fn record_skipped(&mut self, count: usize) {
        self.skipped += count as u64;
    }

    pub fn record_window(&mut self, reason: &str, elapsed_ms: f64) {
        self.stop_reason = Some(reason.to_string());
        self.window_ms = Some(elapsed_ms);
    }

    /// 累加 verdict 分布
    pub fn update_verdicts(&mut self, verdicts: &[Verdict]) {
        for verdict in verdicts {
            *self.verdict_counts.entry(verdict.status).or_insert(0) += 1;
        }
    }

    /// 生成摘要
    pub fn summary(&self) -> RunStatsSummary {
        let attempted = self.sends_ok + self.sends_failed;
        RunStatsSummary {
            sends_ok: self.sends_ok,
            sends_failed: self.sends_failed,
            skipped: self.skipped,
            send_failure_rate: if attempted > 0 {
                self.sends_failed as f64 / attempted as f64 * 100.0
            } else {
                0.0
            },
            send_latency_ms: StatsSummary::from(&self.send_latency),
            verdict_counts: VERDICT_ORDER
                .iter()
                .map(|status| (*status, self.verdict_counts.get(status).copied().unwrap_or(0)))
                .collect(),
            stop_reason: self.stop_reason.clone(),
            window_ms: self.window_ms,
        }
    }
}

const VERDICT_ORDER: [VerdictStatus; 6] = [
    VerdictStatus::Ok,
    VerdictStatus::Mismatch,
    VerdictStatus::NotFound,
    VerdictStatus::Conflict,
    VerdictStatus::SendFailed,
    VerdictStatus::Skipped,
];

/// 运行统计摘要
#[derive(Debug, Clone, Default)]
pub struct RunStatsSummary {
    pub sends_ok: u64,
    pub sends_failed: u64,
    pub skipped: u64,
    pub send_failure_rate: f64,
    pub send_latency_ms: StatsSummary,
    /// 固定顺序的 verdict 计数
    pub verdict_counts: Vec<(VerdictStatus, u64)>,
    pub stop_reason: Option<String>,
    pub window_ms: Option<f64>,
}

impl std::fmt::Display for RunStatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Run Metrics Summary ===")?;
        writeln!(
            f,
            "Sends: {} ok, {} failed ({:.2}%), {} skipped",
            self.sends_ok, self.sends_failed, self.send_failure_rate, self.skipped
        )?;
        writeln!(f, "Send latency (ms): {}", self.send_latency_ms)?;
        if let (Some(reason), Some(ms)) = (&self.stop_reason, self.window_ms) {
            writeln!(f, "Window: closed by {} after {:.0}ms", reason, ms)?;
        }
        writeln!(f, "Verdicts:")?;
        for (status, count) in &self.verdict_counts {
            writeln!(f, "  {}: {}", status, count)?;
        }
        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    /// 样本数量
    pub fn count(&self) -> u64 {
        self.count
    }

    /// 均值
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    /// 标准差
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();
        for value in [1.0, 2.0, 3.0, 4.0, 5.0] {
            stats.push(value);
        }

        assert_eq!(stats.count(), 5);
        assert!((stats.mean() - 3.0).abs() < 1e-10);
        assert!((stats.variance() - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_aggregator_counts_sends_and_verdicts() {
        let mut aggregator = RunStatsAggregator::new();
        aggregator.record_send(true, 10.0);
        aggregator.record_send(true, 30.0);
        aggregator.record_send(false, 5.0);
        aggregator.record_skipped(2);
        aggregator.update_verdicts(&[
            Verdict::bare("TC-1", VerdictStatus::Ok),
            Verdict::bare("TC-2", VerdictStatus::Ok),
            Verdict::bare("TC-3", VerdictStatus::SendFailed),
        ]);

        let summary = aggregator.summary();
        assert_eq!(summary.sends_ok, 2);
        assert_eq!(summary.sends_failed, 1);
        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.send_latency_ms.count, 3);
        assert_eq!(summary.verdict_counts[0], (VerdictStatus::Ok, 2));
        assert_eq!(summary.verdict_counts[4], (VerdictStatus::SendFailed, 1));
    }

    #[test]
    fn test_summary_display() {
        let mut aggregator = RunStatsAggregator::new();
        aggregator.record_send(false, 1.0);
        aggregator.record_window("timeout", 600_000.0);

        let output = aggregator.summary().to_string();
        assert!(output.contains("0 ok, 1 failed (100.00%)"));
        assert!(output.contains("closed by timeout"));
        assert!(output.contains("NOT_FOUND: 0"));
    }
}
