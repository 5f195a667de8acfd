//! 追踪、周期 ID 与计数指标。

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::{EnvFilter, fmt};

/// 基础指标快照。
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsSnapshot {
    pub cycles_started: u64,
    pub cycles_completed: u64,
    pub cycles_failed: u64,
    pub records_collected: u64,
    pub records_committed: u64,
    pub acquisition_failures: u64,
    pub malformed_frames: u64,
    pub devices_skipped: u64,
    pub sink_failures: u64,
    pub flush_latency_ms_total: u64,
    pub flush_latency_ms_count: u64,
}

/// 基础指标。
pub struct TelemetryMetrics {
    cycles_started: AtomicU64,
    cycles_completed: AtomicU64,
    cycles_failed: AtomicU64,
    records_collected: AtomicU64,
    records_committed: AtomicU64,
    acquisition_failures: AtomicU64,
    malformed_frames: AtomicU64,
    devices_skipped: AtomicU64,
    sink_failures: AtomicU64,
    flush_latency_ms_total: AtomicU64,
    flush_latency_ms_count: AtomicU64,
}

impl TelemetryMetrics {
    pub fn new() -> Self {
        Self {
            cycles_started: AtomicU64::new(0),
            cycles_completed: AtomicU64::new(0),
            cycles_failed: AtomicU64::new(0),
            records_collected: AtomicU64::new(0),
            records_committed: AtomicU64::new(0),
            acquisition_failures: AtomicU64::new(0),
            malformed_frames: AtomicU64::new(0),
            devices_skipped: AtomicU64::new(0),
            sink_failures: AtomicU64::new(0),
            flush_latency_ms_total: AtomicU64::new(0),
            flush_latency_ms_count: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            cycles_started: self.cycles_started.load(Ordering::Relaxed),
            cycles_completed: self.cycles_completed.load(Ordering::Relaxed),
            cycles_failed: self.cycles_failed.load(Ordering::Relaxed),
            records_collected: self.records_collected.load(Ordering::Relaxed),
            records_committed: self.records_committed.load(Ordering::Relaxed),
            acquisition_failures: self.acquisition_failures.load(Ordering::Relaxed),
            malformed_frames: self.malformed_frames.load(Ordering::Relaxed),
            devices_skipped: self.devices_skipped.load(Ordering::Relaxed),
            sink_failures: self.sink_failures.load(Ordering::Relaxed),
            flush_latency_ms_total: self.flush_latency_ms_total.load(Ordering::Relaxed),
            flush_latency_ms_count: self.flush_latency_ms_count.load(Ordering::Relaxed),
        }
    }
}

impl Default for TelemetryMetrics {
    fn default() -> Self {
        Self::new()
    }
}

static METRICS: OnceLock<TelemetryMetrics> = OnceLock::new();

/// 获取全局指标实例。
pub fn metrics() -> &'static TelemetryMetrics {
    METRICS.get_or_init(TelemetryMetrics::new)
}

/// 初始化 tracing（默认 info）。
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}

/// 生成新的轮询周期 ID。
pub fn new_cycle_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// 记录轮询周期开始次数。
pub fn record_cycle_started() {
    metrics().cycles_started.fetch_add(1, Ordering::Relaxed);
}

/// 记录轮询周期完成次数。
pub fn record_cycle_completed() {
    metrics().cycles_completed.fetch_add(1, Ordering::Relaxed);
}

/// 记录轮询周期失败次数。
pub fn record_cycle_failed() {
    metrics().cycles_failed.fetch_add(1, Ordering::Relaxed);
}

/// 记录采集到的记录数。
pub fn record_records_collected(count: u64) {
    metrics()
        .records_collected
        .fetch_add(count, Ordering::Relaxed);
}

/// 记录已提交的记录数。
pub fn record_records_committed(count: u64) {
    metrics()
        .records_committed
        .fetch_add(count, Ordering::Relaxed);
}

/// 记录采集失败次数。
pub fn record_acquisition_failure() {
    metrics()
        .acquisition_failures
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录帧格式错误次数。
pub fn record_malformed_frame() {
    metrics().malformed_frames.fetch_add(1, Ordering::Relaxed);
}

/// 记录被跳过的设备次数。
pub fn record_device_skipped() {
    metrics().devices_skipped.fetch_add(1, Ordering::Relaxed);
}

/// 记录 Sink 提交失败次数。
pub fn record_sink_failure() {
    metrics().sink_failures.fetch_add(1, Ordering::Relaxed);
}

/// 记录提交延迟（毫秒）。
pub fn record_flush_latency_ms(latency_ms: u64) {
    let metrics = metrics();
    metrics
        .flush_latency_ms_total
        .fetch_add(latency_ms, Ordering::Relaxed);
    metrics
        .flush_latency_ms_count
        .fetch_add(1, Ordering::Relaxed);
}
