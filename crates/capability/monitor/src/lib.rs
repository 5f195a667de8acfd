//! 监控循环：按注册顺序轮询设备，每轮一批记录交给 Sink 提交。
//!
//! ```text
//! poll_once ──► flush ──► sleep(poll_interval) ──► poll_once ...
//! ```
//!
//! 单任务串行执行，sleep 是唯一的挂起点；轮询与提交不重叠。

use domain::{RawFrame, Record};
use ems_device::{Device, DeviceError, ReplayReader};
use ems_storage::{Sink, SinkError};
use ems_telemetry::{
    new_cycle_id, record_acquisition_failure, record_cycle_completed, record_cycle_failed,
    record_cycle_started, record_device_skipped, record_flush_latency_ms,
    record_malformed_frame, record_records_collected, record_records_committed,
    record_sink_failure,
};
use std::convert::Infallible;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{Instrument, error, info, info_span, warn};

/// 单个设备失败时的处理策略。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// 任一设备失败即中止本轮
    #[default]
    AbortCycle,
    /// 跳过失败设备，其余记录照常提交
    SkipDevice,
}

/// 监控参数。
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub poll_interval: Duration,
    pub failure_policy: FailurePolicy,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            failure_policy: FailurePolicy::AbortCycle,
        }
    }
}

/// 设备注册错误。
#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    #[error("device name is empty")]
    EmptyName,
    #[error("device {0} is already registered")]
    DuplicateName(String),
}

/// 监控错误。
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("registration error: {0}")]
    Registration(#[from] RegistrationError),
    #[error("no devices registered")]
    NoDevices,
    #[error("device {device} failed: {source}")]
    Device {
        device: String,
        #[source]
        source: DeviceError,
    },
    #[error("sink error: {0}")]
    Sink(#[from] SinkError),
    #[error("replay source {path}: {source}")]
    ReplaySource {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// 文件回放结果。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub frames: usize,
    pub records: usize,
}

pub struct Monitor {
    devices: Vec<Box<dyn Device>>,
    sink: Arc<dyn Sink>,
    config: MonitorConfig,
}

impl Monitor {
    pub fn new(sink: Arc<dyn Sink>) -> Self {
        Self::with_config(sink, MonitorConfig::default())
    }

    pub fn with_config(sink: Arc<dyn Sink>, config: MonitorConfig) -> Self {
        Self {
            devices: Vec::new(),
            sink,
            config,
        }
    }

    /// 注册设备；注册顺序即轮询顺序。
    pub fn register(&mut self, device: Box<dyn Device>) -> Result<(), RegistrationError> {
        let name = device.identity().name.clone();
        if name.is_empty() {
            return Err(RegistrationError::EmptyName);
        }
        if self.devices.iter().any(|d| d.identity().name == name) {
            return Err(RegistrationError::DuplicateName(name));
        }
        info!(
            target: "ems.monitor",
            device = %name,
            model = %device.identity().model,
            location = %device.identity().location,
            port = %device.identity().port,
            "device_registered"
        );
        self.devices.push(device);
        Ok(())
    }

    pub fn device_names(&self) -> Vec<&str> {
        self.devices
            .iter()
            .map(|d| d.identity().name.as_str())
            .collect()
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// 按注册顺序轮询全部设备，返回同序记录。
    pub async fn poll_once(&mut self) -> Result<Vec<Record>, MonitorError> {
        let mut records = Vec::with_capacity(self.devices.len());
        for device in self.devices.iter_mut() {
            match device.get_data().await {
                Ok(record) => records.push(record),
                Err(err) => {
                    let name = device.identity().name.clone();
                    note_device_failure(&name, &err);
                    match self.config.failure_policy {
                        FailurePolicy::AbortCycle => {
                            return Err(MonitorError::Device {
                                device: name,
                                source: err,
                            });
                        }
                        FailurePolicy::SkipDevice => {
                            record_device_skipped();
                            warn!(target: "ems.monitor", device = %name, "device_skipped");
                        }
                    }
                }
            }
        }
        record_records_collected(records.len() as u64);
        Ok(records)
    }

    /// 打开一次 Sink 会话，按序 add 后 commit 一次。
    pub async fn flush(&self, records: Vec<Record>) -> Result<usize, MonitorError> {
        let started = Instant::now();
        let mut session = self.sink.open_session().await.inspect_err(|err| {
            record_sink_failure();
            error!(target: "ems.monitor", error = %err, "sink_session_failed");
        })?;
        for record in records {
            session.add(record);
        }
        let queued = session.pending();
        match session.commit().await {
            Ok(written) => {
                record_records_committed(written as u64);
                record_flush_latency_ms(started.elapsed().as_millis() as u64);
                info!(target: "ems.monitor", written, "flush_committed");
                Ok(written)
            }
            Err(err) => {
                record_sink_failure();
                error!(target: "ems.monitor", queued, error = %err, "flush_failed");
                Err(err.into())
            }
        }
    }

    /// 执行一轮：poll_once + flush，返回提交条数。
    pub async fn run_cycle(&mut self) -> Result<usize, MonitorError> {
        let span = info_span!("cycle", cycle_id = %new_cycle_id());
        self.cycle().instrument(span).await
    }

    async fn cycle(&mut self) -> Result<usize, MonitorError> {
        record_cycle_started();
        let result = match self.poll_once().await {
            Ok(records) => self.flush(records).await,
            Err(err) => Err(err),
        };
        match &result {
            Ok(_) => record_cycle_completed(),
            Err(err) => {
                record_cycle_failed();
                error!(target: "ems.monitor", error = %err, "cycle_failed");
            }
        }
        result
    }

    /// 主循环：轮询、提交、休眠，直到某一轮失败。
    pub async fn run_forever(&mut self) -> Result<Infallible, MonitorError> {
        if self.devices.is_empty() {
            return Err(MonitorError::NoDevices);
        }
        info!(
            target: "ems.monitor",
            devices = self.devices.len(),
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            "monitor_started"
        );
        loop {
            self.run_cycle().await?;
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    /// 逐帧回放文件：每帧注入第一个设备，取数后立即单条提交，不休眠。
    pub async fn run_from_replay_source(
        &mut self,
        path: impl AsRef<Path>,
    ) -> Result<ReplaySummary, MonitorError> {
        let path = path.as_ref();
        if self.devices.is_empty() {
            return Err(MonitorError::NoDevices);
        }
        let span = info_span!("replay", path = %path.display());
        self.replay(path).instrument(span).await
    }

    async fn replay(&mut self, path: &Path) -> Result<ReplaySummary, MonitorError> {
        let source_error = |source| MonitorError::ReplaySource {
            path: path.display().to_string(),
            source,
        };
        let mut reader = ReplayReader::open(path).await.map_err(source_error)?;
        let mut summary = ReplaySummary::default();

        while let Some(frame) = reader.next_frame().await.map_err(source_error)? {
            summary.frames += 1;
            let record = match self.replay_frame(frame).await {
                Ok(record) => record,
                Err(err) if self.config.failure_policy == FailurePolicy::SkipDevice => {
                    record_device_skipped();
                    warn!(target: "ems.monitor", frame = summary.frames, error = %err, "replay_frame_skipped");
                    continue;
                }
                Err(err) => return Err(err),
            };
            record_records_collected(1);
            summary.records += self.flush(vec![record]).await?;
        }

        info!(
            target: "ems.monitor",
            frames = summary.frames,
            records = summary.records,
            "replay_finished"
        );
        Ok(summary)
    }

    async fn replay_frame(&mut self, frame: RawFrame) -> Result<Record, MonitorError> {
        let device = self.devices.first_mut().ok_or(MonitorError::NoDevices)?;
        let result = match device.inject_frame(frame) {
            Ok(()) => device.get_data().await,
            Err(err) => Err(DeviceError::from(err)),
        };
        result.map_err(|source| {
            let name = device.identity().name.clone();
            note_device_failure(&name, &source);
            MonitorError::Device {
                device: name,
                source,
            }
        })
    }
}

fn note_device_failure(device: &str, err: &DeviceError) {
    match err {
        DeviceError::Acquisition(_) => record_acquisition_failure(),
        DeviceError::MalformedFrame { .. } => record_malformed_frame(),
    }
    error!(target: "ems.monitor", device = %device, error = %err, "device_read_failed");
}
