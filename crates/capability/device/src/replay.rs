//! 回放设备
//!
//! 以录制的遥测文件代替硬件，时间戳来自合成时钟：
//! - 时钟从构造时刻前 23 小时开始，每次读取推进 10 分钟
//! - 帧 = 文件中的非空行；空行在任何模式下都不占位
//! - 两种互斥的取帧方式：
//!   - 游标模式：设备自己记录游标，每次读取后按步幅前进（默认 2，即隔行回放）
//!   - 注入模式：由外部驱动通过 `set_fake_frame` 逐帧推入

use crate::error::{AcquisitionError, DeviceError};
use crate::{Device, decode_frame};
use async_trait::async_trait;
use domain::{DeviceConfig, RawFrame, Record, now_epoch_ms};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tracing::debug;

/// 回放参数。
#[derive(Debug, Clone)]
pub struct ReplaySettings {
    /// 时钟起点相对当前时刻的回退量
    pub lookback: Duration,
    /// 每次读取时钟的推进量
    pub step: Duration,
    /// 游标模式每次读取后前进的帧数
    pub stride: usize,
}

impl Default for ReplaySettings {
    fn default() -> Self {
        Self {
            lookback: Duration::from_secs(23 * 60 * 60),
            step: Duration::from_secs(10 * 60),
            stride: 2,
        }
    }
}

impl ReplaySettings {
    fn sanitized(mut self) -> Self {
        if self.stride == 0 {
            self.stride = 1;
        }
        if self.step.is_zero() {
            self.step = Duration::from_millis(1);
        }
        self
    }
}

/// 合成时钟。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayClock {
    current_ms: i64,
    step_ms: i64,
}

impl ReplayClock {
    /// 超出 i64 毫秒范围的步长按 `i64::MAX` 处理，不回绕成负数。
    pub fn starting_at(start_ms: i64, step: Duration) -> Self {
        Self {
            current_ms: start_ms,
            step_ms: duration_ms(step),
        }
    }

    /// 起点为当前时刻减去 `lookback`。
    pub fn lookback_from_now(lookback: Duration, step: Duration) -> Self {
        Self::starting_at(now_epoch_ms().saturating_sub(duration_ms(lookback)), step)
    }

    /// 推进一步并返回推进后的时刻。
    ///
    /// 每次读取都会移动时钟，同一次采集只能调用一次。
    pub fn advance(&mut self) -> i64 {
        self.current_ms = self.current_ms.saturating_add(self.step_ms);
        self.current_ms
    }

    /// 查看当前时刻，不推进。
    pub fn peek(&self) -> i64 {
        self.current_ms
    }

    pub fn step_ms(&self) -> i64 {
        self.step_ms
    }
}

fn duration_ms(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

/// 回放文件逐帧读取器（跳过空行）。
pub struct ReplayReader {
    lines: Lines<BufReader<File>>,
}

impl ReplayReader {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, std::io::Error> {
        let file = File::open(path).await?;
        Ok(Self {
            lines: BufReader::new(file).lines(),
        })
    }

    pub async fn next_frame(&mut self) -> Result<Option<RawFrame>, std::io::Error> {
        while let Some(line) = self.lines.next_line().await? {
            let line = line.trim();
            if !line.is_empty() {
                return Ok(Some(RawFrame::new(line)));
            }
        }
        Ok(None)
    }
}

enum ReplaySource {
    Cursor {
        path: PathBuf,
        cursor: usize,
        stride: usize,
    },
    Injected {
        pending: Option<RawFrame>,
    },
}

/// 文件回放设备。
pub struct ReplayDevice {
    identity: DeviceConfig,
    clock: ReplayClock,
    source: ReplaySource,
}

impl ReplayDevice {
    /// 游标模式：设备自行按步幅读取 `path`。
    pub fn from_file(
        identity: DeviceConfig,
        path: impl Into<PathBuf>,
        settings: ReplaySettings,
    ) -> Self {
        let settings = settings.sanitized();
        Self {
            identity,
            clock: ReplayClock::lookback_from_now(settings.lookback, settings.step),
            source: ReplaySource::Cursor {
                path: path.into(),
                cursor: 0,
                stride: settings.stride,
            },
        }
    }

    /// 注入模式：帧由外部驱动推入。
    pub fn injected(identity: DeviceConfig, settings: ReplaySettings) -> Self {
        let settings = settings.sanitized();
        Self {
            identity,
            clock: ReplayClock::lookback_from_now(settings.lookback, settings.step),
            source: ReplaySource::Injected { pending: None },
        }
    }

    /// 替换合成时钟（测试中用于固定起点）。
    pub fn with_clock(mut self, clock: ReplayClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn clock(&self) -> &ReplayClock {
        &self.clock
    }

    /// 游标模式下的下一帧序号；注入模式返回 `None`。
    pub fn cursor(&self) -> Option<usize> {
        match &self.source {
            ReplaySource::Cursor { cursor, .. } => Some(*cursor),
            ReplaySource::Injected { .. } => None,
        }
    }

    /// 推进合成时钟并返回新时刻。
    pub fn advance_clock(&mut self) -> i64 {
        self.clock.advance()
    }

    /// 推入一帧，供下一次读取使用。游标模式下返回 `ModeConflict`。
    pub fn set_fake_frame(&mut self, raw: impl Into<RawFrame>) -> Result<(), AcquisitionError> {
        match &mut self.source {
            ReplaySource::Injected { pending } => {
                *pending = Some(raw.into());
                Ok(())
            }
            ReplaySource::Cursor { .. } => {
                Err(AcquisitionError::ModeConflict(self.identity.name.clone()))
            }
        }
    }

    /// 取下一帧原始数据。游标模式推进游标，注入模式消费待读帧。
    pub async fn next_raw_frame(&mut self) -> Result<RawFrame, AcquisitionError> {
        match &mut self.source {
            ReplaySource::Cursor {
                path,
                cursor,
                stride,
            } => {
                let frame = read_frame_at(path, *cursor).await?.ok_or_else(|| {
                    AcquisitionError::EndOfSource {
                        path: path.display().to_string(),
                        cursor: *cursor,
                    }
                })?;
                debug!(
                    target: "ems.device",
                    device = %self.identity.name,
                    cursor = *cursor,
                    "replay_frame_read"
                );
                *cursor += *stride;
                Ok(frame)
            }
            ReplaySource::Injected { pending } => pending
                .take()
                .ok_or_else(|| AcquisitionError::NoFrame(self.identity.name.clone())),
        }
    }
}

async fn read_frame_at(path: &Path, index: usize) -> Result<Option<RawFrame>, std::io::Error> {
    let mut reader = ReplayReader::open(path).await?;
    let mut seen = 0;
    while let Some(frame) = reader.next_frame().await? {
        if seen == index {
            return Ok(Some(frame));
        }
        seen += 1;
    }
    Ok(None)
}

#[async_trait]
impl Device for ReplayDevice {
    fn identity(&self) -> &DeviceConfig {
        &self.identity
    }

    async fn acquire_raw(&mut self) -> Result<RawFrame, AcquisitionError> {
        self.next_raw_frame().await
    }

    async fn get_data(&mut self) -> Result<Record, DeviceError> {
        // 时钟每次调用推进一次，与取帧成败无关
        let ts_ms = self.advance_clock();
        let frame = self.acquire_raw().await?;
        decode_frame(&self.identity, frame, ts_ms)
    }

    fn inject_frame(&mut self, frame: RawFrame) -> Result<(), AcquisitionError> {
        self.set_fake_frame(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_advances_on_every_read() {
        let mut clock = ReplayClock::starting_at(1_000, Duration::from_secs(600));
        assert_eq!(clock.peek(), 1_000);
        assert_eq!(clock.advance(), 601_000);
        assert_eq!(clock.advance(), 1_201_000);
        assert_eq!(clock.peek(), 1_201_000);
    }

    #[test]
    fn default_clock_starts_23_hours_back() {
        let before = now_epoch_ms();
        let device = ReplayDevice::injected(DeviceConfig::default(), ReplaySettings::default());
        let after = now_epoch_ms();
        let lookback = 23 * 60 * 60 * 1000;
        assert!(device.clock().peek() >= before - lookback);
        assert!(device.clock().peek() <= after - lookback);
        assert_eq!(device.clock().step_ms(), 600_000);
    }

    #[test]
    fn zero_stride_is_raised_to_one() {
        let settings = ReplaySettings {
            stride: 0,
            ..ReplaySettings::default()
        };
        assert_eq!(settings.sanitized().stride, 1);
    }

    #[test]
    fn oversized_step_never_runs_backwards() {
        let mut clock =
            ReplayClock::starting_at(0, Duration::from_secs(9_300_000_000_000_000));
        assert_eq!(clock.step_ms(), i64::MAX);
        let first = clock.advance();
        assert!(first > 0);
        assert!(clock.advance() >= first);
    }

    #[test]
    fn oversized_lookback_starts_in_the_past() {
        let settings = ReplaySettings {
            lookback: Duration::from_secs(9_300_000_000_000_000),
            ..ReplaySettings::default()
        };
        let device = ReplayDevice::injected(DeviceConfig::default(), settings);
        assert!(device.clock().peek() <= now_epoch_ms());
        assert!(device.clock().peek() < 0);
    }

    #[test]
    fn zero_step_is_raised_to_one_millisecond() {
        let settings = ReplaySettings {
            step: Duration::ZERO,
            ..ReplaySettings::default()
        };
        let mut device = ReplayDevice::injected(DeviceConfig::default(), settings);
        let start = device.clock().peek();
        assert_eq!(device.advance_clock(), start + 1);
    }

    #[test]
    fn cursor_device_rejects_injection() {
        let mut device = ReplayDevice::from_file(
            DeviceConfig::default(),
            "telemetry.txt",
            ReplaySettings::default(),
        );
        let err = device.set_fake_frame("1 2 3").expect_err("mode conflict");
        assert!(matches!(err, AcquisitionError::ModeConflict(_)));
        assert_eq!(device.cursor(), Some(0));
    }
}
