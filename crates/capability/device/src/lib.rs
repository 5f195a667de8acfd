//! # 设备能力模块
//!
//! 所有遥测来源都实现 [`Device`] 契约：
//! - `acquire_raw`：从通道取一帧原始数据（允许推进游标、时钟等内部读取状态）
//! - `get_data`：每次调用恰好取一帧，并用行协议解析为 `Record`
//!
//! 变体：
//! - [`InverterDevice`]：真实逆变器，经 `FrameChannel` 读帧，时间戳取墙钟
//! - [`ReplayDevice`]：从录制文件回放，时间戳取合成时钟，用于确定性测试
//!
//! 两个变体通过组合共用 [`decode_frame`]，不存在继承层级。

mod error;
mod inverter;
mod replay;

pub use error::{AcquisitionError, DeviceError};
pub use inverter::InverterDevice;
pub use replay::{ReplayClock, ReplayDevice, ReplayReader, ReplaySettings};

use async_trait::async_trait;
use domain::{DeviceConfig, RawFrame, Record};
use tracing::warn;

/// 设备契约。
#[async_trait]
pub trait Device: Send {
    /// 设备身份（构造后不可变）。
    fn identity(&self) -> &DeviceConfig;

    /// 读取一帧原始数据。
    async fn acquire_raw(&mut self) -> Result<RawFrame, AcquisitionError>;

    /// 读取并解析一帧，得到规范化记录。
    async fn get_data(&mut self) -> Result<Record, DeviceError>;

    /// 由外部驱动注入下一帧；默认不支持。
    fn inject_frame(&mut self, frame: RawFrame) -> Result<(), AcquisitionError> {
        let _ = frame;
        Err(AcquisitionError::InjectionUnsupported(
            self.identity().name.clone(),
        ))
    }
}

/// 解析原始帧；失败时先记录原始帧再返回错误。
pub fn decode_frame(
    identity: &DeviceConfig,
    frame: RawFrame,
    ts_ms: i64,
) -> Result<Record, DeviceError> {
    ems_protocol::decode_record(identity, &frame, ts_ms).map_err(|source| {
        warn!(
            target: "ems.device",
            device = %identity.name,
            frame = %frame,
            error = %source,
            "frame_decode_failed"
        );
        DeviceError::MalformedFrame {
            device: identity.name.clone(),
            frame: frame.into_inner(),
            source,
        }
    })
}
