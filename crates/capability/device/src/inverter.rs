//! 真实逆变器设备

use crate::error::{AcquisitionError, DeviceError};
use crate::{Device, decode_frame};
use async_trait::async_trait;
use domain::{DeviceConfig, RawFrame, Record, now_epoch_ms};
use ems_protocol::{FrameChannel, TcpLineChannel, TcpLineConfig};

/// 经帧通道读取行协议响应的逆变器。
pub struct InverterDevice<C> {
    identity: DeviceConfig,
    channel: C,
}

impl<C: FrameChannel> InverterDevice<C> {
    pub fn new(identity: DeviceConfig, channel: C) -> Self {
        Self { identity, channel }
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }
}

impl InverterDevice<TcpLineChannel> {
    /// 以 `port`（host:port）作为 TCP 地址构造设备。
    pub fn over_tcp(identity: DeviceConfig, request_command: Option<String>) -> Self {
        let mut config = TcpLineConfig::new(identity.port.clone());
        config.request_command = request_command;
        Self::new(identity, TcpLineChannel::new(config))
    }
}

#[async_trait]
impl<C: FrameChannel> Device for InverterDevice<C> {
    fn identity(&self) -> &DeviceConfig {
        &self.identity
    }

    async fn acquire_raw(&mut self) -> Result<RawFrame, AcquisitionError> {
        let frame = self.channel.read_frame().await?;
        Ok(RawFrame::new(frame))
    }

    async fn get_data(&mut self) -> Result<Record, DeviceError> {
        let ts_ms = now_epoch_ms();
        let frame = self.acquire_raw().await?;
        decode_frame(&self.identity, frame, ts_ms)
    }
}
