//! 帧通道抽象

use crate::error::ProtocolError;
use async_trait::async_trait;

/// 真实设备的原始帧来源。
///
/// 每次调用读取并返回一帧，不在调用之间缓存。
#[async_trait]
pub trait FrameChannel: Send {
    async fn read_frame(&mut self) -> Result<String, ProtocolError>;
}
