//! 设备错误类型定义

use ems_protocol::{FrameError, ProtocolError};

/// 采集错误：通道无法给出数据。
#[derive(Debug, thiserror::Error)]
pub enum AcquisitionError {
    /// 回放源已读完
    #[error("replay source {path} exhausted at frame {cursor}")]
    EndOfSource { path: String, cursor: usize },

    /// 注入模式下没有待读的帧
    #[error("no frame injected into device {0}")]
    NoFrame(String),

    /// 回放源读取失败
    #[error("replay source io error: {0}")]
    Io(#[from] std::io::Error),

    /// 真实设备通道失败
    #[error("device channel error: {0}")]
    Channel(#[from] ProtocolError),

    /// 游标模式设备被注入帧
    #[error("device {0} tracks its own replay cursor and does not accept injected frames")]
    ModeConflict(String),

    /// 设备不支持注入
    #[error("device {0} does not accept injected frames")]
    InjectionUnsupported(String),
}

/// 设备读数错误。
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("acquisition failed: {0}")]
    Acquisition(#[from] AcquisitionError),

    #[error("device {device} returned malformed frame {frame:?}: {source}")]
    MalformedFrame {
        device: String,
        frame: String,
        #[source]
        source: FrameError,
    },
}
