//! 协议错误类型定义

use domain::RecordError;

/// 帧通道通信错误
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// 连接错误
    #[error("connection error: {0}")]
    Connection(String),

    /// IO 错误
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// 配置解析错误
    #[error("config parse error: {0}")]
    ConfigParse(String),

    /// 超时错误
    #[error("timeout: {0}")]
    Timeout(String),

    /// 通道关闭
    #[error("channel closed")]
    ChannelClosed,
}

/// 帧格式错误：通道读到了数据，但无法解码为合法 Record。
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FrameError {
    /// 段数不等于 10
    #[error("malformed frame: expected {expected} tokens, got {got}")]
    TokenCount { expected: usize, got: usize },

    /// 数值字段无法解析
    #[error("malformed frame: field {index} ({name}) is not a number: {token:?}")]
    Field {
        index: usize,
        name: &'static str,
        token: String,
    },

    /// Record 约束不满足（例如设备名为空）
    #[error("malformed frame: {0}")]
    Record(#[from] RecordError),
}
