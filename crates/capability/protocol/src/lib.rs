//! # 行协议能力模块
//!
//! 提供遥测设备的帧级能力：
//! - **行协议解析**：将 10 段空白分隔的原始帧解码为 `Record`
//! - **帧通道**：从真实设备读取一帧原始数据（TCP 串口服务器等）
//!
//! ## 帧格式
//!
//! ```text
//! (237.0 000 50.0 065 28.0 240.3 50.0 330.3 030 10101101)
//!  └───────────── 9 个数值字段 ─────────────┘ └ 状态位 ┘
//! ```
//!
//! 括号可选；状态位原样保留为字符串，不做数值解析。
//!
//! ## 数据流
//!
//! ```text
//! FrameChannel::read_frame ──► RawFrame ──► decode_record(identity, frame, ts_ms) ──► Record
//! ```
//!
//! 时间戳由调用方（设备）传入，解析层不读取时钟。

mod channel;
mod error;
mod line;
mod tcp_client;

pub use channel::FrameChannel;
pub use error::{FrameError, ProtocolError};
pub use line::{
    FRAME_TOKENS, FrameValues, NUMERIC_FIELDS, STATUS_FIELD, decode_record, parse_frame,
};
pub use tcp_client::{TcpLineChannel, TcpLineConfig};
