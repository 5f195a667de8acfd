//! TCP 帧通道实现
//!
//! 通过串口服务器（或设备自带的 TCP 口）读取逆变器响应帧：
//! 写入请求命令，读到帧分隔符为止。
//!
//! ## 使用示例
//!
//! ```rust,ignore
//! let mut channel = TcpLineChannel::new(TcpLineConfig::new("192.168.1.100:4001"));
//! let frame = channel.read_frame().await?;
//! ```

use crate::channel::FrameChannel;
use crate::error::ProtocolError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// TCP 帧通道配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TcpLineConfig {
    /// 设备地址（host:port）
    pub address: String,
    /// 请求命令（为空时只读不写）
    #[serde(default = "default_request_command")]
    pub request_command: Option<String>,
    /// 帧分隔符（单字节）
    #[serde(default = "default_delimiter")]
    pub frame_delimiter: String,
    /// 连接超时（毫秒）
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,
    /// 读超时（毫秒）
    #[serde(default = "default_read_timeout")]
    pub read_timeout_ms: u64,
}

fn default_request_command() -> Option<String> {
    Some("Q1\r".to_string())
}

fn default_delimiter() -> String {
    "\r".to_string()
}

fn default_connect_timeout() -> u64 {
    5000
}

fn default_read_timeout() -> u64 {
    2000
}

impl TcpLineConfig {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            request_command: default_request_command(),
            frame_delimiter: default_delimiter(),
            connect_timeout_ms: default_connect_timeout(),
            read_timeout_ms: default_read_timeout(),
        }
    }

    /// 只使用分隔符的首字节；为空时回退到 `\r`。
    fn delimiter_byte(&self) -> u8 {
        self.frame_delimiter.as_bytes().first().copied().unwrap_or(b'\r')
    }
}

/// TCP 帧通道：惰性连接，任一失败后断开，下次读取时重连。
pub struct TcpLineChannel {
    config: TcpLineConfig,
    connection: Option<BufReader<TcpStream>>,
}

impl TcpLineChannel {
    /// 创建新的 TCP 帧通道
    pub fn new(config: TcpLineConfig) -> Self {
        Self {
            config,
            connection: None,
        }
    }

    /// 从 JSON 配置字符串解析
    pub fn from_json(json: &str) -> Result<Self, ProtocolError> {
        let config: TcpLineConfig = serde_json::from_str(json)
            .map_err(|e| ProtocolError::ConfigParse(e.to_string()))?;
        if config.frame_delimiter.len() != 1 {
            return Err(ProtocolError::ConfigParse(format!(
                "frame_delimiter must be a single byte, got {:?}",
                config.frame_delimiter
            )));
        }
        Ok(Self::new(config))
    }

    pub fn config(&self) -> &TcpLineConfig {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    async fn ensure_connected(&mut self) -> Result<(), ProtocolError> {
        if self.connection.is_some() {
            return Ok(());
        }
        let address = self.config.address.clone();
        let stream = timeout(
            Duration::from_millis(self.config.connect_timeout_ms),
            TcpStream::connect(&address),
        )
        .await
        .map_err(|_| ProtocolError::Timeout(format!("connect to {}", address)))?
        .map_err(|e| ProtocolError::Connection(format!("{}: {}", address, e)))?;
        info!(address = %address, "connected to device channel");
        self.connection = Some(BufReader::new(stream));
        Ok(())
    }

    async fn exchange(&mut self) -> Result<String, ProtocolError> {
        self.ensure_connected().await?;

        let delimiter = self.config.delimiter_byte();
        let read_timeout = Duration::from_millis(self.config.read_timeout_ms);
        let request = self.config.request_command.clone();
        let connection = self.connection.as_mut().ok_or(ProtocolError::ChannelClosed)?;

        // 发送请求命令
        if let Some(command) = request {
            connection.get_mut().write_all(command.as_bytes()).await?;
            connection.get_mut().flush().await?;
            debug!(command = %command.trim(), "sent request command");
        }

        // 读取响应
        let mut buf = Vec::new();
        let read = timeout(read_timeout, connection.read_until(delimiter, &mut buf))
            .await
            .map_err(|_| ProtocolError::Timeout("read frame".to_string()))??;
        if read == 0 {
            return Err(ProtocolError::Connection("connection closed".to_string()));
        }

        let frame = String::from_utf8_lossy(&buf).trim().to_string();
        debug!(frame = %frame, "received frame");
        Ok(frame)
    }
}

#[async_trait]
impl FrameChannel for TcpLineChannel {
    async fn read_frame(&mut self) -> Result<String, ProtocolError> {
        let result = self.exchange().await;
        if let Err(err) = &result {
            warn!(address = %self.config.address, error = %err, "device channel reset");
            self.connection = None;
        }
        result
    }
}
