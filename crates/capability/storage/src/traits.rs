//! Sink 接口 Trait 定义
//!
//! - Sink：按需打开一次提交会话
//! - SinkSession：缓冲记录，`commit` 时按 FIFO 顺序整体写入
//!
//! 设计原则：
//! - `add` 只缓冲，不会失败
//! - 每次 `commit` 对应一个逻辑事务边界
//! - 使用 async_trait 支持动态分发

use crate::error::SinkError;
use async_trait::async_trait;
use domain::Record;

/// 时序存储抽象
#[async_trait]
pub trait Sink: Send + Sync {
    /// 打开一次提交会话
    async fn open_session(&self) -> Result<Box<dyn SinkSession>, SinkError>;
}

/// 一次提交会话
#[async_trait]
pub trait SinkSession: Send {
    /// 缓冲一条记录
    fn add(&mut self, record: Record);

    /// 当前缓冲的记录数
    fn pending(&self) -> usize;

    /// 写入全部缓冲记录，返回写入条数；失败时本批记录丢弃
    async fn commit(&mut self) -> Result<usize, SinkError>;
}
