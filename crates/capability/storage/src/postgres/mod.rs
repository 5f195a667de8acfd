//! # PostgreSQL 存储实现模块
//!
//! 本模块提供 Sink 的 PostgreSQL 实现，用于生产环境。
//!
//! ## 设计原则
//!
//! 1. **参数化查询**：所有 SQL 使用参数绑定
//! 2. **事务提交**：一次 `commit` 对应一个数据库事务，失败整体回滚
//! 3. **连接池管理**：使用连接池复用数据库连接
//!
//! ## 数据库模式要求
//!
//! - `telemetry_record`：测量记录表（measurement, tags jsonb, fields jsonb, ts timestamptz）
//!
//! 建表语句见 `migrations/0001_telemetry_record.sql`，也可调用 `PgSink::ensure_schema`。

pub mod sink;

pub use sink::*;
