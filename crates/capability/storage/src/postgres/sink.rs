//! Postgres Sink 实现

use crate::connection::{DEFAULT_MAX_CONNECTIONS, connect_pool};
use crate::error::SinkError;
use crate::traits::{Sink, SinkSession};
use crate::validation::ensure_record;
use async_trait::async_trait;
use domain::Record;
use sqlx::PgPool;
use tracing::{debug, error};

const SCHEMA_SQL: &str = include_str!("../../migrations/0001_telemetry_record.sql");

const INSERT_SQL: &str = "insert into telemetry_record (measurement, tags, fields, ts) \
     values ($1, $2::jsonb, $3::jsonb, to_timestamp($4 / 1000.0))";

pub struct PgSink {
    pub pool: PgPool,
}

impl PgSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, SinkError> {
        let pool = connect_pool(database_url, DEFAULT_MAX_CONNECTIONS).await?;
        Ok(Self { pool })
    }

    /// 创建测量记录表（已存在则跳过）
    pub async fn ensure_schema(&self) -> Result<(), SinkError> {
        sqlx::raw_sql(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl Sink for PgSink {
    async fn open_session(&self) -> Result<Box<dyn SinkSession>, SinkError> {
        Ok(Box::new(PgSinkSession {
            pool: self.pool.clone(),
            pending: Vec::new(),
        }))
    }
}

pub struct PgSinkSession {
    pool: PgPool,
    pending: Vec<Record>,
}

#[async_trait]
impl SinkSession for PgSinkSession {
    fn add(&mut self, record: Record) {
        debug!(
            target: "ems.storage",
            record = ?record,
            queued = self.pending.len() + 1,
            "record_queued"
        );
        self.pending.push(record);
    }

    fn pending(&self) -> usize {
        self.pending.len()
    }

    async fn commit(&mut self) -> Result<usize, SinkError> {
        let batch = std::mem::take(&mut self.pending);
        if batch.is_empty() {
            return Ok(0);
        }
        let mut tx = self.pool.begin().await?;
        for record in &batch {
            ensure_record(record)?;
            let tags = serde_json::to_string(&record.tags)?;
            let fields = serde_json::to_string(&record.fields)?;
            let result = sqlx::query(INSERT_SQL)
                .bind(&record.measurement)
                .bind(tags)
                .bind(fields)
                .bind(record.ts_ms as f64)
                .execute(&mut *tx)
                .await;
            if let Err(err) = result {
                error!(target: "ems.storage", record = ?record, error = %err, "record_insert_failed");
                return Err(err.into());
            }
        }
        tx.commit().await?;
        Ok(batch.len())
    }
}
