//! 内存 Sink 实现

use crate::error::SinkError;
use crate::traits::{Sink, SinkSession};
use crate::validation::ensure_record;
use async_trait::async_trait;
use domain::Record;
use std::sync::{Arc, RwLock};
use tracing::info;

/// 内存 Sink：每次提交保存为一个批次。
#[derive(Clone, Default)]
pub struct InMemorySink {
    batches: Arc<RwLock<Vec<Vec<Record>>>>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已提交的全部记录（按提交顺序展开）
    pub fn records(&self) -> Vec<Record> {
        self.batches
            .read()
            .map(|batches| batches.iter().flatten().cloned().collect())
            .unwrap_or_default()
    }

    /// 已提交的批次
    pub fn batches(&self) -> Vec<Vec<Record>> {
        self.batches
            .read()
            .map(|batches| batches.clone())
            .unwrap_or_default()
    }

    /// 提交次数
    pub fn commit_count(&self) -> usize {
        self.batches.read().map(|batches| batches.len()).unwrap_or(0)
    }
}

#[async_trait]
impl Sink for InMemorySink {
    async fn open_session(&self) -> Result<Box<dyn SinkSession>, SinkError> {
        Ok(Box::new(InMemorySession {
            batches: self.batches.clone(),
            pending: Vec::new(),
        }))
    }
}

struct InMemorySession {
    batches: Arc<RwLock<Vec<Vec<Record>>>>,
    pending: Vec<Record>,
}

#[async_trait]
impl SinkSession for InMemorySession {
    fn add(&mut self, record: Record) {
        self.pending.push(record);
    }

    fn pending(&self) -> usize {
        self.pending.len()
    }

    async fn commit(&mut self) -> Result<usize, SinkError> {
        let batch = std::mem::take(&mut self.pending);
        for record in &batch {
            ensure_record(record)?;
        }
        let written = batch.len();
        let mut batches = self
            .batches
            .write()
            .map_err(|_| SinkError::new("lock failed"))?;
        for record in &batch {
            info!(
                target: "ems.storage",
                measurement = %record.measurement,
                ts_ms = record.ts_ms,
                fields = record.fields.len(),
                "record_committed"
            );
        }
        batches.push(batch);
        Ok(written)
    }
}
