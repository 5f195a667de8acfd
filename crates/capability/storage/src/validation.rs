//! 验证辅助函数
//!
//! 提交前校验记录形状（measurement 与 fields 非空，浮点字段有限）。
//! Record 字段公开，可被调用方直接改写，因此写入前再检查一次。

use crate::error::SinkError;
use domain::{FieldValue, Record};

/// 验证记录形状
pub fn ensure_record(record: &Record) -> Result<(), SinkError> {
    if record.measurement.is_empty() {
        return Err(SinkError::new("record measurement required"));
    }
    if record.fields.is_empty() {
        return Err(SinkError::new(format!(
            "record {} has no fields",
            record.measurement
        )));
    }
    for (name, value) in &record.fields {
        if let FieldValue::F64(number) = value
            && !number.is_finite()
        {
            return Err(SinkError::new(format!(
                "record {} field {} is not finite",
                record.measurement, name
            )));
        }
    }
    Ok(())
}
