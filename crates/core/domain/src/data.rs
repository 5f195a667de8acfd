use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// 测量字段值的数据类型（仅允许标量）。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    I64(i64),
    F64(f64),
    Bool(bool),
    String(String),
}

impl FieldValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::F64(v) => Some(*v),
            FieldValue::I64(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(v) => Some(v),
            _ => None,
        }
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::F64(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::I64(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

/// Record 构造错误。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    #[error("record measurement is empty")]
    EmptyMeasurement,
    #[error("record for {0} has no fields")]
    EmptyFields(String),
}

/// 规范化后的测量记录：设备一次读数的输出。
///
/// 时间戳由设备显式给出，监控器不会补默认值。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub measurement: String,
    pub tags: BTreeMap<String, String>,
    pub fields: BTreeMap<String, FieldValue>,
    pub ts_ms: i64,
}

impl Record {
    /// 构造记录；measurement 与 fields 不可为空。
    pub fn new(
        measurement: impl Into<String>,
        tags: BTreeMap<String, String>,
        fields: BTreeMap<String, FieldValue>,
        ts_ms: i64,
    ) -> Result<Self, RecordError> {
        let measurement = measurement.into();
        if measurement.is_empty() {
            return Err(RecordError::EmptyMeasurement);
        }
        if fields.is_empty() {
            return Err(RecordError::EmptyFields(measurement));
        }
        Ok(Self {
            measurement,
            tags,
            fields,
            ts_ms,
        })
    }

    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }
}

/// 设备通道读出的原始帧（未解码）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame(String);

impl RawFrame {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for RawFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for RawFrame {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl From<&str> for RawFrame {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}
