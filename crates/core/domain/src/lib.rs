pub mod data;
pub mod device;

pub use data::{FieldValue, RawFrame, Record, RecordError};
pub use device::DeviceConfig;

/// 获取当前时间戳（毫秒）。
pub fn now_epoch_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}
