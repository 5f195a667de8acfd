//! 行协议解析
//!
//! 算法：
//! 1. 去除首尾空白，再去掉至多一个前导 `(` 与一个尾随 `)`
//! 2. 按空白切分，必须恰好 10 段
//! 3. 前 9 段按固定顺序解析为浮点数
//! 4. 第 10 段（状态位）原样保留

use crate::error::FrameError;
use domain::{DeviceConfig, FieldValue, RawFrame, Record};
use std::collections::BTreeMap;

/// 一帧的段数。
pub const FRAME_TOKENS: usize = 10;

/// 9 个数值字段名，顺序即帧内位置。
pub const NUMERIC_FIELDS: [&str; 9] = [
    "VVV",  // 输出电压
    "QQQ",  // 输出负载百分比（数字量）
    "SS_S", // 电池电压
    "BBB",  // 电池容量百分比
    "TT_T", // 散热器温度
    "MMM",  // 市电输入电压
    "RR_R", // 输出频率
    "DDD",  // 直流母线电压
    "PPP",  // 输出负载百分比（模拟量）
];

/// 状态位字段名。
pub const STATUS_FIELD: &str = "command_bits";

/// 解码后的帧值。
#[derive(Debug, Clone, PartialEq)]
pub struct FrameValues {
    pub numeric: [f64; 9],
    pub command_bits: String,
}

impl FrameValues {
    /// 按字段名取数值字段。
    pub fn value(&self, name: &str) -> Option<f64> {
        NUMERIC_FIELDS
            .iter()
            .position(|field| *field == name)
            .map(|index| self.numeric[index])
    }

    pub fn into_fields(self) -> BTreeMap<String, FieldValue> {
        let mut fields: BTreeMap<String, FieldValue> = NUMERIC_FIELDS
            .iter()
            .zip(self.numeric)
            .map(|(name, value)| (name.to_string(), FieldValue::F64(value)))
            .collect();
        fields.insert(
            STATUS_FIELD.to_string(),
            FieldValue::String(self.command_bits),
        );
        fields
    }
}

/// 解析一帧原始文本。
pub fn parse_frame(raw: &str) -> Result<FrameValues, FrameError> {
    let tokens: Vec<&str> = strip_frame(raw).split_whitespace().collect();
    if tokens.len() != FRAME_TOKENS {
        return Err(FrameError::TokenCount {
            expected: FRAME_TOKENS,
            got: tokens.len(),
        });
    }

    let mut numeric = [0.0; 9];
    for (index, (slot, token)) in numeric.iter_mut().zip(&tokens).enumerate() {
        // nan / inf 也能被 f64 解析，但不是合法读数
        *slot = token
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .ok_or_else(|| FrameError::Field {
                index,
                name: NUMERIC_FIELDS[index],
                token: token.to_string(),
            })?;
    }

    Ok(FrameValues {
        numeric,
        command_bits: tokens[FRAME_TOKENS - 1].to_string(),
    })
}

/// 将原始帧解码为 Record；时间戳由设备传入。
pub fn decode_record(
    identity: &DeviceConfig,
    frame: &RawFrame,
    ts_ms: i64,
) -> Result<Record, FrameError> {
    let values = parse_frame(frame.as_str())?;
    let record = Record::new(
        identity.name.clone(),
        identity.tags(),
        values.into_fields(),
        ts_ms,
    )?;
    Ok(record)
}

fn strip_frame(raw: &str) -> &str {
    let body = raw.trim();
    let body = body.strip_prefix('(').unwrap_or(body);
    body.strip_suffix(')').unwrap_or(body)
}
