//! 监控进程运行配置加载。

use domain::DeviceConfig;
use serde::Deserialize;
use std::env;

/// 配置加载错误。
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required env: {0}")]
    Missing(String),
    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
}

/// Sink 后端。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkKind {
    Memory,
    Postgres,
}

/// 运行模式。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// 定时轮询（run_forever）
    Poll,
    /// 逐行回放文件（run_from_replay_source）
    Replay,
}

/// 单设备失败策略。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicyKind {
    Abort,
    Skip,
}

/// 设备类型。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    #[default]
    Replay,
    Inverter,
}

/// 单个设备的配置。
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeviceSettings {
    #[serde(flatten)]
    pub identity: DeviceConfig,
    #[serde(default)]
    pub kind: DeviceKind,
    /// 逆变器请求命令（仅 inverter 使用）
    #[serde(default = "default_request_command")]
    pub request_command: Option<String>,
}

fn default_request_command() -> Option<String> {
    Some("Q1\r".to_string())
}

/// 回放时钟步长与回退量上限（100 年，秒）。
pub const MAX_REPLAY_SECONDS: u64 = 100 * 365 * 24 * 60 * 60;

/// 监控进程运行配置。
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub sink: SinkKind,
    pub database_url: Option<String>,
    pub poll_interval_ms: u64,
    pub failure_policy: FailurePolicyKind,
    pub run_mode: RunMode,
    pub replay_path: String,
    pub replay_stride: usize,
    pub replay_step_seconds: u64,
    pub replay_lookback_seconds: u64,
    pub devices: Vec<DeviceSettings>,
}

impl AppConfig {
    /// 从环境变量读取配置。
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 从任意键值来源读取配置（测试中使用 HashMap）。
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars { lookup };

        let sink = vars.parse_with_default("EMS_SINK", SinkKind::Memory, |value| {
            match value.to_ascii_lowercase().as_str() {
                "memory" => Some(SinkKind::Memory),
                "postgres" | "pg" => Some(SinkKind::Postgres),
                _ => None,
            }
        })?;
        let database_url = vars.optional("EMS_DATABASE_URL");
        if sink == SinkKind::Postgres && database_url.is_none() {
            return Err(ConfigError::Missing("EMS_DATABASE_URL".to_string()));
        }
        let poll_interval_ms = vars.number_with_default("EMS_POLL_INTERVAL_MS", 100)?;
        let failure_policy =
            vars.parse_with_default("EMS_FAILURE_POLICY", FailurePolicyKind::Abort, |value| {
                match value.to_ascii_lowercase().as_str() {
                    "abort" => Some(FailurePolicyKind::Abort),
                    "skip" => Some(FailurePolicyKind::Skip),
                    _ => None,
                }
            })?;
        let run_mode = vars.parse_with_default("EMS_RUN_MODE", RunMode::Poll, |value| {
            match value.to_ascii_lowercase().as_str() {
                "poll" => Some(RunMode::Poll),
                "replay" => Some(RunMode::Replay),
                _ => None,
            }
        })?;
        let replay_path = vars
            .optional("EMS_REPLAY_PATH")
            .unwrap_or_else(|| "telemetry.txt".to_string());
        let replay_stride = vars.number_with_default("EMS_REPLAY_STRIDE", 2)?;
        if replay_stride == 0 {
            return Err(ConfigError::Invalid(
                "EMS_REPLAY_STRIDE".to_string(),
                "0".to_string(),
            ));
        }
        let replay_step_seconds = vars.number_with_default("EMS_REPLAY_STEP_SECONDS", 600)?;
        if replay_step_seconds == 0 || replay_step_seconds > MAX_REPLAY_SECONDS {
            return Err(ConfigError::Invalid(
                "EMS_REPLAY_STEP_SECONDS".to_string(),
                replay_step_seconds.to_string(),
            ));
        }
        let replay_lookback_seconds =
            vars.number_with_default("EMS_REPLAY_LOOKBACK_SECONDS", 23 * 60 * 60)?;
        if replay_lookback_seconds > MAX_REPLAY_SECONDS {
            return Err(ConfigError::Invalid(
                "EMS_REPLAY_LOOKBACK_SECONDS".to_string(),
                replay_lookback_seconds.to_string(),
            ));
        }
        let devices = match vars.optional("EMS_DEVICES") {
            Some(json) => serde_json::from_str::<Vec<DeviceSettings>>(&json)
                .map_err(|err| ConfigError::Invalid("EMS_DEVICES".to_string(), err.to_string()))?,
            None => vec![single_device(&vars)?],
        };

        Ok(Self {
            sink,
            database_url,
            poll_interval_ms,
            failure_policy,
            run_mode,
            replay_path,
            replay_stride,
            replay_step_seconds,
            replay_lookback_seconds,
            devices,
        })
    }
}

fn single_device<F>(vars: &Vars<F>) -> Result<DeviceSettings, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let defaults = DeviceConfig::default();
    let kind = vars.parse_with_default("EMS_DEVICE_KIND", DeviceKind::Replay, |value| {
        match value.to_ascii_lowercase().as_str() {
            "replay" => Some(DeviceKind::Replay),
            "inverter" => Some(DeviceKind::Inverter),
            _ => None,
        }
    })?;
    let request_command = match (vars.lookup)("EMS_DEVICE_REQUEST") {
        Some(value) if value.is_empty() => None,
        Some(value) => Some(value.replace("\\r", "\r").replace("\\n", "\n")),
        None => default_request_command(),
    };
    Ok(DeviceSettings {
        identity: DeviceConfig {
            name: vars.optional("EMS_DEVICE_NAME").unwrap_or(defaults.name),
            model: vars.optional("EMS_DEVICE_MODEL").unwrap_or(defaults.model),
            location: vars
                .optional("EMS_DEVICE_LOCATION")
                .unwrap_or(defaults.location),
            port: vars.optional("EMS_DEVICE_PORT").unwrap_or(defaults.port),
        },
        kind,
        request_command,
    })
}

struct Vars<F> {
    lookup: F,
}

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, key: &str) -> Option<String> {
        match (self.lookup)(key) {
            Some(value) if !value.is_empty() => Some(value),
            _ => None,
        }
    }

    fn number_with_default<T: std::str::FromStr>(
        &self,
        key: &str,
        default: T,
    ) -> Result<T, ConfigError> {
        let value = match self.optional(key) {
            Some(value) => value,
            None => return Ok(default),
        };
        value
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid(key.to_string(), value))
    }

    fn parse_with_default<T>(
        &self,
        key: &str,
        default: T,
        parse: impl Fn(&str) -> Option<T>,
    ) -> Result<T, ConfigError> {
        let value = match self.optional(key) {
            Some(value) => value,
            None => return Ok(default),
        };
        parse(&value).ok_or_else(|| ConfigError::Invalid(key.to_string(), value))
    }
}
