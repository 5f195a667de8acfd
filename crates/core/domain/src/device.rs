use serde::Deserialize;
use std::collections::BTreeMap;

/// 设备身份：构造后不可变，原样透传到 measurement / tags。
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub name: String,
    pub model: String,
    pub location: String,
    /// 通道地址（串口名或 host:port），对解析层不透明。
    pub port: String,
}

impl DeviceConfig {
    pub fn new(
        name: impl Into<String>,
        model: impl Into<String>,
        location: impl Into<String>,
        port: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            location: location.into(),
            port: port.into(),
        }
    }

    /// 静态维度标签：model 与 location。
    pub fn tags(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("model".to_string(), self.model.clone()),
            ("location".to_string(), self.location.clone()),
        ])
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            name: "inverter".to_string(),
            model: "model".to_string(),
            location: "location".to_string(),
            port: "COM_port".to_string(),
        }
    }
}
