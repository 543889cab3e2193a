//! 应用配置模块
//!
//! 所有配置保存在数据目录下的 config.json 中，按顶层键分节：
//! `log`、`scan`、`upload`、`gateway`。

use crate::core::{ScanConfig, UploadConfig};
use crate::gateway::GatewayConfig;
use crate::logging::LogConfig;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::Path;
use tracing::warn;

pub const CONFIG_FILE: &str = "config.json";

/// 读取整个配置文件，不存在或损坏时返回空对象
fn read_config(config_dir: &Path) -> Option<serde_json::Value> {
    let config_file = config_dir.join(CONFIG_FILE);
    let content = fs::read_to_string(&config_file).ok()?;
    match serde_json::from_str::<serde_json::Value>(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            warn!("配置文件格式错误 {:?}: {}", config_file, e);
            None
        }
    }
}

/// 加载一个配置节，缺失或解析失败时使用默认值
pub fn load_section<T: DeserializeOwned + Default>(config_dir: &Path, key: &str) -> T {
    read_config(config_dir)
        .and_then(|config| config.get(key).cloned())
        .and_then(|section| match serde_json::from_value::<T>(section) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("配置节 {} 无效，使用默认值: {}", key, e);
                None
            }
        })
        .unwrap_or_default()
}

/// 保存一个配置节，保留其他节的内容
pub fn save_section<T: Serialize>(config_dir: &Path, key: &str, value: &T) -> io::Result<()> {
    fs::create_dir_all(config_dir)?;

    let mut config = read_config(config_dir)
        .filter(|c| c.is_object())
        .unwrap_or_else(|| serde_json::json!({}));

    config[key] = serde_json::to_value(value).map_err(io::Error::other)?;

    let content = serde_json::to_string_pretty(&config).map_err(io::Error::other)?;
    fs::write(config_dir.join(CONFIG_FILE), content)
}

/// 完整配置
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub log: LogConfig,
    pub scan: ScanConfig,
    pub upload: UploadConfig,
    pub gateway: Option<GatewayConfig>,
}

impl AppConfig {
    pub fn load(config_dir: &Path) -> Self {
        Self {
            log: load_section(config_dir, "log"),
            scan: load_section(config_dir, "scan"),
            upload: load_section(config_dir, "upload"),
            gateway: load_section(config_dir, "gateway"),
        }
    }

    pub fn save(&self, config_dir: &Path) -> io::Result<()> {
        save_section(config_dir, "log", &self.log)?;
        save_section(config_dir, "scan", &self.scan)?;
        save_section(config_dir, "upload", &self.upload)?;
        if let Some(gateway) = &self.gateway {
            save_section(config_dir, "gateway", gateway)?;
        }
        Ok(())
    }
}
