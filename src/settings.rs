//! 运行时设置持久化
//!
//! # 设计思路
//!
//! 尺寸探测的网络策略（内网访问、超时、体积上限、缓存容量）允许用户调整，
//! 以 JSON 形式保存在应用数据目录下的 `lightbox-settings.json`。
//! 引擎外观选项固定，不属于可调设置。
//!
//! # 实现思路
//!
//! - 读写函数只接收目录，Tauri 侧负责解析应用数据目录。
//! - 写入前先做范围校验，非法值不落盘也不生效。
//! - 文件缺失时返回 `None`，调用方使用默认值。

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::lightbox::LightboxError;
use crate::probe::ProbeConfig;

const SETTINGS_FILE_NAME: &str = "lightbox-settings.json";

/// 可由前端调整的探测设置。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LightboxSettings {
    pub allow_private_network: bool,
    pub resolve_dns_for_url_safety: bool,
    pub max_file_size: u64,
    pub download_timeout: u64,
    pub connect_timeout: u64,
    pub stream_first_byte_timeout_ms: u64,
    pub stream_chunk_timeout_ms: u64,
    pub cache_capacity: usize,
}

impl Default for LightboxSettings {
    fn default() -> Self {
        Self::from_probe_config(&ProbeConfig::default())
    }
}

impl LightboxSettings {
    pub fn from_probe_config(config: &ProbeConfig) -> Self {
        Self {
            allow_private_network: config.allow_private_network,
            resolve_dns_for_url_safety: config.resolve_dns_for_url_safety,
            max_file_size: config.max_file_size,
            download_timeout: config.download_timeout,
            connect_timeout: config.connect_timeout,
            stream_first_byte_timeout_ms: config.stream_first_byte_timeout_ms,
            stream_chunk_timeout_ms: config.stream_chunk_timeout_ms,
            cache_capacity: config.cache_capacity,
        }
    }

    /// 覆盖到探测配置上，未暴露的字段保持不变。
    pub fn apply_to(&self, config: &mut ProbeConfig) {
        config.allow_private_network = self.allow_private_network;
        config.resolve_dns_for_url_safety = self.resolve_dns_for_url_safety;
        config.max_file_size = self.max_file_size;
        config.download_timeout = self.download_timeout;
        config.connect_timeout = self.connect_timeout;
        config.stream_first_byte_timeout_ms = self.stream_first_byte_timeout_ms;
        config.stream_chunk_timeout_ms = self.stream_chunk_timeout_ms;
        config.cache_capacity = self.cache_capacity;
    }

    pub fn validate(&self) -> Result<(), LightboxError> {
        if !(1024..=512 * 1024 * 1024).contains(&self.max_file_size) {
            return Err(LightboxError::InvalidSettings("maxFileSize 必须在 1KB~512MB 之间".to_string()));
        }
        if !(1..=300).contains(&self.download_timeout) {
            return Err(LightboxError::InvalidSettings("downloadTimeout 必须在 1~300 秒之间".to_string()));
        }
        if !(1..=120).contains(&self.connect_timeout) {
            return Err(LightboxError::InvalidSettings("connectTimeout 必须在 1~120 秒之间".to_string()));
        }
        if !(500..=120_000).contains(&self.stream_first_byte_timeout_ms) {
            return Err(LightboxError::InvalidSettings(
                "streamFirstByteTimeoutMs 必须在 500~120000 毫秒之间".to_string(),
            ));
        }
        if !(500..=120_000).contains(&self.stream_chunk_timeout_ms) {
            return Err(LightboxError::InvalidSettings(
                "streamChunkTimeoutMs 必须在 500~120000 毫秒之间".to_string(),
            ));
        }
        if !(1..=10_000).contains(&self.cache_capacity) {
            return Err(LightboxError::InvalidSettings("cacheCapacity 必须在 1~10000 之间".to_string()));
        }
        Ok(())
    }
}

pub fn settings_file_path(dir: &Path) -> PathBuf {
    dir.join(SETTINGS_FILE_NAME)
}

/// 读取设置；文件不存在时返回 `None`。
pub fn load_settings(dir: &Path) -> Result<Option<LightboxSettings>, AppError> {
    let path = settings_file_path(dir);
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(&path)?;
    let parsed = serde_json::from_str::<LightboxSettings>(&content)
        .map_err(|e| AppError::Storage(format!("解析设置文件失败: {}", e)))?;
    parsed.validate()?;

    Ok(Some(parsed))
}

/// 校验并写入设置。
pub fn save_settings(dir: &Path, settings: &LightboxSettings) -> Result<(), AppError> {
    settings.validate()?;

    fs::create_dir_all(dir)
        .map_err(|e| AppError::Storage(format!("创建设置目录失败: {}", e)))?;

    let content = serde_json::to_string_pretty(settings)
        .map_err(|e| AppError::Storage(format!("序列化设置失败: {}", e)))?;

    fs::write(settings_file_path(dir), content)?;
    log::info!("💾 灯箱设置已保存");
    Ok(())
}
