//! # 核心编排模块
//!
//! ## 设计思路
//!
//! `DimensionProbe` 只负责流程编排、配置与缓存，不直接与 Tauri 绑定。
//! 处理链路固定为：
//! 1. 读取配置快照
//! 2. 命中缓存则直接返回
//! 3. 按来源加载头部字节
//! 4. 解析头部尺寸并做像素上限校验
//! 5. 写入缓存
//!
//! ## 实现思路
//!
//! - 配置通过 `RwLock<ProbeConfig>` 支持运行时调整。
//! - 单次探测使用“同一配置快照”，避免处理中途配置漂移。
//! - 尺寸缓存使用 `lru::LruCache`，同一地址重复打开灯箱不再发起请求。

use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Mutex, RwLock};
use std::time::Instant;

use super::dimensions::{inspect_dimensions_from_memory, validate_pixel_limits};
use super::loader::redact_url_for_log;
use super::{ImageDimensions, ImageSource, ProbeConfig, ProbeError};

/// 图片尺寸探测器。
pub struct DimensionProbe {
    config: RwLock<ProbeConfig>,
    cache: Mutex<LruCache<String, ImageDimensions>>,
}

fn cache_capacity(config: &ProbeConfig) -> Result<NonZeroUsize, ProbeError> {
    NonZeroUsize::new(config.cache_capacity)
        .ok_or_else(|| ProbeError::ResourceLimit("cache_capacity 必须大于 0".to_string()))
}

impl DimensionProbe {
    /// 根据初始配置创建探测器。
    ///
    /// # 示例
    /// ```rust,no_run
    /// use attachment_lightbox::probe::{DimensionProbe, ProbeConfig};
    ///
    /// let probe = DimensionProbe::new(ProbeConfig::default())?;
    /// # Ok::<(), attachment_lightbox::probe::ProbeError>(())
    /// ```
    pub fn new(config: ProbeConfig) -> Result<Self, ProbeError> {
        let capacity = cache_capacity(&config)?;
        Ok(Self {
            config: RwLock::new(config),
            cache: Mutex::new(LruCache::new(capacity)),
        })
    }

    /// 获取配置快照，保证单次探测链路使用一致参数。
    pub fn config_snapshot(&self) -> Result<ProbeConfig, ProbeError> {
        self.config
            .read()
            .map(|cfg| cfg.clone())
            .map_err(|_| ProbeError::ResourceLimit("配置读取锁已中毒".to_string()))
    }

    /// 替换配置；缓存容量随之调整。
    pub fn set_config(&self, config: ProbeConfig) -> Result<(), ProbeError> {
        let capacity = cache_capacity(&config)?;
        {
            let mut cache = self
                .cache
                .lock()
                .map_err(|_| ProbeError::ResourceLimit("尺寸缓存锁已中毒".to_string()))?;
            cache.resize(capacity);
        }

        let mut current = self
            .config
            .write()
            .map_err(|_| ProbeError::ResourceLimit("配置写入锁已中毒".to_string()))?;
        *current = config;

        log::info!(
            "⚙️ 已更新尺寸探测配置（allow_private_network={}, max_file_size={}, cache_capacity={}）",
            current.allow_private_network,
            current.max_file_size,
            current.cache_capacity
        );

        Ok(())
    }

    /// 缓存中已有的尺寸（不触发加载）。
    pub fn cached(&self, src: &str) -> Option<ImageDimensions> {
        let mut cache = self.cache.lock().ok()?;
        cache.get(src).copied()
    }

    /// 探测入口：返回图片自然尺寸。
    ///
    /// # 示例
    /// ```rust,no_run
    /// use attachment_lightbox::probe::{DimensionProbe, ProbeConfig};
    ///
    /// # async fn demo() -> Result<(), attachment_lightbox::probe::ProbeError> {
    /// let probe = DimensionProbe::new(ProbeConfig::default())?;
    /// let size = probe.probe("https://example.com/a.jpg").await?;
    /// println!("{}x{}", size.width, size.height);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn probe(&self, src: &str) -> Result<ImageDimensions, ProbeError> {
        if let Some(hit) = self.cached(src) {
            log::debug!("♻️ 命中尺寸缓存 - {}", redact_url_for_log(src));
            return Ok(hit);
        }

        let config = self.config_snapshot()?;
        let start = Instant::now();

        let raw = match ImageSource::classify(src) {
            ImageSource::Url(url) => self.load_from_url(&url, &config).await?,
            ImageSource::DataUrl(data) => self.load_from_data_url(&data, &config)?,
            ImageSource::FilePath(path) => self.load_from_file(&path, &config)?,
        };

        let dimensions = inspect_dimensions_from_memory(&raw.bytes)?;
        validate_pixel_limits(&config, dimensions)?;

        log::info!(
            "📐 尺寸探测完成 - 来源: {} 尺寸: {}x{} 读取: {} bytes 耗时: {}ms",
            raw.source_hint,
            dimensions.width,
            dimensions.height,
            raw.bytes.len(),
            start.elapsed().as_millis()
        );

        match self.cache.lock() {
            Ok(mut cache) => {
                cache.put(src.to_string(), dimensions);
            }
            Err(_) => log::warn!("尺寸缓存锁已中毒，跳过写入"),
        }

        Ok(dimensions)
    }
}
