//! # 配置模块
//!
//! 引擎选项在构造时显式传入，不依赖全局默认值。
//! 规范化器的默认尺寸集中在 `NormalizerConfig`，便于测试替换。

use serde::{Deserialize, Serialize};

use super::Size;

/// 呈现引擎构造选项（字段名与 webview 侧引擎一致）。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineOptions {
    /// 点击不可缩放的图片时是否关闭灯箱。
    pub click_to_close_non_zoomable: bool,
    /// 背景不透明度。
    pub bg_opacity: f64,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            click_to_close_non_zoomable: false,
            bg_opacity: 0.8,
        }
    }
}

/// 规范化器的尺寸兜底策略。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizerConfig {
    /// 没有声明尺寸的旧图片使用的默认尺寸；宽度参与缩略图比例推算。
    pub default_size: Size,
    /// 等待后台探测时的临时尺寸。
    pub provisional_size: Size,
    /// 既无尺寸、无缩略图、也无地址时的最终尺寸，默认与 `default_size` 相同。
    pub sourceless_size: Size,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        let default_size = Size::new(800.0, 600.0);
        Self {
            default_size,
            provisional_size: Size::new(1.0, 1.0),
            sourceless_size: default_size,
        }
    }
}

/// 灯箱整体配置。
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LightboxConfig {
    pub engine: EngineOptions,
    pub normalizer: NormalizerConfig,
}
