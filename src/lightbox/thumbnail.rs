//! 缩略图查询：按条目下标读取页面上已渲染的缩略图信息。
//!
//! 核心逻辑只读取缩略图的渲染盒尺寸与当前地址，从不持有或修改缩略图本身。

use serde::{Deserialize, Serialize};

/// 缩略图在页面上的渲染状态。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThumbnailInfo {
    /// 缩略图当前实际加载的地址（`currentSrc`）。
    #[serde(default)]
    pub current_src: Option<String>,
    #[serde(default)]
    pub rendered_width: f64,
    #[serde(default)]
    pub rendered_height: f64,
}

/// `index → 缩略图`，返回 `None` 表示该条目没有可见缩略图。
pub trait ThumbnailLookup: Send + Sync {
    fn thumbnail(&self, index: usize) -> Option<ThumbnailInfo>;
}

impl<F> ThumbnailLookup for F
where
    F: Fn(usize) -> Option<ThumbnailInfo> + Send + Sync,
{
    fn thumbnail(&self, index: usize) -> Option<ThumbnailInfo> {
        self(index)
    }
}

/// 没有任何缩略图。
#[derive(Debug, Clone, Copy, Default)]
pub struct NoThumbnails;

impl ThumbnailLookup for NoThumbnails {
    fn thumbnail(&self, _index: usize) -> Option<ThumbnailInfo> {
        None
    }
}
