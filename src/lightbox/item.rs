//! # 条目模型
//!
//! - `RawImageItem`：宿主传入的原始描述，未知字段原样透传
//! - `NormalizedImageItem`：交给引擎的描述，宽高保证为正
//! - `SlideHandle`：规范化条目的共享句柄
//!
//! 尺寸探测完成时需要修正“引擎正在展示的那个对象”，
//! 因此规范化列表与后台加载回调持有同一个 `SlideHandle`。

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// 逻辑像素尺寸。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// 宽高均为有限正数。
    pub fn is_positive(&self) -> bool {
        is_positive(self.width) && is_positive(self.height)
    }
}

pub(crate) fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

/// 宿主提供的原始图片描述。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawImageItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    /// 缩略图占位地址。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msrc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub w: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub h: Option<f64>,
    /// 其余字段（alt、id 等）原样透传给引擎。
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RawImageItem {
    pub fn new(src: impl Into<String>) -> Self {
        Self {
            src: Some(src.into()),
            ..Self::default()
        }
    }

    pub fn with_size(mut self, w: f64, h: f64) -> Self {
        self.w = Some(w);
        self.h = Some(h);
        self
    }

    pub fn with_msrc(mut self, msrc: impl Into<String>) -> Self {
        self.msrc = Some(msrc.into());
        self
    }
}

/// 交给引擎的图片描述。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedImageItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msrc: Option<String>,
    pub w: f64,
    pub h: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NormalizedImageItem {
    pub fn size(&self) -> Size {
        Size::new(self.w, self.h)
    }
}

impl From<NormalizedImageItem> for RawImageItem {
    fn from(item: NormalizedImageItem) -> Self {
        Self {
            src: item.src,
            msrc: item.msrc,
            w: Some(item.w),
            h: Some(item.h),
            extra: item.extra,
        }
    }
}

/// 规范化条目的共享句柄。
#[derive(Debug, Clone)]
pub struct SlideHandle(Arc<RwLock<NormalizedImageItem>>);

impl SlideHandle {
    pub fn new(item: NormalizedImageItem) -> Self {
        Self(Arc::new(RwLock::new(item)))
    }

    fn read(&self) -> RwLockReadGuard<'_, NormalizedImageItem> {
        self.0.read().unwrap_or_else(|poisoned| {
            log::warn!("条目读锁中毒，继续使用恢复数据");
            poisoned.into_inner()
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, NormalizedImageItem> {
        self.0.write().unwrap_or_else(|poisoned| {
            log::warn!("条目写锁中毒，继续使用恢复数据");
            poisoned.into_inner()
        })
    }

    /// 当前内容的拷贝（用于序列化给 webview）。
    pub fn snapshot(&self) -> NormalizedImageItem {
        self.read().clone()
    }

    pub fn size(&self) -> Size {
        self.read().size()
    }

    pub fn src(&self) -> Option<String> {
        self.read().src.clone()
    }

    /// 原地修正尺寸；非正尺寸被忽略。
    pub fn set_size(&self, size: Size) {
        if !size.is_positive() {
            log::debug!("忽略无效尺寸修正：{}x{}", size.width, size.height);
            return;
        }

        let mut item = self.write();
        item.w = size.width;
        item.h = size.height;
    }

    pub fn ptr_eq(&self, other: &SlideHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}
