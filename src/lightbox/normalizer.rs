//! # 条目规范化
//!
//! ## 设计思路
//!
//! 每个原始条目产出一个规范化条目，顺序与数量不变，调用方的列表不被修改。
//! 单个条目依次经过：
//! 1. 缩略图占位：缺少 `msrc` 时取缩略图当前地址
//! 2. 源地址改写：外部网盘分享页 → 直链
//! 3. 尺寸解析：声明尺寸 → 缩略图比例推算 → 1×1 临时尺寸 + 后台探测；
//!    连地址都没有时停留在 800×600 默认尺寸
//!
//! ## 实现思路
//!
//! 规范化本身是纯函数：需要后台探测的条目以 `PendingLoad` 返回，
//! 由 `ViewerBinder` 在列表交给引擎之后统一调度。
//! 缩略图只在调用时读取一次，之后即使变得可用也不重试。

use super::item::is_positive;
use super::rewrite::rewrite_source;
use super::{
    NormalizedImageItem, NormalizerConfig, RawImageItem, Size, SlideHandle, ThumbnailInfo,
    ThumbnailLookup,
};

/// 尺寸最终来自哪一条规则。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeSource {
    /// 条目自带正宽度。
    Declared,
    /// 由缩略图渲染比例推算。
    Thumbnail,
    /// 临时 1×1，等待后台探测。
    Provisional,
    /// 没有任何线索，也没有地址可探测。
    Fallback,
}

/// 一个等待后台探测的条目。
#[derive(Debug, Clone)]
pub struct PendingLoad {
    pub index: usize,
    pub src: String,
    pub slide: SlideHandle,
}

/// 规范化结果。
#[derive(Debug, Clone, Default)]
pub struct Normalized {
    pub slides: Vec<SlideHandle>,
    pub pending: Vec<PendingLoad>,
}

/// 规范化整个列表。
pub fn normalize(
    raw_items: &[RawImageItem],
    thumbnails: &dyn ThumbnailLookup,
    config: &NormalizerConfig,
) -> Normalized {
    let mut normalized = Normalized {
        slides: Vec::with_capacity(raw_items.len()),
        pending: Vec::new(),
    };

    for (index, raw) in raw_items.iter().enumerate() {
        let thumb = thumbnails.thumbnail(index);
        let (item, source) = normalize_item(raw, thumb.as_ref(), config);

        log::debug!(
            "🧾 条目 #{} 尺寸 {}x{}（{:?}）",
            index,
            item.w,
            item.h,
            source
        );

        let pending_src = match source {
            SizeSource::Provisional => item.src.clone(),
            _ => None,
        };
        let slide = SlideHandle::new(item);

        if let Some(src) = pending_src {
            normalized.pending.push(PendingLoad {
                index,
                src,
                slide: slide.clone(),
            });
        }
        normalized.slides.push(slide);
    }

    normalized
}

/// 规范化单个条目，并返回尺寸来源。
pub fn normalize_item(
    raw: &RawImageItem,
    thumb: Option<&ThumbnailInfo>,
    config: &NormalizerConfig,
) -> (NormalizedImageItem, SizeSource) {
    let msrc = match raw.msrc.as_deref() {
        Some(msrc) if !msrc.is_empty() => Some(msrc.to_string()),
        _ => thumb
            .and_then(|t| t.current_src.clone())
            .filter(|src| !src.is_empty()),
    };

    let src = raw.src.as_deref().map(rewrite_source);

    let (size, source) = resolve_size(raw, src.as_deref(), thumb, config);

    let item = NormalizedImageItem {
        src,
        msrc,
        w: size.width,
        h: size.height,
        extra: raw.extra.clone(),
    };

    (item, source)
}

fn resolve_size(
    raw: &RawImageItem,
    src: Option<&str>,
    thumb: Option<&ThumbnailInfo>,
    config: &NormalizerConfig,
) -> (Size, SizeSource) {
    if let Some(w) = raw.w.filter(|w| is_positive(*w)) {
        let h = raw
            .h
            .filter(|h| is_positive(*h))
            .unwrap_or(w * config.default_size.height / config.default_size.width);
        return (Size::new(w, h), SizeSource::Declared);
    }

    if let Some(thumb) = thumb.filter(|t| is_positive(t.rendered_width) && is_positive(t.rendered_height)) {
        let w = config.default_size.width;
        let h = w * (thumb.rendered_height / thumb.rendered_width);
        return (Size::new(w, h), SizeSource::Thumbnail);
    }

    match src {
        Some(src) if !src.is_empty() => (config.provisional_size, SizeSource::Provisional),
        _ => (config.sourceless_size, SizeSource::Fallback),
    }
}
