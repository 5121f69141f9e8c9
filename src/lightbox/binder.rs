//! # 查看器生命周期绑定
//!
//! ## 设计思路
//!
//! 宿主是声明式的（挂载 / 属性更新 / 卸载），呈现引擎是命令式的单例。
//! `ViewerBinder` 用显式状态机把两者接起来，且不依赖任何 UI 框架的副作用清理顺序：
//!
//! ```text
//! Uninitialized ──mount──▶ Bound ──unmount──▶ Destroyed
//!                            │
//!                            ├─ 观察者身份变化：先注销旧的，再注册新的
//!                            ├─ 条目列表 / 缩略图查询身份变化：规范化 + 从第 0 张完整打开
//!                            └─ 仅下标变化：引擎导航，不重新载入
//! ```
//!
//! ## 实现思路
//!
//! - 引擎放在 `Arc<Mutex<Option<..>>>` 槽位里，卸载时取出并销毁，槽位置空。
//! - 后台尺寸加载的回调只持有槽位的 `Weak` 与条目句柄；
//!   回调触发时引擎已不在（卸载或整个绑定器已释放）则什么也不做。
//! - 挂载时直接在 `props.index` 打开；之后同一轮更新里条目与下标同时变化时，
//!   完整打开（第 0 张）覆盖导航。
//! - 后台尺寸修正先把被修正的那一张重新交给引擎，再刷新当前页；
//!   引擎侧持有的可能只是条目快照，不能依赖共享句柄。
//! - `Drop` 兜底卸载，保证引擎恰好销毁一次、不跨挂载泄漏。

use std::sync::{Arc, Mutex, MutexGuard, Weak};

use super::engine::same_observer;
use super::normalizer::{PendingLoad, normalize};
use super::{
    DestroyObserver, EngineEvent, EngineFactory, LightboxConfig, LightboxError,
    PresentationEngine, RawImageItem, Size, SizeLoader, SlideHandle, ThumbnailLookup,
};

type EngineSlot = Mutex<Option<Box<dyn PresentationEngine>>>;

/// 宿主传入的属性。
///
/// `items` 与 `thumbnails` 按 `Arc` 指针判断身份，只有身份变化才触发完整打开。
#[derive(Clone)]
pub struct LightboxProps {
    pub items: Arc<[RawImageItem]>,
    pub index: usize,
    /// 透传字段，核心逻辑不使用。
    pub post_id: Option<String>,
    pub thumbnails: Arc<dyn ThumbnailLookup>,
    pub on_destroy: Option<DestroyObserver>,
}

impl LightboxProps {
    pub fn new(items: Vec<RawImageItem>, thumbnails: Arc<dyn ThumbnailLookup>) -> Self {
        Self {
            items: items.into(),
            index: 0,
            post_id: None,
            thumbnails,
            on_destroy: None,
        }
    }
}

/// 绑定器所处阶段。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    Bound,
    Destroyed,
}

/// 上一次生效的属性身份。
struct BoundProps {
    items: Arc<[RawImageItem]>,
    thumbnails: Arc<dyn ThumbnailLookup>,
    index: usize,
    observer: Option<DestroyObserver>,
}

pub struct ViewerBinder {
    factory: Arc<dyn EngineFactory>,
    loader: Arc<dyn SizeLoader>,
    config: LightboxConfig,
    engine: Arc<EngineSlot>,
    phase: Phase,
    bound: Option<BoundProps>,
    slides: Vec<SlideHandle>,
}

fn lock_slot(slot: &EngineSlot) -> MutexGuard<'_, Option<Box<dyn PresentationEngine>>> {
    slot.lock().unwrap_or_else(|poisoned| {
        log::warn!("引擎槽位锁中毒，继续使用恢复数据");
        poisoned.into_inner()
    })
}

fn same_thumbnails(a: &Arc<dyn ThumbnailLookup>, b: &Arc<dyn ThumbnailLookup>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

fn same_optional_observer(a: Option<&DestroyObserver>, b: Option<&DestroyObserver>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => same_observer(a, b),
        (None, None) => true,
        _ => false,
    }
}

/// 后台加载完成：引擎仍在时修正条目尺寸，重发该条目并刷新当前页。
fn apply_loaded_size(slot: &Weak<EngineSlot>, index: usize, slide: &SlideHandle, size: Size) {
    let Some(slot) = slot.upgrade() else {
        log::debug!("尺寸加载完成时绑定器已释放，忽略");
        return;
    };

    let mut guard = lock_slot(&slot);
    let Some(engine) = guard.as_mut() else {
        log::debug!("尺寸加载完成时引擎已销毁，忽略");
        return;
    };

    slide.set_size(size);
    engine.refresh_slide_content(index);
    match engine.current_index() {
        Some(current) if current != index => engine.refresh_slide_content(current),
        _ => {}
    }
    engine.update_size(true);
}

impl ViewerBinder {
    pub fn new(
        factory: Arc<dyn EngineFactory>,
        loader: Arc<dyn SizeLoader>,
        config: LightboxConfig,
    ) -> Self {
        Self {
            factory,
            loader,
            config,
            engine: Arc::new(Mutex::new(None)),
            phase: Phase::Uninitialized,
            bound: None,
            slides: Vec::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// 最近一次完整打开时交给引擎的条目。
    pub fn slides(&self) -> &[SlideHandle] {
        &self.slides
    }

    pub fn has_engine(&self) -> bool {
        lock_slot(&self.engine).is_some()
    }

    fn with_engine<T>(&self, op: impl FnOnce(&mut dyn PresentationEngine) -> T) -> Option<T> {
        let mut guard = lock_slot(&self.engine);
        guard.as_mut().map(|engine| op(engine.as_mut()))
    }

    /// 挂载：构造并初始化引擎，注册观察者，然后完整打开。
    ///
    /// 构造或初始化失败时保持 `Uninitialized` 并把错误交给宿主。
    /// 已挂载或已销毁时调用是空操作。
    pub fn mount(&mut self, props: &LightboxProps) -> Result<(), LightboxError> {
        if self.phase != Phase::Uninitialized {
            log::debug!("灯箱已处于 {:?}，忽略重复挂载", self.phase);
            return Ok(());
        }

        let mut engine = self.factory.create(&self.config.engine)?;
        engine.init()?;
        *lock_slot(&self.engine) = Some(engine);

        self.phase = Phase::Bound;
        log::info!("🖼️ 灯箱引擎已创建（{} 个条目）", props.items.len());

        self.apply_observer(props.on_destroy.clone());
        self.bound = Some(BoundProps {
            items: Arc::clone(&props.items),
            thumbnails: Arc::clone(&props.thumbnails),
            index: props.index,
            observer: props.on_destroy.clone(),
        });
        self.open(props, props.index);

        Ok(())
    }

    /// 属性更新。
    pub fn update(&mut self, props: &LightboxProps) {
        if self.phase != Phase::Bound {
            log::debug!("灯箱处于 {:?}，忽略属性更新", self.phase);
            return;
        }

        let Some(previous) = self.bound.take() else {
            return;
        };

        if !same_optional_observer(previous.observer.as_ref(), props.on_destroy.as_ref()) {
            self.replace_observer(previous.observer.as_ref(), props.on_destroy.clone());
        }

        let items_changed = !Arc::ptr_eq(&previous.items, &props.items)
            || !same_thumbnails(&previous.thumbnails, &props.thumbnails);
        let index_changed = previous.index != props.index;

        self.bound = Some(BoundProps {
            items: Arc::clone(&props.items),
            thumbnails: Arc::clone(&props.thumbnails),
            index: props.index,
            observer: props.on_destroy.clone(),
        });

        if items_changed {
            if index_changed {
                log::debug!("条目与下标同时变化，完整打开覆盖导航");
            }
            self.open(props, 0);
        } else if index_changed {
            self.navigate(props.index);
        }
    }

    /// 卸载：销毁引擎并清空引用。可重复调用。
    pub fn unmount(&mut self) {
        let engine = lock_slot(&self.engine).take();

        if let Some(mut engine) = engine {
            engine.destroy();
            log::info!("🧹 灯箱引擎已销毁");
        }

        self.bound = None;
        self.slides.clear();
        self.phase = Phase::Destroyed;
    }

    /// 渲染循环事件回流给引擎；引擎不在时忽略。
    pub fn dispatch(&self, event: EngineEvent) {
        if self.with_engine(|engine| engine.handle_event(event)).is_none() {
            log::debug!("引擎不在，忽略事件 {:?}", event);
        }
    }

    fn apply_observer(&mut self, observer: Option<DestroyObserver>) {
        if let Some(observer) = observer {
            self.with_engine(|engine| engine.on_destroy(observer));
        }
    }

    fn replace_observer(&mut self, old: Option<&DestroyObserver>, new: Option<DestroyObserver>) {
        if let Some(old) = old {
            self.with_engine(|engine| engine.off_destroy(old));
        }
        self.apply_observer(new);
    }

    fn navigate(&self, index: usize) {
        log::debug!("➡️ 灯箱导航到第 {} 张", index);
        self.with_engine(|engine| engine.go_to(index));
    }

    /// 规范化当前条目并从 `start` 完整打开，然后调度后台尺寸加载。
    fn open(&mut self, props: &LightboxProps, start: usize) {
        let normalized = normalize(&props.items, props.thumbnails.as_ref(), &self.config.normalizer);
        self.slides = normalized.slides.clone();

        let opened = self
            .with_engine(|engine| engine.load_and_open(start, normalized.slides))
            .is_some();
        if !opened {
            return;
        }

        log::info!(
            "📖 灯箱已在第 {} 张打开：{} 个条目，{} 个待探测尺寸",
            start,
            self.slides.len(),
            normalized.pending.len()
        );

        for pending in normalized.pending {
            let slot = Arc::downgrade(&self.engine);
            let PendingLoad { index, src, slide } = pending;
            self.loader.load(
                src,
                Box::new(move |size| apply_loaded_size(&slot, index, &slide, size)),
            );
        }
    }
}

impl Drop for ViewerBinder {
    fn drop(&mut self) {
        if self.phase == Phase::Bound {
            self.unmount();
        }
    }
}
