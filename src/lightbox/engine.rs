//! # 呈现引擎接口
//!
//! ## 设计思路
//!
//! 第三方呈现引擎自带渲染循环、开关状态与导航，本 crate 只通过
//! `PresentationEngine` 驱动它。引擎实例由 `ViewerBinder` 独占。
//!
//! - 构造：`EngineFactory::create`，构造选项显式传入
//! - 驱动：`load_and_open` / `go_to` / `refresh_slide_content` / `update_size`
//! - 通知：`on_destroy` / `off_destroy` 注册关闭观察者
//! - 回流：渲染循环里发生的用户操作通过 `handle_event` 报告回来

use std::sync::Arc;

use super::{EngineOptions, LightboxError, SlideHandle};

/// 引擎销毁通知的观察者，身份按指针比较。
pub type DestroyObserver = Arc<dyn Fn() + Send + Sync>;

/// 渲染循环报告回来的事件。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineEvent {
    /// 用户切换到了第 N 张。
    SlideChanged(usize),
    /// 用户关闭了灯箱。
    Closed,
}

pub trait PresentationEngine: Send {
    fn init(&mut self) -> Result<(), LightboxError>;

    /// 载入条目并从 `index` 打开。
    fn load_and_open(&mut self, index: usize, slides: Vec<SlideHandle>);

    /// 在当前条目中导航，不重新载入。
    fn go_to(&mut self, index: usize);

    /// 当前展示的下标；尚未打开时为 `None`。
    fn current_index(&self) -> Option<usize>;

    /// 重新读取第 `index` 张条目的内容；尺寸修正后对被修正的条目和当前页各调用一次。
    fn refresh_slide_content(&mut self, index: usize);

    fn update_size(&mut self, force: bool);

    fn on_destroy(&mut self, observer: DestroyObserver);

    fn off_destroy(&mut self, observer: &DestroyObserver);

    fn handle_event(&mut self, _event: EngineEvent) {}

    /// 销毁实例并通知所有销毁观察者。
    fn destroy(&mut self);
}

/// 引擎工厂：每次挂载构造一个实例。
pub trait EngineFactory: Send + Sync {
    fn create(&self, options: &EngineOptions) -> Result<Box<dyn PresentationEngine>, LightboxError>;
}

impl<F> EngineFactory for F
where
    F: Fn(&EngineOptions) -> Result<Box<dyn PresentationEngine>, LightboxError> + Send + Sync,
{
    fn create(&self, options: &EngineOptions) -> Result<Box<dyn PresentationEngine>, LightboxError> {
        self(options)
    }
}

pub(crate) fn same_observer(a: &DestroyObserver, b: &DestroyObserver) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

/// 销毁观察者列表，供各引擎实现复用。
#[derive(Default)]
pub struct DestroyObservers {
    observers: Vec<DestroyObserver>,
}

impl DestroyObservers {
    /// 同一观察者重复注册只保留一份。
    pub fn add(&mut self, observer: DestroyObserver) {
        if !self.observers.iter().any(|o| same_observer(o, &observer)) {
            self.observers.push(observer);
        }
    }

    pub fn remove(&mut self, observer: &DestroyObserver) {
        self.observers.retain(|o| !same_observer(o, observer));
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    pub fn notify(&self) {
        for observer in &self.observers {
            observer();
        }
    }
}
