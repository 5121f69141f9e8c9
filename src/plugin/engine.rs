//! # Webview 呈现引擎
//!
//! ## 设计思路
//!
//! 真正的渲染循环运行在 webview 里。`WebviewEngine` 把 `PresentationEngine`
//! 的每个调用翻译成一条带会话 ID 的事件，webview 侧按事件驱动引擎实例；
//! 用户在 webview 里的翻页、关闭通过 `engine_event` 命令回流到这里。
//!
//! ## 实现思路
//!
//! - 事件发送抽象为 `EventSink`，生产环境由 `AppHandle` 实现，测试用记录器替代。
//! - 一次打开对应一次销毁通知：用户关闭或 `destroy` 任一先发生即通知，之后不再重复。
//! - 关闭后收到导航请求时，用上次载入的条目在目标下标重新打开。

use serde::Serialize;
use tauri::{AppHandle, Emitter, Runtime};

use crate::lightbox::{
    DestroyObserver, DestroyObservers, EngineEvent, EngineOptions, LightboxError,
    NormalizedImageItem, PresentationEngine, SlideHandle,
};

pub const INIT_EVENT: &str = "lightbox://init";
pub const LOAD_AND_OPEN_EVENT: &str = "lightbox://load-and-open";
pub const GO_TO_EVENT: &str = "lightbox://go-to";
pub const REFRESH_SLIDE_EVENT: &str = "lightbox://refresh-slide";
pub const UPDATE_SIZE_EVENT: &str = "lightbox://update-size";
pub const DESTROY_EVENT: &str = "lightbox://destroy";
/// 宿主订阅的销毁通知（仅在挂载时请求了通知才发送）。
pub const DESTROYED_EVENT: &str = "lightbox://destroyed";

/// 事件出口。
pub trait EventSink: Send + Sync + 'static {
    fn emit_event(&self, event: &str, payload: serde_json::Value) -> Result<(), String>;
}

impl<R: Runtime> EventSink for AppHandle<R> {
    fn emit_event(&self, event: &str, payload: serde_json::Value) -> Result<(), String> {
        self.emit(event, payload).map_err(|e| e.to_string())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InitPayload<'a> {
    session_id: &'a str,
    options: EngineOptions,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoadAndOpenPayload<'a> {
    session_id: &'a str,
    index: usize,
    items: Vec<NormalizedImageItem>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IndexPayload<'a> {
    session_id: &'a str,
    index: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshSlidePayload<'a> {
    session_id: &'a str,
    index: usize,
    item: NormalizedImageItem,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateSizePayload<'a> {
    session_id: &'a str,
    force: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SessionPayload<'a> {
    pub(crate) session_id: &'a str,
}

pub(crate) fn emit_payload<S: EventSink + ?Sized, P: Serialize>(sink: &S, event: &str, payload: &P) {
    let value = match serde_json::to_value(payload) {
        Ok(value) => value,
        Err(e) => {
            log::error!("❌ 序列化灯箱事件失败 {}: {}", event, e);
            return;
        }
    };

    if let Err(e) = sink.emit_event(event, value) {
        log::warn!("⚠️ 发送灯箱事件失败 {}: {}", event, e);
    }
}

pub struct WebviewEngine<S: EventSink> {
    sink: S,
    session_id: String,
    options: EngineOptions,
    slides: Vec<SlideHandle>,
    current: Option<usize>,
    observers: DestroyObservers,
    destroyed: bool,
}

impl<S: EventSink> WebviewEngine<S> {
    pub fn new(sink: S, session_id: impl Into<String>, options: EngineOptions) -> Self {
        Self {
            sink,
            session_id: session_id.into(),
            options,
            slides: Vec::new(),
            current: None,
            observers: DestroyObservers::default(),
            destroyed: false,
        }
    }

    fn emit<P: Serialize>(&self, event: &str, payload: &P) {
        emit_payload(&self.sink, event, payload);
    }

    /// 本次打开结束：清除当前下标并通知观察者。
    fn close(&mut self) {
        if self.current.take().is_some() {
            self.observers.notify();
        }
    }
}

impl<S: EventSink> PresentationEngine for WebviewEngine<S> {
    fn init(&mut self) -> Result<(), LightboxError> {
        let payload = InitPayload {
            session_id: &self.session_id,
            options: self.options,
        };
        let value = serde_json::to_value(&payload)
            .map_err(|e| LightboxError::EngineInit(e.to_string()))?;

        self.sink
            .emit_event(INIT_EVENT, value)
            .map_err(LightboxError::EngineInit)
    }

    fn load_and_open(&mut self, index: usize, slides: Vec<SlideHandle>) {
        if self.destroyed {
            return;
        }

        let items = slides.iter().map(SlideHandle::snapshot).collect();
        self.slides = slides;
        self.current = Some(index);
        self.emit(
            LOAD_AND_OPEN_EVENT,
            &LoadAndOpenPayload {
                session_id: &self.session_id,
                index,
                items,
            },
        );
    }

    fn go_to(&mut self, index: usize) {
        if self.destroyed {
            return;
        }

        if self.current.is_none() {
            if self.slides.is_empty() {
                return;
            }
            let slides = self.slides.clone();
            self.load_and_open(index, slides);
            return;
        }

        self.current = Some(index);
        self.emit(
            GO_TO_EVENT,
            &IndexPayload {
                session_id: &self.session_id,
                index,
            },
        );
    }

    fn current_index(&self) -> Option<usize> {
        self.current
    }

    fn refresh_slide_content(&mut self, index: usize) {
        let Some(slide) = self.slides.get(index) else {
            return;
        };

        self.emit(
            REFRESH_SLIDE_EVENT,
            &RefreshSlidePayload {
                session_id: &self.session_id,
                index,
                item: slide.snapshot(),
            },
        );
    }

    fn update_size(&mut self, force: bool) {
        if self.current.is_none() {
            return;
        }

        self.emit(
            UPDATE_SIZE_EVENT,
            &UpdateSizePayload {
                session_id: &self.session_id,
                force,
            },
        );
    }

    fn on_destroy(&mut self, observer: DestroyObserver) {
        self.observers.add(observer);
    }

    fn off_destroy(&mut self, observer: &DestroyObserver) {
        self.observers.remove(observer);
    }

    fn handle_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::SlideChanged(index) if self.current.is_some() => {
                self.current = Some(index);
            }
            EngineEvent::SlideChanged(_) => {}
            EngineEvent::Closed => self.close(),
        }
    }

    fn destroy(&mut self) {
        if self.destroyed {
            return;
        }

        self.emit(
            DESTROY_EVENT,
            &SessionPayload {
                session_id: &self.session_id,
            },
        );
        self.close();
        self.slides.clear();
        self.destroyed = true;
    }
}
