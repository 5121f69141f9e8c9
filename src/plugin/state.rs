//! # 灯箱会话状态（可注入）
//!
//! ## 设计思路
//!
//! 每个挂载的灯箱是一个会话，由前端生成的会话 ID 标识。
//! IPC 传来的是值，没有对象身份；这里用前端维护的修订号还原身份：
//! 修订号不变就复用上一次的 `Arc`，绑定器据此判断是否需要完整打开。
//!
//! ## 实现思路
//!
//! - `sessions` 以互斥锁保护，所有操作都是同步的短临界区。
//! - 同一 ID 重复挂载视为重新挂载：旧引擎先销毁。
//! - 销毁观察者只在需要时创建一次，之后保持同一身份。

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Deserialize;

use crate::error::AppError;
use crate::lightbox::{
    DestroyObserver, EngineEvent, EngineFactory, LightboxConfig, LightboxError, LightboxProps,
    RawImageItem, SizeLoader, ThumbnailInfo, ThumbnailLookup, ViewerBinder,
};
use crate::probe::{DimensionProbe, ProbeConfig};

/// 前端传来的灯箱属性。
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropsRequest {
    pub session_id: String,
    pub items: Vec<RawImageItem>,
    /// 条目列表的修订号，列表被替换时前端递增。
    pub items_revision: u64,
    #[serde(default)]
    pub index: usize,
    #[serde(default)]
    pub post_id: Option<String>,
    /// 按条目下标对齐的缩略图快照。
    #[serde(default)]
    pub thumbnails: Vec<Option<ThumbnailInfo>>,
    #[serde(default)]
    pub thumbnails_revision: u64,
    #[serde(default)]
    pub notify_on_destroy: bool,
    /// 页面地址，用于解析条目里的相对地址；仅挂载时生效。
    #[serde(default)]
    pub base_url: Option<String>,
}

/// 渲染循环回流的事件。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum EngineEventRequest {
    SlideChanged { index: usize },
    Closed,
}

impl From<EngineEventRequest> for EngineEvent {
    fn from(request: EngineEventRequest) -> Self {
        match request {
            EngineEventRequest::SlideChanged { index } => EngineEvent::SlideChanged(index),
            EngineEventRequest::Closed => EngineEvent::Closed,
        }
    }
}

struct Session {
    binder: ViewerBinder,
    props: LightboxProps,
    items_revision: u64,
    thumbnails_revision: u64,
}

fn snapshot_lookup(thumbnails: Vec<Option<ThumbnailInfo>>) -> Arc<dyn ThumbnailLookup> {
    Arc::new(move |index: usize| thumbnails.get(index).cloned().flatten())
}

impl Session {
    /// 按修订号把请求折叠进上一次的属性，身份不变的部分复用原 `Arc`。
    fn next_props(
        &self,
        request: PropsRequest,
        make_observer: impl FnOnce() -> DestroyObserver,
    ) -> LightboxProps {
        let items = if request.items_revision == self.items_revision {
            Arc::clone(&self.props.items)
        } else {
            request.items.into()
        };

        let thumbnails = if request.thumbnails_revision == self.thumbnails_revision {
            Arc::clone(&self.props.thumbnails)
        } else {
            snapshot_lookup(request.thumbnails)
        };

        let on_destroy = match (request.notify_on_destroy, &self.props.on_destroy) {
            (true, Some(existing)) => Some(Arc::clone(existing)),
            (true, None) => Some(make_observer()),
            (false, _) => None,
        };

        LightboxProps {
            items,
            index: request.index,
            post_id: request.post_id,
            thumbnails,
            on_destroy,
        }
    }
}

pub struct LightboxState {
    sessions: Mutex<HashMap<String, Session>>,
    probe: Arc<DimensionProbe>,
    config: LightboxConfig,
}

impl LightboxState {
    pub fn new(probe_config: ProbeConfig, config: LightboxConfig) -> Result<Self, AppError> {
        Ok(Self {
            sessions: Mutex::new(HashMap::new()),
            probe: Arc::new(DimensionProbe::new(probe_config)?),
            config,
        })
    }

    pub fn probe(&self) -> Arc<DimensionProbe> {
        Arc::clone(&self.probe)
    }

    pub fn config(&self) -> LightboxConfig {
        self.config
    }

    fn sessions(&self) -> Result<MutexGuard<'_, HashMap<String, Session>>, LightboxError> {
        self.sessions
            .lock()
            .map_err(|e| LightboxError::Poisoned(e.to_string()))
    }

    pub fn session_count(&self) -> usize {
        self.sessions().map(|sessions| sessions.len()).unwrap_or(0)
    }

    /// 挂载会话。构造失败时不登记会话。
    pub fn mount(
        &self,
        request: PropsRequest,
        factory: Arc<dyn EngineFactory>,
        loader: Arc<dyn SizeLoader>,
        make_observer: impl FnOnce() -> DestroyObserver,
    ) -> Result<(), AppError> {
        let session_id = request.session_id.clone();
        let items_revision = request.items_revision;
        let thumbnails_revision = request.thumbnails_revision;
        let on_destroy = request.notify_on_destroy.then(make_observer);

        let props = LightboxProps {
            items: request.items.into(),
            index: request.index,
            post_id: request.post_id,
            thumbnails: snapshot_lookup(request.thumbnails),
            on_destroy,
        };

        // 旧会话在锁外销毁，观察者回调可能再次进入状态。
        let previous = self.sessions()?.remove(&session_id);
        if previous.is_some() {
            log::info!("🔁 会话 {} 重新挂载", session_id);
        }
        drop(previous);

        let mut binder = ViewerBinder::new(factory, loader, self.config);
        binder.mount(&props)?;

        self.sessions()?.insert(
            session_id,
            Session {
                binder,
                props,
                items_revision,
                thumbnails_revision,
            },
        );
        Ok(())
    }

    pub fn update(
        &self,
        request: PropsRequest,
        make_observer: impl FnOnce() -> DestroyObserver,
    ) -> Result<(), AppError> {
        let mut sessions = self.sessions()?;
        let session = sessions
            .get_mut(&request.session_id)
            .ok_or_else(|| LightboxError::SessionNotFound(request.session_id.clone()))?;

        let items_revision = request.items_revision;
        let thumbnails_revision = request.thumbnails_revision;
        let props = session.next_props(request, make_observer);

        session.binder.update(&props);
        session.props = props;
        session.items_revision = items_revision;
        session.thumbnails_revision = thumbnails_revision;
        Ok(())
    }

    /// 卸载会话，返回会话此前是否存在。
    pub fn unmount(&self, session_id: &str) -> Result<bool, AppError> {
        let session = self.sessions()?.remove(session_id);

        match session {
            Some(mut session) => {
                session.binder.unmount();
                Ok(true)
            }
            None => {
                log::debug!("会话 {} 不存在，忽略卸载", session_id);
                Ok(false)
            }
        }
    }

    pub fn dispatch(&self, session_id: &str, event: EngineEvent) -> Result<(), AppError> {
        let sessions = self.sessions()?;
        let session = sessions
            .get(session_id)
            .ok_or_else(|| LightboxError::SessionNotFound(session_id.to_string()))?;

        session.binder.dispatch(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::lightbox::{EngineOptions, PresentationEngine, SizeCallback};
    use crate::plugin::engine::test_support::RecordingSink;
    use crate::plugin::engine::{GO_TO_EVENT, LOAD_AND_OPEN_EVENT, WebviewEngine};

    struct IgnoreLoads;

    impl SizeLoader for IgnoreLoads {
        fn load(&self, _src: String, _on_loaded: SizeCallback) {}
    }

    fn state() -> LightboxState {
        LightboxState::new(ProbeConfig::default(), LightboxConfig::default()).expect("create state")
    }

    fn factory(sink: &RecordingSink) -> Arc<dyn EngineFactory> {
        let sink = sink.clone();
        Arc::new(move |options: &EngineOptions| {
            Ok::<_, LightboxError>(
                Box::new(WebviewEngine::new(sink.clone(), "feed", *options))
                    as Box<dyn PresentationEngine>,
            )
        })
    }

    fn request(items_revision: u64, index: usize) -> PropsRequest {
        PropsRequest {
            session_id: "feed".to_string(),
            items: vec![
                RawImageItem::new("https://cdn.test/a.png").with_size(10.0, 10.0),
                RawImageItem::new("https://cdn.test/b.png").with_size(10.0, 10.0),
            ],
            items_revision,
            index,
            post_id: None,
            thumbnails: Vec::new(),
            thumbnails_revision: 0,
            notify_on_destroy: false,
            base_url: None,
        }
    }

    fn no_observer() -> DestroyObserver {
        panic!("observer not requested")
    }

    #[test]
    fn same_revision_navigates_without_reload() {
        let state = state();
        let sink = RecordingSink::default();
        state
            .mount(request(1, 0), factory(&sink), Arc::new(IgnoreLoads), no_observer)
            .expect("mount");

        state.update(request(1, 1), no_observer).expect("update");

        let names = sink.names();
        assert_eq!(names.iter().filter(|n| *n == LOAD_AND_OPEN_EVENT).count(), 1);
        assert_eq!(sink.last(GO_TO_EVENT).expect("go-to")["index"], 1);
    }

    #[test]
    fn new_revision_reopens_from_first_slide() {
        let state = state();
        let sink = RecordingSink::default();
        state
            .mount(request(1, 0), factory(&sink), Arc::new(IgnoreLoads), no_observer)
            .expect("mount");

        state.update(request(2, 1), no_observer).expect("update");

        let names = sink.names();
        assert_eq!(names.iter().filter(|n| *n == LOAD_AND_OPEN_EVENT).count(), 2);
        assert!(!names.iter().any(|n| n == GO_TO_EVENT));
        assert_eq!(sink.last(LOAD_AND_OPEN_EVENT).expect("open")["index"], 0);
    }

    #[test]
    fn observer_is_created_once_and_notified_on_close() {
        let state = state();
        let sink = RecordingSink::default();
        let created = Arc::new(AtomicUsize::new(0));
        let notified = Arc::new(AtomicUsize::new(0));
        let make = || {
            created.fetch_add(1, Ordering::SeqCst);
            let notified = Arc::clone(&notified);
            Arc::new(move || {
                notified.fetch_add(1, Ordering::SeqCst);
            }) as DestroyObserver
        };

        let mut first = request(1, 0);
        first.notify_on_destroy = true;
        state
            .mount(first, factory(&sink), Arc::new(IgnoreLoads), make)
            .expect("mount");

        let mut second = request(1, 1);
        second.notify_on_destroy = true;
        state.update(second, make).expect("update");

        state
            .dispatch("feed", EngineEvent::Closed)
            .expect("dispatch close");

        assert_eq!(created.load(Ordering::SeqCst), 1);
        assert_eq!(notified.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unmount_is_idempotent() {
        let state = state();
        let sink = RecordingSink::default();
        state
            .mount(request(1, 0), factory(&sink), Arc::new(IgnoreLoads), no_observer)
            .expect("mount");

        assert!(state.unmount("feed").expect("unmount"));
        assert!(!state.unmount("feed").expect("unmount again"));
        assert_eq!(state.session_count(), 0);
    }

    #[test]
    fn unknown_session_is_reported() {
        let state = state();

        let result = state.update(request(1, 0), no_observer);

        assert!(matches!(
            result,
            Err(AppError::Lightbox(LightboxError::SessionNotFound(_)))
        ));
        assert!(state.dispatch("missing", EngineEvent::Closed).is_err());
    }

    #[test]
    fn failed_construction_registers_nothing() {
        let state = state();
        let failing: Arc<dyn EngineFactory> = Arc::new(|_: &EngineOptions| {
            Err::<Box<dyn PresentationEngine>, _>(LightboxError::EngineConstruction(
                "webview 不可用".to_string(),
            ))
        });

        let result = state.mount(request(1, 0), failing, Arc::new(IgnoreLoads), no_observer);

        assert!(result.is_err());
        assert_eq!(state.session_count(), 0);
    }

    #[test]
    fn event_request_deserializes_tagged() {
        let event: EngineEventRequest =
            serde_json::from_str(r#"{ "kind": "slideChanged", "index": 3 }"#).expect("parse event");
        assert_eq!(EngineEvent::from(event), EngineEvent::SlideChanged(3));

        let closed: EngineEventRequest =
            serde_json::from_str(r#"{ "kind": "closed" }"#).expect("parse event");
        assert_eq!(EngineEvent::from(closed), EngineEvent::Closed);
    }
}
