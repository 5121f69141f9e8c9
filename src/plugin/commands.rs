//! # Tauri 命令层
//!
//! 命令只负责接收参数、组装引擎工厂与加载器，具体状态迁移交给 `LightboxState`。

use std::sync::Arc;

use tauri::{AppHandle, Manager, Runtime, State};

use super::engine::{DESTROYED_EVENT, SessionPayload, WebviewEngine, emit_payload};
use super::state::{EngineEventRequest, LightboxState, PropsRequest};
use crate::error::AppError;
use crate::lightbox::{
    DestroyObserver, EngineFactory, EngineOptions, LightboxError, PresentationEngine,
    ProbeSizeLoader,
};
use crate::settings::{self, LightboxSettings};

/// 销毁时向宿主发送 `lightbox://destroyed`。
fn destroyed_notifier<R: Runtime>(
    app: &AppHandle<R>,
    session_id: &str,
) -> impl FnOnce() -> DestroyObserver + use<R> {
    let app = app.clone();
    let session_id = session_id.to_string();

    move || {
        Arc::new(move || {
            log::debug!("灯箱会话 {} 已关闭", session_id);
            emit_payload(&app, DESTROYED_EVENT, &SessionPayload { session_id: &session_id });
        }) as DestroyObserver
    }
}

/// 挂载灯箱会话。
#[tauri::command]
pub(crate) async fn mount<R: Runtime>(
    app: AppHandle<R>,
    state: State<'_, LightboxState>,
    request: PropsRequest,
) -> Result<(), AppError> {
    let mut loader = ProbeSizeLoader::on_current_runtime(state.probe())?;
    if let Some(base_url) = request.base_url.as_deref() {
        let base_url = reqwest::Url::parse(base_url)
            .map_err(|e| AppError::InvalidInput(format!("baseUrl 无法解析: {}", e)))?;
        loader = loader.with_base_url(base_url);
    }

    let sink = app.clone();
    let session_id = request.session_id.clone();
    let factory: Arc<dyn EngineFactory> = Arc::new(move |options: &EngineOptions| {
        Ok::<_, LightboxError>(
            Box::new(WebviewEngine::new(sink.clone(), session_id.clone(), *options))
                as Box<dyn PresentationEngine>,
        )
    });

    let notifier = destroyed_notifier(&app, &request.session_id);
    state.mount(request, factory, Arc::new(loader), notifier)
}

/// 属性更新。
#[tauri::command]
pub(crate) fn update<R: Runtime>(
    app: AppHandle<R>,
    state: State<'_, LightboxState>,
    request: PropsRequest,
) -> Result<(), AppError> {
    let notifier = destroyed_notifier(&app, &request.session_id);
    state.update(request, notifier)
}

/// 卸载会话，返回会话此前是否存在。
#[tauri::command]
pub(crate) fn unmount(state: State<'_, LightboxState>, session_id: String) -> Result<bool, AppError> {
    state.unmount(&session_id)
}

/// webview 中的翻页、关闭回流。
#[tauri::command]
pub(crate) fn engine_event(
    state: State<'_, LightboxState>,
    session_id: String,
    event: EngineEventRequest,
) -> Result<(), AppError> {
    state.dispatch(&session_id, event.into())
}

#[tauri::command]
pub(crate) fn get_settings(state: State<'_, LightboxState>) -> Result<LightboxSettings, AppError> {
    let config = state.probe().config_snapshot()?;
    Ok(LightboxSettings::from_probe_config(&config))
}

/// 校验、落盘并立即应用到探测器。
#[tauri::command]
pub(crate) fn set_settings<R: Runtime>(
    app: AppHandle<R>,
    state: State<'_, LightboxState>,
    settings: LightboxSettings,
) -> Result<(), AppError> {
    settings.validate()?;

    let dir = app
        .path()
        .app_data_dir()
        .map_err(|e| AppError::Storage(format!("无法获取应用数据目录: {}", e)))?;
    settings::save_settings(&dir, &settings)?;

    let probe = state.probe();
    let mut config = probe.config_snapshot()?;
    settings.apply_to(&mut config);
    probe.set_config(config)?;

    log::info!("⚙️ 灯箱设置已应用");
    Ok(())
}
