//! # Tauri 插件
//!
//! ## 设计思路
//!
//! 灯箱以插件形式接入宿主应用：`tauri::Builder::default().plugin(attachment_lightbox::plugin::init())`。
//! 前端通过 `plugin:lightbox|<command>` 调用，订阅 `lightbox://*` 事件驱动 webview 里的引擎。
//!
//! ## 实现思路
//!
//! - `setup` 阶段读取已保存的设置，构造 `LightboxState` 并注入。
//! - 设置读取失败只记日志，继续使用默认值。

mod commands;
pub mod engine;
pub mod state;

use tauri::plugin::{Builder, TauriPlugin};
use tauri::{Manager, Runtime};

use crate::lightbox::LightboxConfig;
use crate::probe::ProbeConfig;
use crate::settings;

pub use engine::{EventSink, WebviewEngine};
pub use state::{EngineEventRequest, LightboxState, PropsRequest};

pub const PLUGIN_NAME: &str = "lightbox";

pub fn init<R: Runtime>() -> TauriPlugin<R> {
    Builder::new(PLUGIN_NAME)
        .invoke_handler(tauri::generate_handler![
            commands::mount,
            commands::update,
            commands::unmount,
            commands::engine_event,
            commands::get_settings,
            commands::set_settings,
        ])
        .setup(|app, _api| {
            let mut probe_config = ProbeConfig::default();

            match app.path().app_data_dir() {
                Ok(dir) => match settings::load_settings(&dir) {
                    Ok(Some(saved)) => saved.apply_to(&mut probe_config),
                    Ok(None) => {}
                    Err(e) => log::warn!("⚠️ 读取灯箱设置失败，使用默认值: {}", e),
                },
                Err(e) => log::warn!("⚠️ 无法获取应用数据目录，使用默认设置: {}", e),
            }

            app.manage(LightboxState::new(probe_config, LightboxConfig::default())?);
            log::info!("✅ 灯箱插件已初始化");
            Ok(())
        })
        .build()
}
