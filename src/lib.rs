//! # 附件图片灯箱 — 库入口
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                 前端 webview（呈现引擎）                  │
//! │                                                          │
//! │  附件网格 ── 缩略图快照 ── lightbox://* 事件订阅          │
//! └───────┬──────────────────────────────────▲───────────────┘
//!         │ plugin:lightbox|mount/update/…   │ emit
//! ┌───────▼──────────────────────────────────┴───────────────┐
//! │                      后端 (Rust)                          │
//! │                                                          │
//! │  ┌─ plugin ─────── 会话状态 + 命令 + WebviewEngine        │
//! │  │                                                       │
//! │  ├─ lightbox ───── 规范化 + 生命周期绑定                   │
//! │  │   ├─ normalizer   尺寸兜底链 + 地址改写                 │
//! │  │   ├─ binder       挂载 / 更新 / 卸载 状态机             │
//! │  │   └─ loader       后台尺寸加载（迟到回调安全丢弃）      │
//! │  │                                                       │
//! │  ├─ probe ──────── 图片头部尺寸探测（URL/Data URL/文件）   │
//! │  ├─ settings ───── 探测设置 JSON 持久化                    │
//! │  ├─ backlinks ──── 反向引用页视图模型                      │
//! │  └─ error ──────── AppError (统一错误类型)                 │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`error`] | 统一错误类型 `AppError`，所有 Tauri command 的返回类型 |
//! | [`lightbox`] | 条目规范化、呈现引擎接口、查看器生命周期绑定 |
//! | [`probe`] | 只读图片头部得到自然尺寸，带 SSRF 防护与 LRU 缓存 |
//! | [`settings`] | 探测设置的校验与持久化 |
//! | [`backlinks`] | “References to …” 页面的标题与正文分支 |
//! | [`plugin`] | Tauri 插件：命令注册、会话管理、webview 事件桥 |

pub mod error;
pub mod backlinks;
pub mod lightbox;
pub mod plugin;
pub mod probe;
pub mod settings;
