//! # 附件图片灯箱（lightbox）
//!
//! ## 设计思路
//!
//! 给定一组附件图片描述与起始下标，全屏展示并支持前后切换。
//! 缺失的元数据（直链地址、宽高比例）在打开之后异步补齐，不阻塞首次打开。
//!
//! - `normalizer`：原始描述 → 可直接展示的描述（三级尺寸解析）
//! - `binder`：把宿主的挂载 / 更新 / 卸载接到命令式呈现引擎上
//! - `engine`：呈现引擎接口与销毁观察者
//! - `loader`：1×1 占位条目的后台尺寸加载
//! - `item/thumbnail/rewrite/config/error`：数据模型、缩略图查询、地址改写、配置与错误
//!
//! ```text
//! 宿主 mount ─▶ ViewerBinder ─▶ EngineFactory::create + init
//!                    │
//!                    ├─▶ normalize(items, thumbnails) ─▶ load_and_open(0, slides)
//!                    │                                      │
//!                    │            SizeLoader ◀── PendingLoad ┘
//!                    │                │
//!                    │                └─▶ set_size + refresh_slide_content + update_size
//!                    │
//! 宿主 update ─▶ 仅下标变化 ─▶ go_to(index)
//! 宿主 unmount ─▶ destroy（恰好一次）
//! ```

mod binder;
mod config;
mod engine;
mod error;
mod item;
mod loader;
pub mod normalizer;
mod rewrite;
mod thumbnail;

pub use binder::{LightboxProps, Phase, ViewerBinder};
pub use config::{EngineOptions, LightboxConfig, NormalizerConfig};
pub use engine::{DestroyObserver, DestroyObservers, EngineEvent, EngineFactory, PresentationEngine};
pub use error::LightboxError;
pub use item::{NormalizedImageItem, RawImageItem, Size, SlideHandle};
pub use loader::{ProbeSizeLoader, SizeCallback, SizeLoader};
pub use normalizer::{Normalized, PendingLoad, SizeSource, normalize};
pub use rewrite::{DROPBOX_DIRECT_LINK, RewriteRule, rewrite_source};
pub use thumbnail::{NoThumbnails, ThumbnailInfo, ThumbnailLookup};
