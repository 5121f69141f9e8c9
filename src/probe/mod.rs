//! # 尺寸探测模块（probe）
//!
//! ## 设计思路
//!
//! 灯箱打开时，部分旧附件既没有声明尺寸，也没有可参考的缩略图。
//! 这些条目先以 1×1 占位交给引擎，随后由本模块在后台读取图片头部得到自然尺寸。
//!
//! - `handler`：编排探测流程（配置快照 + 缓存 + 阶段日志）
//! - `loader`：负责 URL/Data URL/文件加载与安全校验
//! - `dimensions`：头部尺寸解析与像素上限
//! - `config/error/source`：配置、错误、中间数据模型
//!
//! ```text
//! lightbox::loader（调度）
//!    ↓
//! handler.rs（缓存 / 配置快照）
//!    ├─ loader.rs（来源加载 + URL/体积安全校验 + 头部截断）
//!    └─ dimensions.rs（头部解析 + 像素上限）
//! ```

mod config;
mod dimensions;
mod error;
mod handler;
mod loader;
mod source;

pub use config::ProbeConfig;
pub use dimensions::ImageDimensions;
pub use error::ProbeError;
pub use handler::DimensionProbe;
pub use source::ImageSource;

pub(crate) use loader::redact_url_for_log;
