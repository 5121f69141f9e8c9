//! 统一错误类型模块
//!
//! # 设计思路
//!
//! 定义全局统一的 `AppError` 枚举，所有 Tauri command 统一返回 `Result<T, AppError>`，
//! 前端通过 `Serialize` 获得可读的错误信息。
//!
//! # 实现思路
//!
//! - 使用 `thiserror` 派生可读错误消息。
//! - 为 `LightboxError` / `ProbeError` / `io::Error` 提供 `From` 转换，无需手动 map。
//! - 实现 `Serialize` 将错误序列化为字符串，满足 Tauri IPC 要求。

use serde::Serialize;

use crate::lightbox::LightboxError;
use crate::probe::ProbeError;

/// 应用级统一错误类型
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// 灯箱生命周期错误（引擎构造、会话查找等）
    #[error("{0}")]
    Lightbox(#[from] LightboxError),

    /// 尺寸探测错误
    #[error("{0}")]
    Probe(#[from] ProbeError),

    /// 文件系统 I/O 错误
    #[error("文件系统错误: {0}")]
    Io(#[from] std::io::Error),

    /// 设置存储不可用或内容无法解析
    #[error("设置存储错误: {0}")]
    Storage(String),

    /// 调用方传入的数据无法解析（条目 JSON、页面地址等）
    #[error("输入无效: {0}")]
    InvalidInput(String),
}

/// Tauri IPC 要求返回值实现 `Serialize`。
impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
