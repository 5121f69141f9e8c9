//! # 错误模型模块
//!
//! ## 设计思路
//!
//! 尺寸探测链路中的所有失败都归入 `ProbeError`，调用侧可按分支匹配。
//! 探测失败从不中断灯箱：上层只记录日志，条目保留 1×1 占位尺寸。

/// 尺寸探测统一错误类型。
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("网络错误：{0}")]
    Network(String),

    #[error("解码错误：{0}")]
    Decode(String),

    #[error("格式错误：{0}")]
    InvalidFormat(String),

    #[error("文件错误：{0}")]
    FileSystem(String),

    #[error("超时错误：{0}")]
    Timeout(String),

    #[error("资源限制：{0}")]
    ResourceLimit(String),
}

impl ProbeError {
    /// 稳定错误码，供前端区分失败类型。
    pub fn code(&self) -> &'static str {
        match self {
            Self::Network(_) => "E_NETWORK",
            Self::Decode(_) => "E_DECODE",
            Self::InvalidFormat(_) => "E_INVALID_FORMAT",
            Self::FileSystem(_) => "E_FILE_SYSTEM",
            Self::Timeout(_) => "E_TIMEOUT",
            Self::ResourceLimit(_) => "E_RESOURCE_LIMIT",
        }
    }
}
