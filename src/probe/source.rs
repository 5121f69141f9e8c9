//! # 数据源与中间模型
//!
//! ## 设计思路
//!
//! 将“外部地址字符串”和“探测中间结果”解耦：
//! - `ImageSource` 表示来源语义（网络 / Data URL / 本地文件）
//! - `RawImageData` 表示已加载但未解析的字节

/// 图片输入来源。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// 网络地址来源。
    Url(String),
    /// `data:image/...;base64,` 内联来源。
    DataUrl(String),
    /// 本地文件路径来源。
    FilePath(String),
}

impl ImageSource {
    /// 按前缀识别来源类型。
    ///
    /// 非 `http(s)://`、非 `data:` 的地址一律按本地路径处理。
    pub fn classify(src: &str) -> Self {
        let trimmed = src.trim();
        let lower = trimmed.get(..8).unwrap_or(trimmed).to_ascii_lowercase();

        if lower.starts_with("http://") || lower.starts_with("https://") {
            Self::Url(trimmed.to_string())
        } else if lower.starts_with("data:") {
            Self::DataUrl(trimmed.to_string())
        } else {
            Self::FilePath(trimmed.strip_prefix("file://").unwrap_or(trimmed).to_string())
        }
    }
}

/// 加载阶段输出：原始字节与来源标识。
pub(crate) struct RawImageData {
    /// 原始图片字节。
    pub(crate) bytes: Vec<u8>,
    /// 来源提示（用于日志与诊断）。
    pub(crate) source_hint: &'static str,
}
