//! 探测策略配置。
//!
//! 头部探测只读少量字节，但仍可能被指向任意地址，
//! 所以网络侧的上限与内网拦截和完整下载保持同一套口径。

#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// 单个来源最多读取的字节数。
    pub max_file_size: u64,
    /// 整个请求的超时（秒）。
    pub download_timeout: u64,
    /// TCP/TLS 握手超时（秒）。
    pub connect_timeout: u64,
    /// 等待第一个数据块的超时（毫秒）。
    pub stream_first_byte_timeout_ms: u64,
    /// 相邻数据块之间的超时（毫秒）。
    pub stream_chunk_timeout_ms: u64,
    pub max_redirects: usize,
    /// 放行 localhost / 私有网段。
    pub allow_private_network: bool,
    /// 域名先解析再检查落点 IP。
    pub resolve_dns_for_url_safety: bool,
    /// `width * height` 超过该值的头部视为异常。
    pub max_header_pixels: u64,
    /// LRU 缓存条目数，必须大于 0。
    pub cache_capacity: usize,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            max_file_size: 50 * 1024 * 1024,
            download_timeout: 20,
            connect_timeout: 8,
            stream_first_byte_timeout_ms: 8_000,
            stream_chunk_timeout_ms: 10_000,
            max_redirects: 5,
            allow_private_network: false,
            resolve_dns_for_url_safety: true,
            max_header_pixels: 400_000_000,
            cache_capacity: 256,
        }
    }
}
