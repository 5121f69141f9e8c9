//! # 加载与校验模块
//!
//! ## 设计思路
//!
//! 统一处理不同来源（URL / Data URL / 本地文件）的原始字节加载，并在“尽可能早”的阶段执行输入校验。
//! 尺寸探测只需要图片头部：网络下载在头部可解析时立即停止，不读取完整正文。
//!
//! ## 实现思路
//!
//! - URL：协议 + 主机安全 + 内容类型 + 体积校验 + 流式下载 + 头部提前截断。
//! - Data URL：格式解析 + 解码后体积限制。
//! - 文件：先看 metadata 体积，再整文件读取（本地读取足够快）。
//! - 网络错误统一映射到 `ProbeError`，不做重试。

use base64::{Engine as _, engine::general_purpose};
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::time::Duration;
use tokio::net::lookup_host;

use super::dimensions::inspect_dimensions_from_memory;
use super::source::RawImageData;
use super::{DimensionProbe, ProbeConfig, ProbeError};

const STREAM_SIGNATURE_PROBE_BYTES: usize = 4096;
const BUFFER_INITIAL_CAPACITY: usize = 16 * 1024;

impl DimensionProbe {
    /// 从 URL 加载图片头部字节（可能是完整正文）。
    pub(super) async fn load_from_url(
        &self,
        url: &str,
        config: &ProbeConfig,
    ) -> Result<RawImageData, ProbeError> {
        log::debug!("🌐 开始探测图片尺寸 - URL: {}", redact_url_for_log(url));

        Self::validate_url_safety(url, config).await?;
        let bytes = self.download_with_validation(url, config).await?;
        Self::validate_image_signature(&bytes)?;

        Ok(RawImageData {
            bytes,
            source_hint: "url",
        })
    }

    /// 从 `data:image/...;base64,` 地址加载图片字节。
    pub(super) fn load_from_data_url(
        &self,
        data: &str,
        config: &ProbeConfig,
    ) -> Result<RawImageData, ProbeError> {
        log::debug!("📝 开始解析内联图片");

        let bytes = Self::parse_data_url_with_limit(data, config.max_file_size)?;
        if bytes.len() as u64 > config.max_file_size {
            return Err(ProbeError::ResourceLimit(format!(
                "Base64 解码后体积过大：{:.2} MB（限制：{:.2} MB）",
                bytes.len() as f64 / 1024.0 / 1024.0,
                config.max_file_size as f64 / 1024.0 / 1024.0
            )));
        }
        Self::validate_image_signature(&bytes)?;

        Ok(RawImageData {
            bytes,
            source_hint: "data-url",
        })
    }

    /// 从本地路径加载图片字节。
    pub(super) fn load_from_file(
        &self,
        path: &str,
        config: &ProbeConfig,
    ) -> Result<RawImageData, ProbeError> {
        log::debug!("📁 开始读取本地图片 - 路径: {}", path);

        let file_path = Path::new(path);
        if !file_path.exists() {
            return Err(ProbeError::FileSystem(format!("文件不存在：{}", path)));
        }

        let metadata = std::fs::metadata(file_path)
            .map_err(|e| ProbeError::FileSystem(format!("无法读取文件信息：{}", e)))?;

        if metadata.len() > config.max_file_size {
            return Err(ProbeError::ResourceLimit(format!(
                "文件过大：{:.2} MB（限制：{:.2} MB）",
                metadata.len() as f64 / 1024.0 / 1024.0,
                config.max_file_size as f64 / 1024.0 / 1024.0
            )));
        }

        let bytes = std::fs::read(file_path)
            .map_err(|e| ProbeError::FileSystem(format!("无法读取图片文件：{}", e)))?;
        Self::validate_image_signature(&bytes)?;

        Ok(RawImageData {
            bytes,
            source_hint: "file",
        })
    }

    /// 执行带校验的网络下载，手动跟随重定向并逐跳做安全校验。
    pub(super) async fn download_with_validation(
        &self,
        url: &str,
        config: &ProbeConfig,
    ) -> Result<Vec<u8>, ProbeError> {
        let mut current_url = reqwest::Url::parse(url)
            .map_err(|e| ProbeError::InvalidFormat(format!("URL 格式错误：{}", e)))?;

        for redirect_count in 0..=config.max_redirects {
            let client = self.build_request_client_for_url(&current_url, config).await?;
            let response = client
                .get(current_url.clone())
                .header(
                    reqwest::header::ACCEPT,
                    "image/avif,image/webp,image/apng,image/*,*/*;q=0.8",
                )
                .send()
                .await
                .map_err(|e| Self::map_reqwest_error(e, current_url.as_str(), config))?;

            if response.status().is_redirection() {
                if redirect_count >= config.max_redirects {
                    return Err(ProbeError::Network(format!(
                        "重定向超过 {} 次",
                        config.max_redirects
                    )));
                }

                let location = response
                    .headers()
                    .get(reqwest::header::LOCATION)
                    .ok_or_else(|| ProbeError::Network("重定向响应缺少 Location 头".to_string()))?;

                let location_str = location
                    .to_str()
                    .map_err(|e| ProbeError::InvalidFormat(format!("重定向地址无效：{}", e)))?;

                let next_url = current_url
                    .join(location_str)
                    .map_err(|e| ProbeError::InvalidFormat(format!("重定向 URL 解析失败：{}", e)))?;

                Self::validate_url_safety(next_url.as_str(), config).await?;

                log::debug!("↪️ 跳转到: {}", redact_url_for_log(next_url.as_str()));
                current_url = next_url;
                continue;
            }

            if !response.status().is_success() {
                return Err(ProbeError::Network(format!(
                    "HTTP {}: {}",
                    response.status().as_u16(),
                    status_message(response.status().as_u16())
                )));
            }

            if let Some(ct) = response.headers().get(reqwest::header::CONTENT_TYPE) {
                if let Ok(ct_str) = ct.to_str() {
                    if !is_image_content_type(ct_str) {
                        return Err(ProbeError::InvalidFormat(format!("不是图片类型：{}", ct_str)));
                    }
                }
            }

            let total_len = response
                .headers()
                .get(reqwest::header::CONTENT_LENGTH)
                .and_then(|cl| cl.to_str().ok())
                .and_then(|cl| cl.parse::<u64>().ok());

            if let Some(size) = total_len {
                if size > config.max_file_size {
                    return Err(ProbeError::ResourceLimit(format!(
                        "文件过大：{:.2} MB（限制：{:.2} MB）",
                        size as f64 / 1024.0 / 1024.0,
                        config.max_file_size as f64 / 1024.0 / 1024.0
                    )));
                }
            }

            return Self::read_header_bytes(response, total_len, config).await;
        }

        Err(ProbeError::Network("下载流程异常结束".to_string()))
    }

    /// 流式读取正文，直到图片头部足以给出尺寸或正文结束。
    async fn read_header_bytes(
        mut response: reqwest::Response,
        total_len: Option<u64>,
        config: &ProbeConfig,
    ) -> Result<Vec<u8>, ProbeError> {
        let mut total: u64 = 0;
        let initial_capacity = total_len
            .map(|len| len.min(BUFFER_INITIAL_CAPACITY as u64) as usize)
            .filter(|len| *len > 0)
            .unwrap_or(BUFFER_INITIAL_CAPACITY);
        let mut buffer = Vec::with_capacity(initial_capacity);
        let mut signature_validated = false;
        let mut received_first_chunk = false;

        loop {
            let read_timeout = if received_first_chunk {
                Duration::from_millis(config.stream_chunk_timeout_ms)
            } else {
                Duration::from_millis(config.stream_first_byte_timeout_ms)
            };

            let next_chunk_result = tokio::time::timeout(read_timeout, response.chunk())
                .await
                .map_err(|_| {
                    if received_first_chunk {
                        ProbeError::Timeout("下载数据流读取超时".to_string())
                    } else {
                        ProbeError::Timeout("下载首包超时".to_string())
                    }
                })?;

            let Some(chunk) = next_chunk_result
                .map_err(|e| ProbeError::Network(format!("下载失败：{}", e)))?
            else {
                break;
            };

            received_first_chunk = true;

            total = total.saturating_add(chunk.len() as u64);
            if total > config.max_file_size {
                return Err(ProbeError::ResourceLimit("下载后文件超过大小限制".to_string()));
            }
            buffer.extend_from_slice(&chunk);

            if !signature_validated {
                signature_validated =
                    Self::validate_stream_signature_probe(&buffer, STREAM_SIGNATURE_PROBE_BYTES)?;
            }

            if signature_validated && inspect_dimensions_from_memory(&buffer).is_ok() {
                log::debug!("✂️ 头部已可解析，提前结束下载 - 已读 {} bytes", total);
                return Ok(buffer);
            }
        }

        if !signature_validated {
            Self::validate_image_signature(&buffer)?;
        }

        log::debug!("✅ 下载完成 - {} bytes", total);
        Ok(buffer)
    }

    async fn build_request_client_for_url(
        &self,
        url: &reqwest::Url,
        config: &ProbeConfig,
    ) -> Result<reqwest::Client, ProbeError> {
        if config.allow_private_network || !config.resolve_dns_for_url_safety {
            return Self::build_base_http_client(config);
        }

        let host = match url.host_str() {
            Some(host) => host,
            None => return Self::build_base_http_client(config),
        };

        if host.parse::<IpAddr>().is_ok() {
            return Self::build_base_http_client(config);
        }

        let port = url
            .port_or_known_default()
            .ok_or_else(|| ProbeError::InvalidFormat("URL 缺少端口信息".to_string()))?;

        let pinned = Self::resolve_public_socket_addrs(host, port).await?;
        let Some(addr) = pinned.first() else {
            return Err(ProbeError::InvalidFormat("URL 未解析到有效公网地址".to_string()));
        };

        reqwest::Client::builder()
            .timeout(Duration::from_secs(config.download_timeout))
            .connect_timeout(Duration::from_secs(config.connect_timeout))
            .redirect(reqwest::redirect::Policy::none())
            .resolve(host, *addr)
            .build()
            .map_err(|e| ProbeError::Network(format!("无法创建 DNS 绑定客户端：{}", e)))
    }

    fn build_base_http_client(config: &ProbeConfig) -> Result<reqwest::Client, ProbeError> {
        reqwest::Client::builder()
            .timeout(Duration::from_secs(config.download_timeout))
            .connect_timeout(Duration::from_secs(config.connect_timeout))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| ProbeError::Network(format!("无法创建 HTTP 客户端：{}", e)))
    }

    async fn resolve_public_socket_addrs(host: &str, port: u16) -> Result<Vec<SocketAddr>, ProbeError> {
        let addrs = lookup_host((host, port))
            .await
            .map_err(|e| ProbeError::InvalidFormat(format!("URL 主机解析失败：{}", e)))?;

        let mut result = Vec::new();
        for addr in addrs {
            if is_private_or_local_ip(addr.ip()) {
                return Err(ProbeError::InvalidFormat(format!(
                    "域名解析到内网地址，已拒绝：{}",
                    addr.ip()
                )));
            }

            result.push(addr);
        }

        Ok(result)
    }

    /// 协议与目标主机检查：本地与内网地址需显式放行。
    async fn validate_url_safety(url: &str, config: &ProbeConfig) -> Result<(), ProbeError> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|e| ProbeError::InvalidFormat(format!("URL 格式错误：{}", e)))?;

        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(ProbeError::InvalidFormat("仅支持 HTTP/HTTPS".to_string()));
        }

        if config.allow_private_network {
            return Ok(());
        }

        let host = parsed
            .host_str()
            .ok_or_else(|| ProbeError::InvalidFormat("URL 缺少主机地址".to_string()))?;

        if is_local_hostname(host) {
            return Err(ProbeError::InvalidFormat(format!(
                "目标为本地地址，已拒绝：{}",
                host
            )));
        }

        let bare_host = host.trim_start_matches('[').trim_end_matches(']');
        if let Ok(ip) = bare_host.parse::<IpAddr>() {
            if is_private_or_local_ip(ip) {
                return Err(ProbeError::InvalidFormat(format!("禁止访问内网 IP：{}", ip)));
            }

            return Ok(());
        }

        if config.resolve_dns_for_url_safety {
            let port = parsed
                .port_or_known_default()
                .ok_or_else(|| ProbeError::InvalidFormat("URL 缺少端口信息".to_string()))?;

            if Self::resolve_public_socket_addrs(host, port).await?.is_empty() {
                return Err(ProbeError::InvalidFormat("URL 未解析到有效地址".to_string()));
            }
        }

        Ok(())
    }

    fn estimate_base64_decoded_upper_bound_len(base64_data: &str) -> Result<u64, ProbeError> {
        let len = base64_data.trim().len() as u64;
        let groups = len
            .checked_add(3)
            .ok_or_else(|| ProbeError::ResourceLimit("Base64 输入长度溢出".to_string()))?
            / 4;

        groups
            .checked_mul(3)
            .ok_or_else(|| ProbeError::ResourceLimit("Base64 解码体积估算溢出".to_string()))
    }

    fn parse_data_url_with_limit(data: &str, max_file_size: u64) -> Result<Vec<u8>, ProbeError> {
        let normalized = data.trim();

        if !normalized.starts_with("data:image/") {
            return Err(ProbeError::InvalidFormat("不是图片 Data URL".to_string()));
        }

        let base64_start = normalized
            .find(";base64,")
            .ok_or_else(|| ProbeError::InvalidFormat("缺少 base64 标记".to_string()))?;
        let base64_data = &normalized[base64_start + 8..];
        let estimated_len = Self::estimate_base64_decoded_upper_bound_len(base64_data)?;

        if estimated_len > max_file_size {
            return Err(ProbeError::ResourceLimit(format!(
                "Base64 预计解码体积过大：{:.2} MB（限制：{:.2} MB）",
                estimated_len as f64 / 1024.0 / 1024.0,
                max_file_size as f64 / 1024.0 / 1024.0
            )));
        }

        general_purpose::STANDARD
            .decode(base64_data)
            .map_err(|e| ProbeError::Decode(format!("Base64 解码失败：{}", e)))
    }

    /// reqwest 错误 → `ProbeError`。
    fn map_reqwest_error(e: reqwest::Error, url: &str, config: &ProbeConfig) -> ProbeError {
        let err_msg = e.to_string().replace(url, &redact_url_for_log(url));

        if e.is_timeout() {
            ProbeError::Timeout(format!("下载超时（{}秒）", config.download_timeout))
        } else if e.is_connect() {
            ProbeError::Network(format!("无法连接：{}", err_msg))
        } else {
            ProbeError::Network(format!("请求失败：{}", err_msg))
        }
    }

    /// magic bytes 必须是图片。
    fn validate_image_signature(bytes: &[u8]) -> Result<(), ProbeError> {
        if bytes.is_empty() {
            return Err(ProbeError::InvalidFormat("图片内容为空".to_string()));
        }

        let kind = infer::get(bytes)
            .ok_or_else(|| ProbeError::InvalidFormat("无法识别图片类型".to_string()))?;

        if kind.matcher_type() != infer::MatcherType::Image {
            return Err(ProbeError::InvalidFormat(format!(
                "签名显示不是图片：{}",
                kind.mime_type()
            )));
        }

        Ok(())
    }

    /// 边下载边看签名，非图片尽早中止。
    ///
    /// 返回值：
    /// - `Ok(true)`：已识别为图片
    /// - `Ok(false)`：当前字节不足以判断，继续下载
    /// - `Err(...)`：已识别为非图片，或达到探测上限仍无法识别
    fn validate_stream_signature_probe(bytes: &[u8], probe_limit: usize) -> Result<bool, ProbeError> {
        if bytes.is_empty() {
            return Ok(false);
        }

        if let Some(kind) = infer::get(bytes) {
            if kind.matcher_type() != infer::MatcherType::Image {
                return Err(ProbeError::InvalidFormat(format!(
                    "响应类型不是图片：{}",
                    kind.mime_type()
                )));
            }
            return Ok(true);
        }

        if bytes.len() >= probe_limit {
            return Err(ProbeError::InvalidFormat(format!(
                "前 {} 字节仍未出现图片签名",
                probe_limit
            )));
        }

        Ok(false)
    }
}

/// 去掉查询串与片段，避免日志泄漏签名参数。
pub(crate) fn redact_url_for_log(url: &str) -> String {
    if url.starts_with("data:") {
        return "<data-url>".to_string();
    }

    let Ok(parsed) = reqwest::Url::parse(url) else {
        return url.split(['?', '#']).next().unwrap_or_default().to_string();
    };

    let host = parsed.host_str().unwrap_or("<unknown-host>");
    let port = parsed.port().map(|p| format!(":{}", p)).unwrap_or_default();

    format!("{}://{}{}{}", parsed.scheme(), host, port, parsed.path())
}

fn is_image_content_type(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .map(|base| {
            let base = base.trim().to_ascii_lowercase();
            base.starts_with("image/") || base == "application/octet-stream"
        })
        .unwrap_or(false)
}

/// 常见 HTTP 状态码文案。
fn status_message(code: u16) -> &'static str {
    match code {
        404 => "未找到",
        403 => "访问被拒绝",
        500..=599 => "服务器错误",
        _ => "请求失败",
    }
}

/// `localhost` 及其子域。
fn is_local_hostname(host: &str) -> bool {
    host.eq_ignore_ascii_case("localhost")
        || host.eq_ignore_ascii_case("localhost.")
        || host.ends_with(".local")
}

/// 回环、私有、链路本地、未指定等地址。
fn is_private_or_local_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            if v4.is_private()
                || v4.is_loopback()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_documentation()
                || v4.is_unspecified()
                || v4.is_multicast()
            {
                return true;
            }

            let octets = v4.octets();
            octets[0] == 0 || (octets[0] == 100 && (octets[1] & 0b1100_0000) == 0b0100_0000)
        }
        IpAddr::V6(v6) => {
            v6.is_loopback()
                || v6.is_unspecified()
                || v6.is_unique_local()
                || v6.is_unicast_link_local()
                || v6.is_multicast()
        }
    }
}
