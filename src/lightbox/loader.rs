//! # 后台尺寸加载
//!
//! 规范化阶段给出 1×1 临时尺寸的条目，在这里发起一次“旁路”加载。
//! 加载只管发出去：没有取消令牌，失败只记日志，条目保留临时尺寸。
//!
//! 条目地址来自其他用户的帖子，只接受网络地址与 `data:image/` 内联图片；
//! 相对地址需要配置基准 URL 才会被解析，本地路径一律不读取。

use std::sync::Arc;

use reqwest::Url;

use super::{LightboxError, Size};
use crate::probe::{DimensionProbe, ImageSource, redact_url_for_log};

/// 加载完成回调，参数为图片自然尺寸。
pub type SizeCallback = Box<dyn FnOnce(Size) + Send + 'static>;

pub trait SizeLoader: Send + Sync {
    /// 调度一次加载；成功时调用 `on_loaded`，失败时不调用。
    fn load(&self, src: String, on_loaded: SizeCallback);
}

/// 基于 `DimensionProbe` 的加载器，在 tokio 运行时上执行。
pub struct ProbeSizeLoader {
    probe: Arc<DimensionProbe>,
    runtime: tokio::runtime::Handle,
    base_url: Option<Url>,
}

fn is_inline_image(data_url: &str) -> bool {
    data_url
        .get(..11)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("data:image/"))
}

impl ProbeSizeLoader {
    pub fn new(probe: Arc<DimensionProbe>, runtime: tokio::runtime::Handle) -> Self {
        Self {
            probe,
            runtime,
            base_url: None,
        }
    }

    /// 绑定当前所在的 tokio 运行时。
    pub fn on_current_runtime(probe: Arc<DimensionProbe>) -> Result<Self, LightboxError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| LightboxError::Runtime(e.to_string()))?;
        Ok(Self::new(probe, runtime))
    }

    /// 相对地址按页面地址解析。
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = Some(base_url);
        self
    }

    /// 可以交给探测器的地址；`None` 表示保留占位尺寸。
    fn resolve_source(&self, src: &str) -> Option<String> {
        match ImageSource::classify(src) {
            ImageSource::Url(url) => Some(url),
            ImageSource::DataUrl(data) => is_inline_image(&data).then_some(data),
            ImageSource::FilePath(_) => {
                let joined = self.base_url.as_ref()?.join(src.trim()).ok()?;
                matches!(joined.scheme(), "http" | "https").then(|| joined.to_string())
            }
        }
    }
}

impl SizeLoader for ProbeSizeLoader {
    fn load(&self, src: String, on_loaded: SizeCallback) {
        let Some(src) = self.resolve_source(&src) else {
            log::debug!("跳过非网络来源，保留占位尺寸 - {}", redact_url_for_log(&src));
            return;
        };
        let probe = Arc::clone(&self.probe);

        self.runtime.spawn(async move {
            match probe.probe(&src).await {
                Ok(dimensions) => on_loaded(Size::new(
                    f64::from(dimensions.width),
                    f64::from(dimensions.height),
                )),
                Err(err) => log::warn!(
                    "⚠️ 尺寸探测失败，保留占位尺寸 [{}] - {}：{}",
                    err.code(),
                    redact_url_for_log(&src),
                    err
                ),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::ProbeConfig;
    use base64::{Engine as _, engine::general_purpose};
    use image::{DynamicImage, ImageBuffer, ImageFormat, Rgba};
    use std::io::{Cursor, Read, Write};
    use std::net::TcpListener;
    use std::thread;
    use std::time::Duration;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = ImageBuffer::from_pixel(width, height, Rgba([0u8, 0, 0, 255]));
        let mut cursor = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut cursor, ImageFormat::Png)
            .expect("encode test png");
        cursor.into_inner()
    }

    fn png_data_url(width: u32, height: u32) -> String {
        format!("data:image/png;base64,{}", general_purpose::STANDARD.encode(png_bytes(width, height)))
    }

    fn loopback_allowed() -> Arc<DimensionProbe> {
        Arc::new(
            DimensionProbe::new(ProbeConfig {
                allow_private_network: true,
                ..ProbeConfig::default()
            })
            .expect("probe init failed"),
        )
    }

    /// 调度一次加载，返回回调收到的尺寸；回调被丢弃时为 `None`。
    async fn load_once(loader: &ProbeSizeLoader, src: String) -> Option<Size> {
        let (tx, rx) = tokio::sync::oneshot::channel::<Size>();
        loader.load(
            src,
            Box::new(move |size| {
                let _ = tx.send(size);
            }),
        );

        tokio::time::timeout(Duration::from_secs(5), rx)
            .await
            .expect("load timed out")
            .ok()
    }

    #[tokio::test]
    async fn inline_image_reports_natural_size() {
        let loader = ProbeSizeLoader::on_current_runtime(loopback_allowed()).expect("runtime handle");

        let size = load_once(&loader, png_data_url(30, 20)).await;
        assert_eq!(size, Some(Size::new(30.0, 20.0)));
    }

    #[tokio::test]
    async fn failed_load_drops_callback() {
        let probe = Arc::new(DimensionProbe::new(ProbeConfig::default()).expect("probe init failed"));
        let loader = ProbeSizeLoader::on_current_runtime(probe).expect("runtime handle");

        // 默认配置拒绝回环地址，探测失败，回调被丢弃。
        let size = load_once(&loader, "http://127.0.0.1:9/a.png".to_string()).await;
        assert_eq!(size, None);
    }

    #[tokio::test]
    async fn local_file_source_is_never_read() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("private.png");
        std::fs::write(&path, png_bytes(8, 8)).expect("write png");
        let loader = ProbeSizeLoader::on_current_runtime(loopback_allowed()).expect("runtime handle");

        let bare = path.to_string_lossy().into_owned();
        let file_url = format!("file://{}", bare);

        assert_eq!(load_once(&loader, bare).await, None);
        assert_eq!(load_once(&loader, file_url).await, None);
        assert_eq!(load_once(&loader, "private.png".to_string()).await, None);
    }

    #[tokio::test]
    async fn non_image_data_url_is_skipped() {
        let loader = ProbeSizeLoader::on_current_runtime(loopback_allowed()).expect("runtime handle");

        let result = load_once(&loader, "data:text/plain;base64,aGVsbG8=".to_string()).await;
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn relative_source_resolves_against_base_url() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind test server failed");
        let port = listener.local_addr().expect("read local addr failed").port();
        let body = png_bytes(64, 48);
        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accept failed");
            let mut request = [0u8; 1024];
            let read = stream.read(&mut request).expect("read request failed");
            let request = String::from_utf8_lossy(&request[..read]).into_owned();

            let headers = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: image/png\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            stream.write_all(headers.as_bytes()).expect("write headers failed");
            let _ = stream.write_all(&body);
            request
        });

        let base = Url::parse(&format!("http://127.0.0.1:{}/u/alice/", port)).expect("base url");
        let loader = ProbeSizeLoader::on_current_runtime(loopback_allowed())
            .expect("runtime handle")
            .with_base_url(base);

        let size = load_once(&loader, "a.png".to_string()).await;
        let request = server.join().expect("server thread failed");

        assert_eq!(size, Some(Size::new(64.0, 48.0)));
        assert!(request.starts_with("GET /u/alice/a.png "));
    }

    #[test]
    fn loader_requires_runtime() {
        let probe = Arc::new(DimensionProbe::new(ProbeConfig::default()).expect("probe init failed"));
        assert!(matches!(
            ProbeSizeLoader::on_current_runtime(probe),
            Err(LightboxError::Runtime(_))
        ));
    }
}
