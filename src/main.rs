//! # lightbox-normalize — 命令行入口
//!
//! 读取一组附件条目（JSON 数组，文件或标准输入），按灯箱的规则规范化，
//! 对没有尺寸的条目做一次头部探测，输出交给引擎的最终条目。
//!
//! ```text
//! lightbox-normalize items.json
//! cat items.json | lightbox-normalize
//! ```

use std::io::Read;
use std::process::ExitCode;
use std::sync::Arc;

use attachment_lightbox::error::AppError;
use attachment_lightbox::lightbox::{
    NoThumbnails, NormalizedImageItem, NormalizerConfig, RawImageItem, Size, normalize,
};
use attachment_lightbox::probe::{DimensionProbe, ProbeConfig};

fn read_input(path: Option<String>) -> Result<String, AppError> {
    match path {
        Some(path) => Ok(std::fs::read_to_string(path)?),
        None => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            Ok(buffer)
        }
    }
}

fn parse_items(input: &str) -> Result<Vec<RawImageItem>, AppError> {
    serde_json::from_str(input).map_err(|e| AppError::InvalidInput(format!("解析条目失败: {}", e)))
}

async fn run(path: Option<String>) -> Result<Vec<NormalizedImageItem>, AppError> {
    let input = read_input(path)?;
    let items = parse_items(&input)?;

    let normalized = normalize(&items, &NoThumbnails, &NormalizerConfig::default());
    log::info!(
        "📋 已规范化 {} 个条目，{} 个需要探测尺寸",
        normalized.slides.len(),
        normalized.pending.len()
    );

    let probe = Arc::new(DimensionProbe::new(ProbeConfig::default())?);
    let mut tasks = Vec::with_capacity(normalized.pending.len());
    for pending in normalized.pending {
        let probe = Arc::clone(&probe);
        tasks.push(tokio::spawn(async move {
            match probe.probe(&pending.src).await {
                Ok(dimensions) => pending.slide.set_size(Size::new(
                    f64::from(dimensions.width),
                    f64::from(dimensions.height),
                )),
                Err(e) => log::warn!("⚠️ 第 {} 个条目尺寸探测失败: {}", pending.index, e),
            }
        }));
    }

    for task in tasks {
        if let Err(e) = task.await {
            log::warn!("⚠️ 探测任务异常结束: {}", e);
        }
    }

    Ok(normalized.slides.iter().map(|slide| slide.snapshot()).collect())
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let path = std::env::args().nth(1);
    match run(path).await {
        Ok(items) => match serde_json::to_string_pretty(&items) {
            Ok(json) => {
                println!("{json}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                log::error!("❌ 序列化结果失败: {}", e);
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            log::error!("❌ {}", e);
            ExitCode::FAILURE
        }
    }
}
