//! # 尺寸解析模块
//!
//! 只读取图片头部得到自然尺寸，不做完整解码。
//! 头部声明的像素数先与上限比较，异常尺寸直接拒绝。

use image::ImageReader;
use serde::{Deserialize, Serialize};
use std::io::Cursor;

use super::{ProbeConfig, ProbeError};

/// 图片自然尺寸（像素）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

/// 仅通过内存中的图片头信息读取宽高。
pub(crate) fn inspect_dimensions_from_memory(bytes: &[u8]) -> Result<ImageDimensions, ProbeError> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| ProbeError::InvalidFormat(format!("无法识别图片格式：{}", e)))?;

    if reader.format().is_none() {
        return Err(ProbeError::InvalidFormat("不支持的图片格式".to_string()));
    }

    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| ProbeError::Decode(format!("无法读取图片尺寸：{}", e)))?;

    if width == 0 || height == 0 {
        return Err(ProbeError::Decode(format!("图片尺寸无效：{}x{}", width, height)));
    }

    Ok(ImageDimensions { width, height })
}

/// 校验头部声明的像素数量是否超过配置上限。
pub(crate) fn validate_pixel_limits(
    config: &ProbeConfig,
    dimensions: ImageDimensions,
) -> Result<(), ProbeError> {
    let pixels = (dimensions.width as u64)
        .checked_mul(dimensions.height as u64)
        .ok_or_else(|| ProbeError::ResourceLimit("图片像素数溢出".to_string()))?;

    if pixels > config.max_header_pixels {
        return Err(ProbeError::ResourceLimit(format!(
            "图片像素过大：{} 像素（限制：{} 像素）",
            pixels, config.max_header_pixels
        )));
    }

    Ok(())
}
