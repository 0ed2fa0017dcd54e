//! 像素规范化
//!
//! 将DICOM像素数据解码为8位单通道灰度图：先线性拉伸到 [0,255]，
//! 对 MONOCHROME1 再做反转（退化图像除外）。位图来源已经是8位灰度，直接透传。

use crate::parser::{ParsedDicomObject, ParsedStudy, PixelData};
use crate::transfer_syntax::TransferSyntaxManager;
use radflow_core::{CanonicalImage, RadflowError, Result};
use tracing::{debug, info};

/// 图像规范化器
pub struct ImageNormalizer {
    transfer_syntax_manager: TransferSyntaxManager,
}

impl Default for ImageNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageNormalizer {
    pub fn new() -> Self {
        Self {
            transfer_syntax_manager: TransferSyntaxManager::new(),
        }
    }

    /// 生成规范化图像
    pub fn normalize(&self, study: &ParsedStudy) -> Result<CanonicalImage> {
        match study {
            ParsedStudy::Raster(raster) => Ok(raster.image.clone()),
            ParsedStudy::Dicom(obj) => self.normalize_dicom(obj),
        }
    }

    /// 解码并规范化DICOM像素数据
    pub fn normalize_dicom(&self, obj: &ParsedDicomObject) -> Result<CanonicalImage> {
        let layout = PixelLayout::from_object(obj)?;

        let bytes = match &obj.pixel_data {
            Some(PixelData::Native(bytes)) => bytes,
            Some(PixelData::Encapsulated) => {
                let uid = obj.transfer_syntax_uid.as_deref().unwrap_or("");
                return Err(RadflowError::Dicom(format!(
                    "不支持的压缩像素数据: {} ({})",
                    uid,
                    self.transfer_syntax_manager.get_name(uid)
                )));
            }
            None => return Err(RadflowError::Dicom("缺少像素数据".to_string())),
        };

        let samples = layout.decode_first_frame(bytes)?;
        let mut pixels = rescale_intensities(&samples);

        // 退化图像保持全零
        if obj.is_inverted() && pixels.iter().any(|&v| v != 0) {
            debug!("MONOCHROME1 图像，执行反转");
            invert_intensities(&mut pixels);
        }

        info!("像素规范化完成: {}x{}", layout.columns, layout.rows);
        CanonicalImage::new(layout.columns, layout.rows, pixels)
    }
}

/// 线性拉伸到 [0,255]
///
/// `round((v - min) / (max - min) * 255)`，当 max == min 时输出全零。
pub fn rescale_intensities(values: &[f64]) -> Vec<u8> {
    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });

    if values.is_empty() || max <= min {
        return vec![0; values.len()];
    }

    let range = max - min;
    values
        .iter()
        .map(|&v| ((v - min) / range * 255.0).round().clamp(0.0, 255.0) as u8)
        .collect()
}

/// 逐像素 `255 - v`
pub fn invert_intensities(pixels: &mut [u8]) {
    for value in pixels.iter_mut() {
        *value = 255 - *value;
    }
}

/// 像素数据的存储布局
#[derive(Debug, Clone, Copy)]
struct PixelLayout {
    rows: u32,
    columns: u32,
    bits_allocated: u32,
    bits_stored: u32,
    signed: bool,
    samples_per_pixel: u32,
    planar: bool,
}

impl PixelLayout {
    fn from_object(obj: &ParsedDicomObject) -> Result<Self> {
        let rows = positive(obj.rows, "Rows")?;
        let columns = positive(obj.columns, "Columns")?;
        let bits_allocated = obj.bits_allocated.unwrap_or(8).max(0) as u32;
        if !matches!(bits_allocated, 8 | 16 | 32) {
            return Err(RadflowError::Dicom(format!(
                "不支持的分配位数: {}",
                bits_allocated
            )));
        }

        let bits_stored = match obj.bits_stored {
            Some(bits) if bits > 0 && (bits as u32) <= bits_allocated => bits as u32,
            _ => bits_allocated,
        };

        let samples_per_pixel = obj.samples_per_pixel.unwrap_or(1).max(1) as u32;
        if !matches!(samples_per_pixel, 1 | 3) {
            return Err(RadflowError::Dicom(format!(
                "不支持的每像素采样数: {}",
                samples_per_pixel
            )));
        }

        Ok(Self {
            rows,
            columns,
            bits_allocated,
            bits_stored,
            signed: obj.pixel_representation == Some(1),
            samples_per_pixel,
            planar: obj.planar_configuration == Some(1),
        })
    }

    fn pixel_count(&self) -> usize {
        self.rows as usize * self.columns as usize
    }

    /// 解码第一帧为灰度采样值
    fn decode_first_frame(&self, bytes: &[u8]) -> Result<Vec<f64>> {
        let bytes_per_sample = (self.bits_allocated / 8) as usize;
        let sample_count = self.pixel_count() * self.samples_per_pixel as usize;
        let frame_len = sample_count * bytes_per_sample;

        if bytes.len() < frame_len {
            return Err(RadflowError::Dicom(format!(
                "像素数据长度不足: 需要 {} bytes，实际 {} bytes",
                frame_len,
                bytes.len()
            )));
        }

        let samples: Vec<f64> = bytes[..frame_len]
            .chunks_exact(bytes_per_sample)
            .map(|chunk| self.decode_sample(chunk))
            .collect();

        if self.samples_per_pixel == 1 {
            return Ok(samples);
        }

        Ok(self.to_luma(&samples))
    }

    fn decode_sample(&self, chunk: &[u8]) -> f64 {
        let raw: u32 = match chunk.len() {
            1 => chunk[0] as u32,
            2 => u16::from_le_bytes([chunk[0], chunk[1]]) as u32,
            _ => u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]),
        };

        let stored = if self.bits_stored >= 32 {
            raw
        } else {
            raw & ((1u32 << self.bits_stored) - 1)
        };

        if self.signed {
            let shift = 32 - self.bits_stored;
            (((stored << shift) as i32) >> shift) as f64
        } else {
            stored as f64
        }
    }

    /// RGB采样转灰度 (ITU-R BT.601)
    fn to_luma(&self, samples: &[f64]) -> Vec<f64> {
        let count = self.pixel_count();
        (0..count)
            .map(|i| {
                let (r, g, b) = if self.planar {
                    (samples[i], samples[count + i], samples[2 * count + i])
                } else {
                    (samples[3 * i], samples[3 * i + 1], samples[3 * i + 2])
                };
                0.299 * r + 0.587 * g + 0.114 * b
            })
            .collect()
    }
}

fn positive(value: Option<i32>, name: &str) -> Result<u32> {
    match value {
        Some(v) if v > 0 => Ok(v as u32),
        _ => Err(RadflowError::Dicom(format!("图像尺寸无效: {} = {:?}", name, value))),
    }
}
