//! 核心数据模型定义

use crate::error::{RadflowError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 未知字段的默认取值
pub const UNKNOWN: &str = "Unknown";

/// 影像来源格式
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Dicom,  // DICOM文件
    Raster, // PNG/JPEG等普通位图
}

/// 影像数据载体
#[derive(Debug, Clone)]
pub enum StudySource {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

/// 上传层交给流水线的原始检查
///
/// 创建后不可变，每次流水线运行只消费一次。
#[derive(Debug, Clone)]
pub struct RawStudy {
    kind: SourceKind,
    source: StudySource,
}

impl RawStudy {
    /// 从DICOM文件路径创建
    pub fn dicom_file(path: impl Into<PathBuf>) -> Self {
        Self {
            kind: SourceKind::Dicom,
            source: StudySource::Path(path.into()),
        }
    }

    /// 从DICOM字节数据创建
    pub fn dicom_bytes(data: Vec<u8>) -> Self {
        Self {
            kind: SourceKind::Dicom,
            source: StudySource::Bytes(data),
        }
    }

    /// 从位图文件路径创建
    pub fn raster_file(path: impl Into<PathBuf>) -> Self {
        Self {
            kind: SourceKind::Raster,
            source: StudySource::Path(path.into()),
        }
    }

    /// 从位图字节数据创建
    pub fn raster_bytes(data: Vec<u8>) -> Self {
        Self {
            kind: SourceKind::Raster,
            source: StudySource::Bytes(data),
        }
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    pub fn source(&self) -> &StudySource {
        &self.source
    }

    /// 用于日志的简短描述
    pub fn describe(&self) -> String {
        match &self.source {
            StudySource::Path(path) => path.display().to_string(),
            StudySource::Bytes(data) => format!("<{} bytes>", data.len()),
        }
    }
}

/// 从检查中提取的元数据
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StudyMetadata {
    pub patient_id: String,          // 患者ID，缺失时为 "Unknown"
    pub patient_name: String,        // 患者姓名，缺失时为 "Unknown"
    pub patient_age: Option<u32>,    // 由年龄字符串解析，无法解析时为空
    pub patient_sex: String,         // 患者性别，缺失时为 "Unknown"
    pub study_date: String,          // 检查日期，缺失时为空串
    pub modality: String,            // 模态代码 (CR, DX, CT, MR等)
    pub rows: u32,                   // 图像行数
    pub columns: u32,                // 图像列数
}

impl Default for StudyMetadata {
    fn default() -> Self {
        Self {
            patient_id: UNKNOWN.to_string(),
            patient_name: UNKNOWN.to_string(),
            patient_age: None,
            patient_sex: UNKNOWN.to_string(),
            study_date: String::new(),
            modality: String::new(),
            rows: 0,
            columns: 0,
        }
    }
}

/// 报告生成所需的患者上下文
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatientContext {
    pub age: Option<u32>,
    pub sex: String,
    pub patient_id: String,
}

impl From<&StudyMetadata> for PatientContext {
    fn from(metadata: &StudyMetadata) -> Self {
        Self {
            age: metadata.patient_age,
            sex: metadata.patient_sex.clone(),
            patient_id: metadata.patient_id.clone(),
        }
    }
}

/// 规范化后的单通道8位灰度图像，按行优先存储
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl CanonicalImage {
    /// 创建图像，像素数量必须与尺寸一致
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize;
        if pixels.len() != expected {
            return Err(RadflowError::Image(format!(
                "像素数量 {} 与尺寸 {}x{} 不匹配",
                pixels.len(),
                width,
                height
            )));
        }

        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// 全零图像
    pub fn zeros(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// 获取 (x, y) 处的像素值
    pub fn get(&self, x: u32, y: u32) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }
}

/// 轴对齐包围盒，坐标为规范化图像的像素坐标
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BoundingBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl BoundingBox {
    /// 创建包围盒，保证 x1 <= x2 且 y1 <= y2
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self {
            x1: x1.min(x2),
            y1: y1.min(y2),
            x2: x1.max(x2),
            y2: y1.max(y2),
        }
    }
}

/// 检测模型输出的原始结果
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RawDetection {
    pub confidence: f64,
    pub bbox: BoundingBox,
}

/// 紧急程度分级
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    High,     // 高
    Moderate, // 中
    Low,      // 低
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::High => "high",
            Urgency::Moderate => "moderate",
            Urgency::Low => "low",
        }
    }
}

impl std::fmt::Display for Urgency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 经过后处理的检测结果
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Detection {
    pub finding: String,
    pub confidence: f64,
    pub bbox: BoundingBox,
    pub urgency: Urgency,
}

impl Detection {
    /// 叠加图上显示的标签，置信度保留两位小数
    pub fn label(&self) -> String {
        format!("{} {:.2}", self.finding, self.confidence)
    }
}

/// 任务查询状态
///
/// 由外部任务管理层使用，区分未知任务、未完成、成功和失败。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StudyJobStatus {
    NotFound,  // 未知任务
    NotReady,  // 处理中
    Completed, // 已完成
    Failed,    // 已失败
}
