//! 检查读取器
//!
//! 读取DICOM或位图来源，提取元数据和原始像素数据

use dicom::core::value::{PrimitiveValue, Value};
use dicom::core::Tag;
use dicom::dictionary_std::tags;
use dicom::object::{DefaultDicomObject, OpenFileOptions};
use radflow_core::utils::parse_patient_age;
use radflow_core::{
    CanonicalImage, RadflowError, RawStudy, Result, SourceKind, StudyMetadata, StudySource,
    UNKNOWN,
};
use std::path::Path;
use tracing::{debug, error, info, warn};

/// 非DICOM来源的模态代码
pub const RASTER_MODALITY: &str = "OT";

/// 检查读取器
pub struct StudyReader;

impl Default for StudyReader {
    fn default() -> Self {
        Self::new()
    }
}

impl StudyReader {
    /// 创建新的检查读取器
    pub fn new() -> Self {
        Self
    }

    /// 按来源类型读取检查
    pub async fn read(&self, study: &RawStudy) -> Result<ParsedStudy> {
        info!("开始读取检查: {}", study.describe());

        let data = match study.source() {
            StudySource::Path(path) => Self::read_source_file(path).await?,
            StudySource::Bytes(data) => data.clone(),
        };

        match study.kind() {
            SourceKind::Dicom => Self::parse_bytes(&data).map(ParsedStudy::Dicom),
            SourceKind::Raster => Self::decode_raster(&data).map(ParsedStudy::Raster),
        }
    }

    /// 解析DICOM字节数据，前导区可有可无
    pub fn parse_bytes(data: &[u8]) -> Result<ParsedDicomObject> {
        debug!("开始解析DICOM字节数据，大小: {} bytes", data.len());

        let obj = OpenFileOptions::new().from_reader(data).map_err(|e| {
            error!("DICOM数据解析失败: {}", e);
            RadflowError::DicomParseError(format!("Failed to read DICOM: {}", e))
        })?;

        Ok(Self::extract_metadata(&obj))
    }

    /// 解码位图数据为8位灰度图
    pub fn decode_raster(data: &[u8]) -> Result<RasterStudy> {
        let decoded = image::load_from_memory(data).map_err(|e| {
            error!("位图解码失败: {}", e);
            RadflowError::Image(format!("Failed to read image: {}", e))
        })?;

        let gray = decoded.to_luma8();
        let (width, height) = gray.dimensions();
        let image = CanonicalImage::new(width, height, gray.into_raw())?;

        info!("位图解码完成: {}x{}", width, height);
        Ok(RasterStudy { image })
    }

    async fn read_source_file(path: &Path) -> Result<Vec<u8>> {
        tokio::fs::read(path).await.map_err(|e| {
            warn!("无法读取文件 {:?}: {}", path, e);
            RadflowError::DicomParseError(format!("Failed to read {}: {}", path.display(), e))
        })
    }

    /// 从DICOM对象中提取元数据
    fn extract_metadata(obj: &DefaultDicomObject) -> ParsedDicomObject {
        let mut parsed = ParsedDicomObject::default();

        // 患者信息
        parsed.patient_id = Self::get_string_element(obj, tags::PATIENT_ID);
        parsed.patient_name = Self::get_string_element(obj, tags::PATIENT_NAME);
        parsed.patient_sex = Self::get_string_element(obj, tags::PATIENT_SEX);
        parsed.patient_age = Self::get_string_element(obj, tags::PATIENT_AGE);

        // 检查信息
        parsed.study_date = Self::get_string_element(obj, tags::STUDY_DATE);
        parsed.modality = Self::get_string_element(obj, tags::MODALITY);

        // 图像信息
        parsed.rows = Self::get_integer_element(obj, tags::ROWS);
        parsed.columns = Self::get_integer_element(obj, tags::COLUMNS);
        parsed.bits_allocated = Self::get_integer_element(obj, tags::BITS_ALLOCATED);
        parsed.bits_stored = Self::get_integer_element(obj, tags::BITS_STORED);
        parsed.pixel_representation = Self::get_integer_element(obj, tags::PIXEL_REPRESENTATION);
        parsed.samples_per_pixel = Self::get_integer_element(obj, tags::SAMPLES_PER_PIXEL);
        parsed.planar_configuration = Self::get_integer_element(obj, tags::PLANAR_CONFIGURATION);
        parsed.number_of_frames = Self::get_integer_element(obj, tags::NUMBER_OF_FRAMES);
        parsed.photometric_interpretation =
            Self::get_string_element(obj, tags::PHOTOMETRIC_INTERPRETATION);

        parsed.transfer_syntax_uid = Some(
            obj.meta()
                .transfer_syntax()
                .trim_end_matches(['\0', ' '])
                .to_string(),
        );

        parsed.pixel_data = Self::get_pixel_data(obj);

        info!(
            "成功提取DICOM元数据，患者ID: {:?}, 模态: {:?}",
            parsed.patient_id, parsed.modality
        );

        parsed
    }

    /// 获取字符串类型元素的值，去掉DICOM填充字符
    fn get_string_element(obj: &DefaultDicomObject, tag: Tag) -> Option<String> {
        match obj.element(tag) {
            Ok(element) => match element.value() {
                Value::Primitive(PrimitiveValue::Str(s)) => Some(Self::trim_padding(s)),
                Value::Primitive(PrimitiveValue::Strs(strings)) => {
                    strings.first().map(|s| Self::trim_padding(s))
                }
                Value::Primitive(PrimitiveValue::Empty) => Some(String::new()),
                _ => {
                    debug!("标签 {:?} 不是字符串类型", tag);
                    None
                }
            },
            Err(_) => {
                debug!("未找到标签: {:?}", tag);
                None
            }
        }
    }

    /// 获取整数类型元素的值，兼容IS字符串
    fn get_integer_element(obj: &DefaultDicomObject, tag: Tag) -> Option<i32> {
        match obj.element(tag) {
            Ok(element) => match element.value() {
                Value::Primitive(PrimitiveValue::I32(i)) => i.iter().next().copied(),
                Value::Primitive(PrimitiveValue::U32(u)) => u.iter().next().map(|&v| v as i32),
                Value::Primitive(PrimitiveValue::I16(i)) => i.iter().next().map(|&v| v as i32),
                Value::Primitive(PrimitiveValue::U16(u)) => u.iter().next().map(|&v| v as i32),
                Value::Primitive(PrimitiveValue::Str(s)) => s.trim().parse().ok(),
                Value::Primitive(PrimitiveValue::Strs(strings)) => {
                    strings.first().and_then(|s| s.trim().parse().ok())
                }
                _ => {
                    debug!("标签 {:?} 不是整数类型", tag);
                    None
                }
            },
            Err(_) => {
                debug!("未找到标签: {:?}", tag);
                None
            }
        }
    }

    /// 获取像素数据
    fn get_pixel_data(obj: &DefaultDicomObject) -> Option<PixelData> {
        let element = obj.element(tags::PIXEL_DATA).ok()?;
        match element.value() {
            Value::Primitive(value) => Some(PixelData::Native(value.to_bytes().into_owned())),
            Value::PixelSequence(_) => Some(PixelData::Encapsulated),
            _ => {
                warn!("像素数据元素的值类型无法识别");
                None
            }
        }
    }

    fn trim_padding(value: &str) -> String {
        value.trim_end_matches(['\0', ' ']).trim_start().to_string()
    }
}

/// 像素数据
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PixelData {
    /// 未压缩的原始像素字节（小端）
    Native(Vec<u8>),
    /// 封装（压缩）的像素片段
    Encapsulated,
}

/// 解析后的DICOM对象
#[derive(Debug, Clone, Default)]
pub struct ParsedDicomObject {
    // === 患者信息 ===
    /// 患者ID
    pub patient_id: Option<String>,
    /// 患者姓名
    pub patient_name: Option<String>,
    /// 患者性别
    pub patient_sex: Option<String>,
    /// 患者年龄字符串，如 "045Y"
    pub patient_age: Option<String>,

    // === 检查信息 ===
    /// 检查日期
    pub study_date: Option<String>,
    /// 模态
    pub modality: Option<String>,

    // === 图像信息 ===
    pub rows: Option<i32>,
    pub columns: Option<i32>,
    pub bits_allocated: Option<i32>,
    pub bits_stored: Option<i32>,
    pub pixel_representation: Option<i32>,
    pub samples_per_pixel: Option<i32>,
    pub planar_configuration: Option<i32>,
    pub number_of_frames: Option<i32>,
    /// 光度解释，MONOCHROME1 表示低值为亮
    pub photometric_interpretation: Option<String>,

    /// 传输语法UID
    pub transfer_syntax_uid: Option<String>,

    /// 像素数据
    pub pixel_data: Option<PixelData>,
}

impl ParsedDicomObject {
    /// 检查是否包含像素数据
    pub fn has_pixel_data(&self) -> bool {
        self.pixel_data.is_some()
    }

    /// 是否为反转的光度解释
    pub fn is_inverted(&self) -> bool {
        self.photometric_interpretation.as_deref() == Some("MONOCHROME1")
    }

    /// 生成元数据，缺失字段取默认值
    pub fn to_metadata(&self) -> StudyMetadata {
        StudyMetadata {
            patient_id: self.patient_id.clone().unwrap_or_else(|| UNKNOWN.to_string()),
            patient_name: self
                .patient_name
                .clone()
                .unwrap_or_else(|| UNKNOWN.to_string()),
            patient_age: self.patient_age.as_deref().and_then(parse_patient_age),
            patient_sex: self
                .patient_sex
                .clone()
                .unwrap_or_else(|| UNKNOWN.to_string()),
            study_date: self.study_date.clone().unwrap_or_default(),
            modality: self.modality.clone().unwrap_or_default(),
            rows: self.rows.unwrap_or(0).max(0) as u32,
            columns: self.columns.unwrap_or(0).max(0) as u32,
        }
    }

    /// 获取DICOM对象的摘要信息
    pub fn get_summary(&self) -> String {
        format!(
            "DICOM对象: 患者ID={}, 模态={}, 尺寸={}x{}",
            self.patient_id.as_deref().unwrap_or("未知"),
            self.modality.as_deref().unwrap_or("未知"),
            self.columns.unwrap_or(0),
            self.rows.unwrap_or(0)
        )
    }
}

/// 已解码的位图检查
#[derive(Debug, Clone)]
pub struct RasterStudy {
    pub image: CanonicalImage,
}

/// 读取结果
#[derive(Debug, Clone)]
pub enum ParsedStudy {
    Dicom(ParsedDicomObject),
    Raster(RasterStudy),
}

impl ParsedStudy {
    /// 提取检查元数据
    pub fn metadata(&self) -> StudyMetadata {
        match self {
            ParsedStudy::Dicom(obj) => obj.to_metadata(),
            ParsedStudy::Raster(raster) => StudyMetadata {
                modality: RASTER_MODALITY.to_string(),
                rows: raster.image.height(),
                columns: raster.image.width(),
                ..StudyMetadata::default()
            },
        }
    }
}
