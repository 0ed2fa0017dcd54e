//! # DICOM读取与规范化模块
//!
//! 读取DICOM或位图检查，验证必需标签，并将像素数据规范化为8位灰度图。

pub mod normalizer;
pub mod parser;
pub mod transfer_syntax;
pub mod validator;

pub use normalizer::{invert_intensities, rescale_intensities, ImageNormalizer};
pub use parser::{ParsedDicomObject, ParsedStudy, PixelData, RasterStudy, StudyReader};
pub use transfer_syntax::TransferSyntaxManager;
pub use validator::{StudyValidator, ValidationResult, SUPPORTED_MODALITIES};
