//! 检查数据验证模块
//!
//! 在进入规范化之前检查必需标签和像素数据。所有检查相互独立，
//! 不会在第一个错误处停止。

use crate::parser::{ParsedDicomObject, ParsedStudy, PixelData, RasterStudy};
use crate::transfer_syntax::TransferSyntaxManager;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// 支持的模态
pub const SUPPORTED_MODALITIES: [&str; 4] = ["CR", "DX", "CT", "MR"];

/// 检查数据验证器
pub struct StudyValidator {
    transfer_syntax_manager: TransferSyntaxManager,
}

impl Default for StudyValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl StudyValidator {
    /// 创建新的验证器
    pub fn new() -> Self {
        Self {
            transfer_syntax_manager: TransferSyntaxManager::new(),
        }
    }

    /// 按来源类型验证
    pub fn validate(&self, study: &ParsedStudy) -> ValidationResult {
        match study {
            ParsedStudy::Dicom(obj) => self.validate_dicom_object(obj),
            ParsedStudy::Raster(raster) => self.validate_raster(raster),
        }
    }

    /// 验证DICOM对象
    pub fn validate_dicom_object(&self, obj: &ParsedDicomObject) -> ValidationResult {
        let mut result = ValidationResult::new();

        info!("开始验证DICOM对象: {}", obj.get_summary());

        // 1. 必需的识别标签
        self.validate_required_tags(obj, &mut result);

        // 2. 像素数据
        self.validate_pixel_data(obj, &mut result);

        // 3. 模态
        self.validate_modality(obj, &mut result);

        // 4. 传输语法
        self.validate_transfer_syntax(obj, &mut result);

        info!(
            "DICOM对象验证完成: {} 个错误, {} 个警告",
            result.errors.len(),
            result.warnings.len()
        );

        result
    }

    /// 验证位图
    pub fn validate_raster(&self, raster: &RasterStudy) -> ValidationResult {
        let mut result = ValidationResult::new();
        if raster.image.is_empty() {
            result.add_error("No pixel data found".to_string());
        }
        result
    }

    fn validate_required_tags(&self, obj: &ParsedDicomObject, result: &mut ValidationResult) {
        let required_tags = [
            ("PatientID", obj.patient_id.as_ref()),
            ("Modality", obj.modality.as_ref()),
        ];

        for (name, value) in required_tags {
            match value {
                Some(value) if !value.trim().is_empty() => {
                    debug!("{} 验证通过: {}", name, value);
                }
                Some(_) => {
                    result.add_warning(format!("Tag {} is present but empty", name));
                }
                None => {
                    result.add_error(format!("Missing required tag: {}", name));
                }
            }
        }
    }

    fn validate_pixel_data(&self, obj: &ParsedDicomObject, result: &mut ValidationResult) {
        match &obj.pixel_data {
            None => result.add_error("No pixel data found".to_string()),
            Some(PixelData::Native(bytes)) if bytes.is_empty() => {
                result.add_warning("Pixel data element is empty".to_string());
            }
            Some(_) => {}
        }

        if obj.has_pixel_data() {
            match (obj.rows, obj.columns) {
                (Some(rows), Some(columns)) if rows > 0 && columns > 0 => {}
                _ => result.add_warning("Image dimensions are missing or not positive".to_string()),
            }
        }
    }

    fn validate_modality(&self, obj: &ParsedDicomObject, result: &mut ValidationResult) {
        if let Some(modality) = &obj.modality {
            if !modality.trim().is_empty() && !SUPPORTED_MODALITIES.contains(&modality.as_str()) {
                result.add_warning(format!("Modality {} is not in the supported set", modality));
            }
        }
    }

    fn validate_transfer_syntax(&self, obj: &ParsedDicomObject, result: &mut ValidationResult) {
        if let Some(uid) = &obj.transfer_syntax_uid {
            if self.transfer_syntax_manager.is_compressed(uid) {
                result.add_warning(format!(
                    "Compressed transfer syntax {} ({}) cannot be decoded",
                    uid,
                    self.transfer_syntax_manager.get_name(uid)
                ));
            }
        }
    }
}

/// 验证结果
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValidationResult {
    /// 是否通过验证
    pub is_valid: bool,
    /// 验证错误列表
    pub errors: Vec<String>,
    /// 验证警告列表
    pub warnings: Vec<String>,
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidationResult {
    /// 创建新的验证结果
    pub fn new() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// 单个错误的失败结果
    pub fn failed(error: String) -> Self {
        let mut result = Self::new();
        result.add_error(error);
        result
    }

    /// 添加错误
    pub fn add_error(&mut self, error: String) {
        self.is_valid = false;
        self.errors.push(error);
    }

    /// 添加警告
    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// 获取验证报告摘要
    pub fn get_summary(&self) -> String {
        if self.is_valid {
            if self.has_warnings() {
                format!("验证通过，但有 {} 个警告", self.warnings.len())
            } else {
                "验证完全通过".to_string()
            }
        } else {
            format!(
                "验证失败：{} 个错误，{} 个警告",
                self.errors.len(),
                self.warnings.len()
            )
        }
    }
}
