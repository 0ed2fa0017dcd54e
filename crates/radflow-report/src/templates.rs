//! 报告模板表

use radflow_core::{Detection, RadflowError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

/// 位置占位符
pub const LOCATION_PLACEHOLDER: &str = "{location}";

/// 模板类别
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TemplateKind {
    NoFindings,          // 无阳性发现
    AbnormalityDetected, // 存在异常
}

impl TemplateKind {
    /// 有任意检测即选择异常模板
    pub fn for_detections(detections: &[Detection]) -> Self {
        if detections.is_empty() {
            TemplateKind::NoFindings
        } else {
            TemplateKind::AbnormalityDetected
        }
    }

    pub fn all() -> [TemplateKind; 2] {
        [TemplateKind::NoFindings, TemplateKind::AbnormalityDetected]
    }
}

/// 单个报告模板
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReportTemplate {
    pub findings: String,
    pub impression: String,
    #[serde(default)]
    pub recommendations: String,
}

impl ReportTemplate {
    /// 替换位置占位符
    pub fn fill(&self, location: &str) -> ReportTemplate {
        ReportTemplate {
            findings: self.findings.replace(LOCATION_PLACEHOLDER, location),
            impression: self.impression.replace(LOCATION_PLACEHOLDER, location),
            recommendations: self.recommendations.replace(LOCATION_PLACEHOLDER, location),
        }
    }
}

/// 模板表
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct TemplateTable {
    templates: HashMap<TemplateKind, ReportTemplate>,
}

impl Default for TemplateTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl TemplateTable {
    /// 内置模板
    pub fn builtin() -> Self {
        let mut templates = HashMap::new();

        templates.insert(
            TemplateKind::NoFindings,
            ReportTemplate {
                findings: "The lungs are clear without focal consolidation, pleural effusion, or pneumothorax. Heart size is normal. Bony structures are intact.".to_string(),
                impression: "No acute cardiopulmonary abnormality.".to_string(),
                recommendations: "No immediate follow-up required.".to_string(),
            },
        );

        templates.insert(
            TemplateKind::AbnormalityDetected,
            ReportTemplate {
                findings: "An opacity is identified in the {location}. The remainder of the lung fields are clear. No pleural effusion or pneumothorax. Heart size is within normal limits.".to_string(),
                impression: "Finding present in {location}. Differential diagnosis includes infectious process, inflammatory change, or mass lesion.".to_string(),
                recommendations: "Clinical correlation is advised. Consider follow-up imaging or comparison with prior studies if available.".to_string(),
            },
        );

        Self { templates }
    }

    /// 从JSON字符串加载，必须包含全部模板类别
    pub fn from_json_str(content: &str) -> Result<Self> {
        let table: TemplateTable = serde_json::from_str(content)?;
        table.ensure_complete()?;
        Ok(table)
    }

    /// 从JSON文件加载
    pub async fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await?;
        let table = Self::from_json_str(&content)?;
        info!("从 {:?} 加载报告模板表", path);
        Ok(table)
    }

    /// 获取模板
    pub fn get(&self, kind: TemplateKind) -> Result<&ReportTemplate> {
        self.templates
            .get(&kind)
            .ok_or_else(|| RadflowError::Report(format!("缺少报告模板: {:?}", kind)))
    }

    /// 替换或新增模板
    pub fn insert(&mut self, kind: TemplateKind, template: ReportTemplate) {
        self.templates.insert(kind, template);
    }

    fn ensure_complete(&self) -> Result<()> {
        for kind in TemplateKind::all() {
            if !self.templates.contains_key(&kind) {
                return Err(RadflowError::Config(format!("模板表缺少类别: {:?}", kind)));
            }
        }
        Ok(())
    }
}
