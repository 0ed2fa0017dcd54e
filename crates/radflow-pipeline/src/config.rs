//! 流水线配置
//!
//! 按 默认值 -> 配置文件 -> 环境变量 (RADFLOW__*) 的顺序加载

use config::{Config, Environment, File};
use radflow_core::{RadflowError, Result};
use radflow_detection::DEFAULT_CONFIDENCE_THRESHOLD;
use radflow_report::DEFAULT_LOCATION;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// 环境变量前缀
pub const ENV_PREFIX: &str = "RADFLOW";

/// 流水线配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    /// 检测置信度阈值
    pub confidence_threshold: f64,
    /// 报告模板中的位置占位符取值
    pub location: String,
    /// 检测推理超时（毫秒），为空时不限时
    pub inference_timeout_ms: Option<u64>,
    /// 是否启用严格的报告一致性检查
    pub strict_report_validation: bool,
    /// 自定义模板表（JSON）路径
    pub templates_path: Option<String>,
    /// 输出文件名
    pub artifacts: ArtifactNames,
}

/// 输出文件名配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ArtifactNames {
    /// 规范化图像快照
    pub canonical_image: String,
    /// 检测叠加图
    pub detection_visualization: String,
    /// 纯文本报告
    pub report_text: String,
    /// 结构化结果
    pub report_json: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            location: DEFAULT_LOCATION.to_string(),
            inference_timeout_ms: None,
            strict_report_validation: false,
            templates_path: None,
            artifacts: ArtifactNames::default(),
        }
    }
}

impl Default for ArtifactNames {
    fn default() -> Self {
        Self {
            canonical_image: "temp_image.png".to_string(),
            detection_visualization: "detections_visualized.png".to_string(),
            report_text: "report.txt".to_string(),
            report_json: "complete_result.json".to_string(),
        }
    }
}

impl PipelineConfig {
    /// 加载配置，文件可选
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = config_path {
            info!("加载配置文件: {:?}", path);
            builder = builder.add_source(File::from(path));
        }

        let settings = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| RadflowError::Config(format!("无法加载配置: {}", e)))?;

        let config: PipelineConfig = settings
            .try_deserialize()
            .map_err(|e| RadflowError::Config(format!("配置格式错误: {}", e)))?;

        config.validate()?;
        debug!("流水线配置: {:?}", config);
        Ok(config)
    }

    /// 校验配置取值
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(RadflowError::Config(format!(
                "置信度阈值必须在 [0,1] 之间: {}",
                self.confidence_threshold
            )));
        }

        if self.inference_timeout_ms == Some(0) {
            return Err(RadflowError::Config("推理超时必须大于0".to_string()));
        }

        let names = [
            &self.artifacts.canonical_image,
            &self.artifacts.detection_visualization,
            &self.artifacts.report_text,
            &self.artifacts.report_json,
        ];
        if names.iter().any(|name| name.trim().is_empty()) {
            return Err(RadflowError::Config("输出文件名不能为空".to_string()));
        }

        Ok(())
    }

    /// 推理超时
    pub fn inference_timeout(&self) -> Option<Duration> {
        self.inference_timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.confidence_threshold, 0.3);
        assert_eq!(config.location, "lung field");
        assert_eq!(config.inference_timeout(), None);
        assert!(!config.strict_report_validation);
        assert_eq!(config.artifacts.report_json, "complete_result.json");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("radflow-config-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(
            &path,
            "confidence_threshold = 0.5\ninference_timeout_ms = 2500\n\n[artifacts]\nreport_text = \"findings.txt\"\n",
        )
        .unwrap();

        let config = PipelineConfig::load(Some(&path)).unwrap();
        assert_eq!(config.confidence_threshold, 0.5);
        assert_eq!(config.inference_timeout(), Some(Duration::from_millis(2500)));
        assert_eq!(config.artifacts.report_text, "findings.txt");
        assert_eq!(config.artifacts.report_json, "complete_result.json");
        assert_eq!(config.location, "lung field");

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_invalid_values_rejected() {
        let config = PipelineConfig {
            confidence_threshold: 1.5,
            ..PipelineConfig::default()
        };
        assert!(matches!(config.validate(), Err(RadflowError::Config(_))));

        let config = PipelineConfig {
            inference_timeout_ms: Some(0),
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
