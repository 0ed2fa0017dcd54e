//! 流水线运行结果

use crate::state_machine::PipelineStage;
use chrono::{DateTime, Utc};
use radflow_core::{Detection, PatientContext, StudyJobStatus, StudyMetadata};
use radflow_dicom::ValidationResult;
use radflow_report::{Report, ReportValidation};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 单次运行的最终结果，总是二者之一
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PipelineResult {
    Completed(PipelineSuccess),
    Failed(PipelineFailure),
}

impl PipelineResult {
    pub fn run_id(&self) -> &str {
        match self {
            PipelineResult::Completed(success) => &success.run_id,
            PipelineResult::Failed(failure) => &failure.run_id,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, PipelineResult::Completed(_))
    }

    /// 对应的任务查询状态
    pub fn status(&self) -> StudyJobStatus {
        match self {
            PipelineResult::Completed(_) => StudyJobStatus::Completed,
            PipelineResult::Failed(_) => StudyJobStatus::Failed,
        }
    }

    pub fn as_success(&self) -> Option<&PipelineSuccess> {
        match self {
            PipelineResult::Completed(success) => Some(success),
            PipelineResult::Failed(_) => None,
        }
    }

    pub fn as_failure(&self) -> Option<&PipelineFailure> {
        match self {
            PipelineResult::Completed(_) => None,
            PipelineResult::Failed(failure) => Some(failure),
        }
    }
}

impl From<&PipelineResult> for StudyJobStatus {
    fn from(result: &PipelineResult) -> Self {
        result.status()
    }
}

/// 成功运行的完整结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSuccess {
    pub run_id: String,
    pub completed_at: DateTime<Utc>,
    pub processing_time_seconds: f64,
    pub dicom_metadata: StudyMetadata,
    pub patient_info: PatientContext,
    pub detections: Vec<Detection>,
    pub report: Report,
    pub validation: ReportValidation,
    pub output_files: OutputFiles,
}

/// 写出的结果文件路径
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutputFiles {
    pub canonical_image: PathBuf,
    pub detection_visualization: PathBuf,
    pub report_text: PathBuf,
    pub report_json: PathBuf,
}

/// 失败类别
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    InvalidInput,    // 输入无法读取或未通过验证
    ProcessingError, // 后续阶段出错
}

/// 失败运行的结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineFailure {
    pub run_id: String,
    pub failed_at: DateTime<Utc>,
    pub reason: FailureReason,
    pub message: String,
    pub failed_stage: PipelineStage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationResult>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_serializes_with_status_tag() {
        let result = PipelineResult::Failed(PipelineFailure {
            run_id: "run-1".to_string(),
            failed_at: Utc::now(),
            reason: FailureReason::InvalidInput,
            message: "Invalid DICOM file".to_string(),
            failed_stage: PipelineStage::Reading,
            validation: Some(ValidationResult::failed("No pixel data found".to_string())),
        });

        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["status"], "failed");
        assert_eq!(value["reason"], "invalid_input");
        assert_eq!(value["failed_stage"], "reading");
        assert_eq!(value["validation"]["errors"][0], "No pixel data found");

        assert_eq!(StudyJobStatus::from(&result), StudyJobStatus::Failed);
        assert_eq!(result.run_id(), "run-1");
        assert!(result.as_success().is_none());
    }
}
