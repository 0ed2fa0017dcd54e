//! 报告验证
//!
//! 默认模式下，由生成器产出的报告总是有效。严格模式额外检查模板与检测结果是否一致。

use crate::composer::Report;
use crate::templates::TemplateKind;
use radflow_core::Detection;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// 报告验证结果
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReportValidation {
    pub is_valid: bool,
    pub issues: Vec<String>,
}

/// 报告验证器
#[derive(Debug, Clone, Default)]
pub struct ReportValidator {
    strict: bool,
}

impl ReportValidator {
    pub fn new(strict: bool) -> Self {
        Self { strict }
    }

    /// 验证报告
    pub fn validate(&self, report: &Report, detections: &[Detection]) -> ReportValidation {
        let mut issues = Vec::new();

        if self.strict {
            let expected = TemplateKind::for_detections(detections);
            if report.template != expected {
                issues.push(format!(
                    "Template {:?} does not match {} detection(s)",
                    report.template,
                    detections.len()
                ));
            }

            if report.detections_used.as_slice() != detections {
                issues.push("Report detections differ from pipeline detections".to_string());
            }

            if report.findings.trim().is_empty() || report.impression.trim().is_empty() {
                issues.push("Findings or impression text is empty".to_string());
            }
        }

        for issue in &issues {
            warn!("报告验证问题: {}", issue);
        }

        ReportValidation {
            is_valid: issues.is_empty(),
            issues,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composer::ReportComposer;
    use radflow_core::{BoundingBox, PatientContext, Urgency};

    fn detection() -> Detection {
        Detection {
            finding: "abnormality".to_string(),
            confidence: 0.8,
            bbox: BoundingBox::new(1.0, 1.0, 5.0, 5.0),
            urgency: Urgency::High,
        }
    }

    fn patient() -> PatientContext {
        PatientContext {
            age: None,
            sex: "Unknown".to_string(),
            patient_id: "Unknown".to_string(),
        }
    }

    #[test]
    fn test_default_validator_always_valid() {
        let report = ReportComposer::default().compose(&[], &patient()).unwrap();
        // 即使检测列表与报告不一致，默认模式也不报告问题
        let validation = ReportValidator::default().validate(&report, &[detection()]);
        assert!(validation.is_valid);
        assert!(validation.issues.is_empty());
    }

    #[test]
    fn test_strict_validator_accepts_consistent_report() {
        let detections = vec![detection()];
        let report = ReportComposer::default()
            .compose(&detections, &patient())
            .unwrap();
        let validation = ReportValidator::new(true).validate(&report, &detections);
        assert!(validation.is_valid);
    }

    #[test]
    fn test_strict_validator_flags_mismatch() {
        let report = ReportComposer::default().compose(&[], &patient()).unwrap();
        let validation = ReportValidator::new(true).validate(&report, &[detection()]);
        assert!(!validation.is_valid);
        assert_eq!(validation.issues.len(), 2);
    }
}
