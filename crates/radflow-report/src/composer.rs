//! 报告生成器

use crate::templates::{TemplateKind, TemplateTable};
use radflow_core::{Detection, PatientContext, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// 位置占位符的默认取值，不根据包围盒推断解剖位置
pub const DEFAULT_LOCATION: &str = "lung field";

const RULE_WIDTH: usize = 60;

/// 结构化报告
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Report {
    pub findings: String,
    pub impression: String,
    pub recommendations: String,
    pub full_text: String,
    pub template: TemplateKind,
    pub detections_used: Vec<Detection>,
}

/// 报告生成器
#[derive(Debug, Clone)]
pub struct ReportComposer {
    templates: TemplateTable,
    location: String,
}

impl Default for ReportComposer {
    fn default() -> Self {
        Self::new(TemplateTable::builtin())
    }
}

impl ReportComposer {
    /// 使用给定模板表创建
    pub fn new(templates: TemplateTable) -> Self {
        Self {
            templates,
            location: DEFAULT_LOCATION.to_string(),
        }
    }

    /// 设置位置占位符的取值
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    /// 生成报告，检测结果按原顺序保留在报告中
    pub fn compose(&self, detections: &[Detection], patient: &PatientContext) -> Result<Report> {
        let kind = TemplateKind::for_detections(detections);
        debug!(
            "为患者 {} 选择模板 {:?}，检测数 {}",
            patient.patient_id,
            kind,
            detections.len()
        );

        let template = self.templates.get(kind)?.fill(&self.location);
        let full_text = render_full_text(
            &template.findings,
            &template.impression,
            &template.recommendations,
        );

        info!("报告生成完成，模板: {:?}", kind);

        Ok(Report {
            findings: template.findings,
            impression: template.impression,
            recommendations: template.recommendations,
            full_text,
            template: kind,
            detections_used: detections.to_vec(),
        })
    }
}

/// 拼接报告全文，建议为空时省略建议段落
pub fn render_full_text(findings: &str, impression: &str, recommendations: &str) -> String {
    let mut text = format!("FINDINGS:\n{}\n\nIMPRESSION:\n{}", findings, impression);
    if !recommendations.is_empty() {
        text.push_str(&format!("\n\nRECOMMENDATIONS:\n{}", recommendations));
    }
    text
}

/// 生成带患者信息抬头的纯文本报告
pub fn render_text_report(report: &Report, patient: &PatientContext) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let age = patient
        .age
        .map(|age| age.to_string())
        .unwrap_or_else(|| radflow_core::UNKNOWN.to_string());

    format!(
        "RADIOLOGY REPORT\n{rule}\n\nPatient ID: {}\nAge: {}, Sex: {}\n\n{rule}\n\n{}",
        patient.patient_id,
        age,
        patient.sex,
        report.full_text,
        rule = rule
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::ReportTemplate;
    use radflow_core::{BoundingBox, Urgency};

    fn patient() -> PatientContext {
        PatientContext {
            age: Some(45),
            sex: "F".to_string(),
            patient_id: "P001".to_string(),
        }
    }

    fn detection(confidence: f64, urgency: Urgency) -> Detection {
        Detection {
            finding: "abnormality".to_string(),
            confidence,
            bbox: BoundingBox::new(10.0, 10.0, 20.0, 20.0),
            urgency,
        }
    }

    #[test]
    fn test_no_findings_template() {
        let report = ReportComposer::default().compose(&[], &patient()).unwrap();

        assert_eq!(report.template, TemplateKind::NoFindings);
        assert_eq!(report.impression, "No acute cardiopulmonary abnormality.");
        assert_eq!(report.recommendations, "No immediate follow-up required.");
        assert!(report.detections_used.is_empty());
    }

    #[test]
    fn test_abnormality_template_keeps_detections() {
        let detections = vec![
            detection(0.9, Urgency::High),
            detection(0.35, Urgency::Low),
        ];
        let report = ReportComposer::default()
            .compose(&detections, &patient())
            .unwrap();

        assert_eq!(report.template, TemplateKind::AbnormalityDetected);
        assert_eq!(
            report.impression,
            "Finding present in lung field. Differential diagnosis includes infectious process, inflammatory change, or mass lesion."
        );
        assert_eq!(report.detections_used.len(), detections.len());
        assert_eq!(report.detections_used, detections);
    }

    #[test]
    fn test_full_text_layout() {
        let report = ReportComposer::default().compose(&[], &patient()).unwrap();
        let expected = format!(
            "FINDINGS:\n{}\n\nIMPRESSION:\n{}\n\nRECOMMENDATIONS:\n{}",
            report.findings, report.impression, report.recommendations
        );
        assert_eq!(report.full_text, expected);
    }

    #[test]
    fn test_empty_recommendations_omitted() {
        assert_eq!(
            render_full_text("Clear.", "Normal.", ""),
            "FINDINGS:\nClear.\n\nIMPRESSION:\nNormal."
        );

        let mut table = TemplateTable::builtin();
        table.insert(
            TemplateKind::NoFindings,
            ReportTemplate {
                findings: "Clear.".to_string(),
                impression: "Normal.".to_string(),
                recommendations: String::new(),
            },
        );
        let report = ReportComposer::new(table).compose(&[], &patient()).unwrap();
        assert!(!report.full_text.contains("RECOMMENDATIONS"));
    }

    #[test]
    fn test_custom_location() {
        let report = ReportComposer::default()
            .with_location("right upper lobe")
            .compose(&[detection(0.8, Urgency::High)], &patient())
            .unwrap();
        assert!(report.findings.contains("in the right upper lobe."));
    }

    #[test]
    fn test_text_report_header() {
        let report = ReportComposer::default().compose(&[], &patient()).unwrap();
        let text = render_text_report(&report, &patient());

        assert!(text.starts_with("RADIOLOGY REPORT\n"));
        assert!(text.contains("Patient ID: P001\n"));
        assert!(text.contains("Age: 45, Sex: F\n"));
        assert!(text.ends_with(&report.full_text));

        let unknown_age = PatientContext { age: None, ..patient() };
        assert!(render_text_report(&report, &unknown_age).contains("Age: Unknown, Sex: F"));
    }
}
