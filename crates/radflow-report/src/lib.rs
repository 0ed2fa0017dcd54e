//! # 报告生成模块
//!
//! 根据检测结果在固定模板之间选择并做占位符替换，生成结构化报告。
//! 模板以数据形式提供，新增模板无需修改流水线编排逻辑。

pub mod composer;
pub mod templates;
pub mod validator;

pub use composer::{render_full_text, render_text_report, Report, ReportComposer, DEFAULT_LOCATION};
pub use templates::{ReportTemplate, TemplateKind, TemplateTable, LOCATION_PLACEHOLDER};
pub use validator::{ReportValidation, ReportValidator};
