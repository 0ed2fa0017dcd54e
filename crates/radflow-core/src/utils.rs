//! 通用工具函数

use chrono::Utc;
use uuid::Uuid;

/// 生成流水线运行ID
pub fn generate_run_id() -> String {
    format!("{}-{}", Utc::now().format("%Y%m%d%H%M%S"), Uuid::new_v4().simple())
}

/// 解析DICOM年龄字符串
///
/// 去掉末尾的 `Y` 单位后按整数解析，其他单位或无法解析时返回 `None`。
pub fn parse_patient_age(age: &str) -> Option<u32> {
    let trimmed = age.trim();
    let digits = trimmed.strip_suffix('Y').unwrap_or(trimmed);
    digits.parse::<u32>().ok()
}
