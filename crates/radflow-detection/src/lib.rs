//! # 检测后处理模块
//!
//! 检测模型本身是外部依赖，本模块只定义它的接口，并负责：
//! - 紧急程度分级：按置信度把原始检测归入 high/moderate/low
//! - 可视化：按紧急程度配色，在规范化图像上绘制包围盒和标签

pub mod detector;
pub mod glyphs;
pub mod urgency;
pub mod visualization;

pub use detector::{wrap_detections, Detector, StaticDetector, DEFAULT_CONFIDENCE_THRESHOLD, FINDING_LABEL};
pub use urgency::{classify_urgency, urgency_color, HIGH_URGENCY_THRESHOLD, MODERATE_URGENCY_THRESHOLD};
pub use visualization::render_detections;
