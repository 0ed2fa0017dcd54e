//! 检测模型接口
//!
//! 模型推理由外部实现，流水线只依赖 [`Detector`] 接口。

use crate::urgency::classify_urgency;
use async_trait::async_trait;
use radflow_core::{BoundingBox, CanonicalImage, Detection, RadflowError, RawDetection, Result};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

/// 默认置信度阈值
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.3;

/// 当前唯一的发现类别
pub const FINDING_LABEL: &str = "abnormality";

/// 检测模型接口
#[async_trait]
pub trait Detector: Send + Sync {
    /// 获取检测器名称
    fn name(&self) -> &str;

    /// 对规范化图像执行推理，返回置信度高于阈值的原始检测
    async fn detect(
        &self,
        image: &CanonicalImage,
        confidence_threshold: f64,
    ) -> Result<Vec<RawDetection>>;
}

/// 把原始检测包装为带类别和紧急程度的检测结果，保持输出顺序
pub fn wrap_detections(raw: Vec<RawDetection>) -> Vec<Detection> {
    raw.into_iter()
        .map(|det| {
            let confidence = if (0.0..=1.0).contains(&det.confidence) {
                det.confidence
            } else {
                warn!("置信度 {} 超出 [0,1]，已截断", det.confidence);
                det.confidence.clamp(0.0, 1.0)
            };

            Detection {
                finding: FINDING_LABEL.to_string(),
                confidence,
                bbox: BoundingBox::new(det.bbox.x1, det.bbox.y1, det.bbox.x2, det.bbox.y2),
                urgency: classify_urgency(confidence),
            }
        })
        .collect()
}

/// 返回固定结果的检测器
///
/// 用于测试和离线回放，可从JSON文件加载预先计算好的检测。
#[derive(Debug, Clone, Default)]
pub struct StaticDetector {
    detections: Vec<RawDetection>,
    failure: Option<String>,
    delay: Option<Duration>,
}

impl StaticDetector {
    /// 创建返回给定检测的检测器
    pub fn new(detections: Vec<RawDetection>) -> Self {
        Self {
            detections,
            failure: None,
            delay: None,
        }
    }

    /// 始终报错的检测器
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            detections: Vec::new(),
            failure: Some(message.into()),
            delay: None,
        }
    }

    /// 推理前等待指定时间
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// 从JSON文件加载检测，格式为 `[{"confidence":0.8,"bbox":{"x1":..}}]`
    pub async fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await?;
        let detections: Vec<RawDetection> = serde_json::from_str(&content)?;
        info!("从 {:?} 加载了 {} 个预置检测", path, detections.len());
        Ok(Self::new(detections))
    }
}

#[async_trait]
impl Detector for StaticDetector {
    fn name(&self) -> &str {
        "static"
    }

    async fn detect(
        &self,
        image: &CanonicalImage,
        confidence_threshold: f64,
    ) -> Result<Vec<RawDetection>> {
        debug!(
            "静态检测器处理 {}x{} 图像，阈值 {}",
            image.width(),
            image.height(),
            confidence_threshold
        );

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(message) = &self.failure {
            return Err(RadflowError::Detection(message.clone()));
        }

        Ok(self
            .detections
            .iter()
            .filter(|det| det.confidence > confidence_threshold)
            .copied()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use radflow_core::Urgency;

    fn raw(confidence: f64) -> RawDetection {
        RawDetection {
            confidence,
            bbox: BoundingBox::new(1.0, 2.0, 3.0, 4.0),
        }
    }

    #[test]
    fn test_wrap_preserves_order_and_classifies() {
        let detections = wrap_detections(vec![raw(0.35), raw(0.9), raw(0.5)]);

        let urgencies: Vec<Urgency> = detections.iter().map(|d| d.urgency).collect();
        assert_eq!(urgencies, vec![Urgency::Low, Urgency::High, Urgency::Moderate]);
        assert!(detections.iter().all(|d| d.finding == FINDING_LABEL));
        assert_eq!(detections[1].confidence, 0.9);
    }

    #[test]
    fn test_wrap_clamps_out_of_range_confidence() {
        let detections = wrap_detections(vec![raw(1.3)]);
        assert_eq!(detections[0].confidence, 1.0);
        assert_eq!(detections[0].urgency, Urgency::High);
    }

    #[tokio::test]
    async fn test_static_detector_applies_threshold() {
        let detector = StaticDetector::new(vec![raw(0.2), raw(0.3), raw(0.8)]);
        let image = CanonicalImage::zeros(4, 4);

        let found = detector
            .detect(&image, DEFAULT_CONFIDENCE_THRESHOLD)
            .await
            .unwrap();
        // 恰好等于阈值的检测被丢弃
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].confidence, 0.8);
    }

    #[tokio::test]
    async fn test_failing_detector() {
        let detector = StaticDetector::failing("model crashed");
        let image = CanonicalImage::zeros(1, 1);

        let err = detector.detect(&image, 0.3).await.unwrap_err();
        assert!(err.to_string().contains("model crashed"));
    }

    #[tokio::test]
    async fn test_load_from_json_file() {
        let path = std::env::temp_dir().join(format!("radflow-detections-{}.json", uuid::Uuid::new_v4()));
        tokio::fs::write(
            &path,
            r#"[{"confidence": 0.75, "bbox": {"x1": 10.0, "y1": 12.0, "x2": 40.0, "y2": 44.0}}]"#,
        )
        .await
        .unwrap();

        let detector = StaticDetector::from_json_file(&path).await.unwrap();
        let found = detector.detect(&CanonicalImage::zeros(64, 64), 0.3).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].bbox.x2, 40.0);

        tokio::fs::remove_file(&path).await.unwrap();
    }
}
