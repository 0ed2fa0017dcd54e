//! 紧急程度分级与配色

use image::Rgb;
use radflow_core::Urgency;

/// 高于该置信度为 high
pub const HIGH_URGENCY_THRESHOLD: f64 = 0.7;
/// 高于该置信度（且不高于 high 阈值）为 moderate
pub const MODERATE_URGENCY_THRESHOLD: f64 = 0.4;

/// 紧急程度配色表
pub const URGENCY_COLORS: [(Urgency, Rgb<u8>); 3] = [
    (Urgency::High, Rgb([255, 0, 0])),       // 红
    (Urgency::Moderate, Rgb([255, 165, 0])), // 琥珀
    (Urgency::Low, Rgb([0, 255, 0])),        // 绿
];

/// 按置信度分级
///
/// 上界为严格大于：0.7 属于 moderate，0.4 属于 low。
pub fn classify_urgency(confidence: f64) -> Urgency {
    if confidence > HIGH_URGENCY_THRESHOLD {
        Urgency::High
    } else if confidence > MODERATE_URGENCY_THRESHOLD {
        Urgency::Moderate
    } else {
        Urgency::Low
    }
}

/// 获取紧急程度对应的颜色
pub fn urgency_color(urgency: Urgency) -> Rgb<u8> {
    match urgency {
        Urgency::High => URGENCY_COLORS[0].1,
        Urgency::Moderate => URGENCY_COLORS[1].1,
        Urgency::Low => URGENCY_COLORS[2].1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundaries() {
        assert_eq!(classify_urgency(0.75), Urgency::High);
        assert_eq!(classify_urgency(0.7000001), Urgency::High);
        assert_eq!(classify_urgency(0.7), Urgency::Moderate);
        assert_eq!(classify_urgency(0.41), Urgency::Moderate);
        assert_eq!(classify_urgency(0.4), Urgency::Low);
        assert_eq!(classify_urgency(0.0), Urgency::Low);
        assert_eq!(classify_urgency(1.0), Urgency::High);
    }

    #[test]
    fn test_ranges_partition_unit_interval() {
        for step in 0..=10_000 {
            let c = step as f64 / 10_000.0;
            let expected = if c > 0.7 {
                Urgency::High
            } else if c > 0.4 {
                Urgency::Moderate
            } else {
                Urgency::Low
            };
            assert_eq!(classify_urgency(c), expected, "confidence {}", c);
        }
    }

    #[test]
    fn test_color_table_matches_tiers() {
        for (urgency, color) in URGENCY_COLORS {
            assert_eq!(urgency_color(urgency), color);
        }
        assert_eq!(urgency_color(Urgency::High), Rgb([255, 0, 0]));
        assert_eq!(urgency_color(Urgency::Moderate), Rgb([255, 165, 0]));
        assert_eq!(urgency_color(Urgency::Low), Rgb([0, 255, 0]));
    }
}
