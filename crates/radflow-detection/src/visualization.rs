//! 检测结果可视化

use crate::glyphs::{draw_text, GLYPH_HEIGHT};
use crate::urgency::urgency_color;
use image::{Rgb, RgbImage};
use radflow_core::{CanonicalImage, Detection};
use tracing::debug;

/// 包围盒线宽
pub const BOX_THICKNESS: i64 = 2;
/// 标签底边距包围盒顶边的距离
pub const LABEL_OFFSET: i64 = 10;

/// 在规范化图像的RGB副本上绘制检测结果
///
/// 按列表顺序绘制，后绘制的框可能覆盖之前的标签。原图不被修改。
pub fn render_detections(image: &CanonicalImage, detections: &[Detection]) -> RgbImage {
    let mut canvas = RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let v = image.get(x, y).unwrap_or(0);
        Rgb([v, v, v])
    });

    for detection in detections {
        let color = urgency_color(detection.urgency);
        let (width, height) = canvas.dimensions();
        let x1 = canvas_coord(detection.bbox.x1, width);
        let y1 = canvas_coord(detection.bbox.y1, height);
        let x2 = canvas_coord(detection.bbox.x2, width);
        let y2 = canvas_coord(detection.bbox.y2, height);

        draw_rectangle(&mut canvas, x1, y1, x2, y2, color);

        let label = detection.label();
        draw_text(
            &mut canvas,
            x1,
            y1 - LABEL_OFFSET - GLYPH_HEIGHT as i64,
            &label,
            color,
        );
        debug!("绘制检测 {} ({})", label, detection.urgency);
    }

    canvas
}

/// 把包围盒坐标限制在画布外一个线宽的范围内
///
/// 画布外的边仍然落在画布外，绘制循环的长度只取决于画布尺寸。
fn canvas_coord(value: f64, extent: u32) -> i64 {
    let margin = (BOX_THICKNESS + 1) as f64;
    value.clamp(-margin, extent as f64 + margin) as i64
}

/// 绘制空心矩形，线条向内加粗
fn draw_rectangle(canvas: &mut RgbImage, x1: i64, y1: i64, x2: i64, y2: i64, color: Rgb<u8>) {
    for t in 0..BOX_THICKNESS {
        let (left, top, right, bottom) = (x1 + t, y1 + t, x2 - t, y2 - t);
        if left > right || top > bottom {
            break;
        }
        for x in left..=right {
            put_clipped(canvas, x, top, color);
            put_clipped(canvas, x, bottom, color);
        }
        for y in top..=bottom {
            put_clipped(canvas, left, y, color);
            put_clipped(canvas, right, y, color);
        }
    }
}

fn put_clipped(canvas: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && x < canvas.width() as i64 && y < canvas.height() as i64 {
        canvas.put_pixel(x as u32, y as u32, color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::wrap_detections;
    use radflow_core::{BoundingBox, RawDetection};

    fn gradient(width: u32, height: u32) -> CanonicalImage {
        let pixels = (0..width * height).map(|i| (i % 256) as u8).collect();
        CanonicalImage::new(width, height, pixels).unwrap()
    }

    fn detection(confidence: f64, bbox: BoundingBox) -> Detection {
        wrap_detections(vec![RawDetection { confidence, bbox }]).remove(0)
    }

    #[test]
    fn test_no_detections_equals_source() {
        let image = gradient(16, 8);
        let canvas = render_detections(&image, &[]);

        for (x, y, pixel) in canvas.enumerate_pixels() {
            let v = image.get(x, y).unwrap();
            assert_eq!(pixel.0, [v, v, v]);
        }
    }

    #[test]
    fn test_high_detection_drawn_in_red() {
        let image = CanonicalImage::zeros(64, 64);
        let det = detection(0.75, BoundingBox::new(20.0, 30.0, 50.0, 60.0));
        let canvas = render_detections(&image, &[det]);

        assert_eq!(canvas.get_pixel(20, 30).0, [255, 0, 0]);
        assert_eq!(canvas.get_pixel(35, 60).0, [255, 0, 0]);
        assert_eq!(canvas.get_pixel(21, 45).0, [255, 0, 0]);
        // 框内部不被填充
        assert_eq!(canvas.get_pixel(35, 45).0, [0, 0, 0]);
        // 标签绘制在框上方
        let label_pixels = (0..64)
            .flat_map(|x| (13..20).map(move |y| (x, y)))
            .filter(|&(x, y)| canvas.get_pixel(x, y).0 == [255, 0, 0])
            .count();
        assert!(label_pixels > 0);
    }

    #[test]
    fn test_colors_follow_urgency() {
        let image = CanonicalImage::zeros(40, 40);
        let moderate = detection(0.5, BoundingBox::new(2.0, 20.0, 10.0, 30.0));
        let low = detection(0.35, BoundingBox::new(20.0, 20.0, 30.0, 30.0));
        let canvas = render_detections(&image, &[moderate, low]);

        assert_eq!(canvas.get_pixel(2, 25).0, [255, 165, 0]);
        assert_eq!(canvas.get_pixel(20, 25).0, [0, 255, 0]);
    }

    #[test]
    fn test_source_image_not_mutated() {
        let image = gradient(8, 8);
        let before = image.clone();
        let det = detection(0.9, BoundingBox::new(0.0, 0.0, 7.0, 7.0));
        let _ = render_detections(&image, &[det]);
        assert_eq!(image, before);
    }

    #[test]
    fn test_huge_coordinates_draw_in_canvas_time() {
        let image = CanonicalImage::zeros(16, 16);
        let boxes = [
            BoundingBox::new(2.0, -1e30, 8.0, 8.0),
            BoundingBox::new(-1e30, -1e30, 1e30, 1e30),
            BoundingBox::new(0.0, 0.0, 1e12, 8.0),
        ];

        for bbox in boxes {
            let det = detection(0.9, bbox);
            let canvas = render_detections(&image, &[det]);
            assert_eq!(canvas.dimensions(), (16, 16));
        }

        // 上边在画布外，其余三条边仍然可见
        let canvas = render_detections(
            &image,
            &[detection(0.9, BoundingBox::new(2.0, -1e30, 8.0, 8.0))],
        );
        assert_eq!(canvas.get_pixel(2, 0).0, [255, 0, 0]);
        assert_eq!(canvas.get_pixel(5, 8).0, [255, 0, 0]);
        assert_eq!(canvas.get_pixel(5, 0).0, [0, 0, 0]);

        // 右边在画布外
        let canvas = render_detections(
            &image,
            &[detection(0.9, BoundingBox::new(0.0, 0.0, 1e12, 8.0))],
        );
        assert_eq!(canvas.get_pixel(15, 4).0, [0, 0, 0]);
        assert_eq!(canvas.get_pixel(15, 8).0, [255, 0, 0]);
    }

    #[test]
    fn test_out_of_bounds_box_is_clipped() {
        let image = CanonicalImage::zeros(10, 10);
        let det = detection(0.9, BoundingBox::new(-20.0, -20.0, 500.0, 500.0));
        let canvas = render_detections(&image, &[det]);
        assert_eq!(canvas.dimensions(), (10, 10));
    }
}
