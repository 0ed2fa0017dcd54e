//! 结果文件写出

use image::{GrayImage, ImageFormat, RgbImage};
use radflow_core::{CanonicalImage, RadflowError, Result};
use serde::Serialize;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::debug;

/// 结果文件写出器
pub struct ArtifactWriter {
    base_path: PathBuf,
}

impl ArtifactWriter {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// 确保输出目录存在
    pub async fn ensure_dir(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.base_path).await?;
        Ok(())
    }

    /// 写出规范化灰度图 (PNG)
    pub async fn write_canonical(&self, image: &CanonicalImage, name: &str) -> Result<PathBuf> {
        let gray = GrayImage::from_raw(image.width(), image.height(), image.pixels().to_vec())
            .ok_or_else(|| RadflowError::Image("灰度图尺寸与像素数不一致".to_string()))?;
        let data = encode_png(|cursor| gray.write_to(cursor, ImageFormat::Png))?;
        self.store_file(&data, name).await
    }

    /// 写出RGB叠加图 (PNG)
    pub async fn write_rgb(&self, image: &RgbImage, name: &str) -> Result<PathBuf> {
        let data = encode_png(|cursor| image.write_to(cursor, ImageFormat::Png))?;
        self.store_file(&data, name).await
    }

    /// 写出文本文件
    pub async fn write_text(&self, text: &str, name: &str) -> Result<PathBuf> {
        self.store_file(text.as_bytes(), name).await
    }

    /// 写出格式化JSON
    pub async fn write_json<T: Serialize>(&self, value: &T, name: &str) -> Result<PathBuf> {
        let data = serde_json::to_vec_pretty(value)?;
        self.store_file(&data, name).await
    }

    async fn store_file(&self, data: &[u8], name: &str) -> Result<PathBuf> {
        let full_path = self.base_path.join(name);
        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(&full_path, data).await?;
        debug!("写出文件 {:?} ({} bytes)", full_path, data.len());
        Ok(full_path)
    }
}

fn encode_png<F>(write: F) -> Result<Vec<u8>>
where
    F: FnOnce(&mut Cursor<Vec<u8>>) -> image::ImageResult<()>,
{
    let mut cursor = Cursor::new(Vec::new());
    write(&mut cursor).map_err(|e| RadflowError::Image(format!("PNG编码失败: {}", e)))?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("radflow-artifacts-{}", uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn test_write_canonical_png() {
        let dir = temp_dir();
        let writer = ArtifactWriter::new(&dir);
        writer.ensure_dir().await.unwrap();

        let image = CanonicalImage::new(2, 2, vec![0, 64, 128, 255]).unwrap();
        let path = writer.write_canonical(&image, "canonical.png").await.unwrap();

        let decoded = image::open(&path).unwrap().to_luma8();
        assert_eq!(decoded.dimensions(), (2, 2));
        assert_eq!(decoded.into_raw(), vec![0, 64, 128, 255]);

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn test_write_text_and_json() {
        let dir = temp_dir();
        let writer = ArtifactWriter::new(&dir);

        let text_path = writer.write_text("hello", "report.txt").await.unwrap();
        assert_eq!(tokio::fs::read_to_string(&text_path).await.unwrap(), "hello");

        let json_path = writer
            .write_json(&serde_json::json!({"status": "ok"}), "result.json")
            .await
            .unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&tokio::fs::read_to_string(&json_path).await.unwrap()).unwrap();
        assert_eq!(value["status"], "ok");

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
