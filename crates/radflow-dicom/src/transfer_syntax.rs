//! DICOM传输语法支持模块
//!
//! 判断像素数据是否可以直接解码

/// DICOM传输语法管理器
pub struct TransferSyntaxManager;

impl Default for TransferSyntaxManager {
    fn default() -> Self {
        Self::new()
    }
}

impl TransferSyntaxManager {
    /// 创建新的传输语法管理器
    pub fn new() -> Self {
        Self
    }

    /// 检查传输语法是否为压缩编码
    pub fn is_compressed(&self, uid: &str) -> bool {
        let compressed_uids = [
            "1.2.840.10008.1.2.4.50", // JPEG Baseline
            "1.2.840.10008.1.2.4.51", // JPEG Extended
            "1.2.840.10008.1.2.4.57", // JPEG Lossless
            "1.2.840.10008.1.2.4.70", // JPEG Lossless SV1
            "1.2.840.10008.1.2.4.80", // JPEG-LS Lossless
            "1.2.840.10008.1.2.4.81", // JPEG-LS Near Lossless
            "1.2.840.10008.1.2.4.90", // JPEG 2000 Lossless
            "1.2.840.10008.1.2.4.91", // JPEG 2000
            "1.2.840.10008.1.2.5",    // RLE Lossless
        ];

        compressed_uids.contains(&uid) || uid.starts_with("1.2.840.10008.1.2.4.")
    }

    /// 获取传输语法的名称
    pub fn get_name(&self, uid: &str) -> &'static str {
        match uid {
            "1.2.840.10008.1.2.1" => "Explicit VR Little Endian",
            "1.2.840.10008.1.2" => "Implicit VR Little Endian",
            "1.2.840.10008.1.2.2" => "Explicit VR Big Endian",
            "1.2.840.10008.1.2.1.99" => "Deflated Explicit VR Little Endian",
            "1.2.840.10008.1.2.5" => "RLE Lossless",
            uid if uid.starts_with("1.2.840.10008.1.2.4.") => "JPEG family",
            _ => "Unknown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compressed_syntaxes() {
        let manager = TransferSyntaxManager::new();

        assert!(!manager.is_compressed("1.2.840.10008.1.2.1"));
        assert!(!manager.is_compressed("1.2.840.10008.1.2"));

        assert!(manager.is_compressed("1.2.840.10008.1.2.4.90"));
        assert!(manager.is_compressed("1.2.840.10008.1.2.5"));
    }

    #[test]
    fn test_syntax_names() {
        let manager = TransferSyntaxManager::new();
        assert_eq!(manager.get_name("1.2.840.10008.1.2"), "Implicit VR Little Endian");
        assert_eq!(manager.get_name("1.2.840.10008.1.2.4.50"), "JPEG family");
        assert_eq!(manager.get_name("9.9"), "Unknown");
    }
}
