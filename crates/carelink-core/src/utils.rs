//! 通用工具函数

use chrono::Utc;
use uuid::Uuid;

/// 生成唯一的对象存储键
pub fn generate_object_key(patient_id: &str, original_name: &str) -> String {
    let name = original_name.replace(['/', '\\', ' '], "_");
    format!(
        "{}/{}-{}-{}",
        patient_id,
        Utc::now().timestamp(),
        Uuid::new_v4().simple(),
        name
    )
}

/// 验证对象存储键格式
pub fn is_valid_object_key(key: &str) -> bool {
    !key.is_empty() && key.len() <= 512 && !key.contains("..") && !key.starts_with('/')
}

/// 判断是否为内置演示数据键，演示数据不要求对象实际存在
pub fn is_sample_key(key: &str) -> bool {
    key.starts_with("sample/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_object_key() {
        let key = generate_object_key("38", "chest scan.jpg");
        assert!(is_valid_object_key(&key));
        assert!(key.starts_with("38/"));
        assert!(key.ends_with("chest_scan.jpg"));
    }

    #[test]
    fn test_is_valid_object_key() {
        assert!(is_valid_object_key("38/1700000000-abc-scan.jpg"));
        assert!(!is_valid_object_key(""));
        assert!(!is_valid_object_key("/absolute/path"));
        assert!(!is_valid_object_key("a/../escape"));
    }

    #[test]
    fn test_is_sample_key() {
        assert!(is_sample_key("sample/xray-demo.jpg"));
        assert!(!is_sample_key("38/real-upload.jpg"));
    }
}
