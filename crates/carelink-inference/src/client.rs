//! 推理服务HTTP客户端

use crate::prediction::RawPrediction;
use async_trait::async_trait;
use carelink_core::{CarelinkError, Result};
use reqwest::multipart::{Form, Part};
use std::time::Duration;
use tracing::{debug, warn};

/// 扫描类型归一化，推理服务的类型命名与平台不完全一致
pub fn normalize_scan_kind(test_type: &str) -> String {
    match test_type {
        "x_ray" => "xray".to_string(),
        "mri" => "mri".to_string(),
        other => other.to_string(),
    }
}

/// 推理服务接口
#[async_trait]
pub trait InferenceService: Send + Sync {
    /// 提交一份影像做分析，返回原始结果
    async fn analyze(
        &self,
        scan_kind: &str,
        file_name: &str,
        image: Vec<u8>,
    ) -> Result<RawPrediction>;
}

/// HTTP推理客户端
pub struct HttpInferenceClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpInferenceClient {
    /// 创建客户端，整个调用受超时约束
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| CarelinkError::Inference(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[async_trait]
impl InferenceService for HttpInferenceClient {
    async fn analyze(
        &self,
        scan_kind: &str,
        file_name: &str,
        image: Vec<u8>,
    ) -> Result<RawPrediction> {
        let url = format!("{}/analyze", self.base_url);
        debug!("Sending {} scan {} to inference service", scan_kind, file_name);

        let part = Part::bytes(image).file_name(file_name.to_string());
        let form = Form::new()
            .text("scan_type", scan_kind.to_string())
            .part("file", part);

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| CarelinkError::Inference(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            warn!("Inference service returned status {}", status);
            return Err(CarelinkError::Inference(format!(
                "unexpected status: {}",
                status
            )));
        }

        response
            .json::<RawPrediction>()
            .await
            .map_err(|e| CarelinkError::Inference(format!("malformed response: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_scan_kind() {
        assert_eq!(normalize_scan_kind("x_ray"), "xray");
        assert_eq!(normalize_scan_kind("mri"), "mri");
        // 其余类型原样透传
        assert_eq!(normalize_scan_kind("ct_scan"), "ct_scan");
        assert_eq!(normalize_scan_kind("blood_test"), "blood_test");
    }

    #[test]
    fn test_client_strips_trailing_slash() {
        let client = HttpInferenceClient::new("http://localhost:9000/", 30).unwrap();
        assert_eq!(client.base_url, "http://localhost:9000");
    }
}
