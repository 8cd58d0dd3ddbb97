//! 推理结果归一化
//!
//! 两层兜底各自独立：整体调用失败替换为固定结果，逐字段归一化对所有结果执行。

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 推理服务返回的原始结果
///
/// 每个字段都可能缺失或类型不符，落库前必须归一化。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPrediction {
    pub findings: Option<Value>,
    pub confidence: Option<Value>,
    pub recommendations: Option<Value>,
    pub severity: Option<Value>,
}

/// 归一化后的预测结果，四个字段始终存在且类型正确
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub findings: String,
    pub confidence: f64,
    pub recommendations: String,
    pub severity: String,
}

impl Prediction {
    /// 推理服务不可用时的整体兜底结果
    pub fn unavailable() -> Self {
        Self {
            findings: "AI analysis unavailable. Please review manually.".to_string(),
            confidence: 0.0,
            recommendations: "Manual review recommended.".to_string(),
            severity: "unknown".to_string(),
        }
    }

    /// 逐字段归一化：缺失或类型不符的字段单独回落默认值
    pub fn from_raw(raw: RawPrediction) -> Self {
        Self {
            findings: raw
                .findings
                .and_then(as_string)
                .unwrap_or_else(|| "No specific findings detected.".to_string()),
            confidence: raw
                .confidence
                .and_then(|v| v.as_f64())
                .map(|c| c.clamp(0.0, 1.0))
                .unwrap_or(0.5),
            recommendations: raw
                .recommendations
                .and_then(as_string)
                .unwrap_or_else(|| "No recommendations available.".to_string()),
            severity: raw
                .severity
                .and_then(as_string)
                .unwrap_or_else(|| "unknown".to_string()),
        }
    }

    /// 转成可落库的JSON对象
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl From<Prediction> for RawPrediction {
    fn from(prediction: Prediction) -> Self {
        Self {
            findings: Some(Value::String(prediction.findings)),
            confidence: serde_json::Number::from_f64(prediction.confidence)
                .map(Value::Number),
            recommendations: Some(Value::String(prediction.recommendations)),
            severity: Some(Value::String(prediction.severity)),
        }
    }
}

fn as_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_raw_fills_every_default() {
        let prediction = Prediction::from_raw(RawPrediction::default());
        assert_eq!(prediction.findings, "No specific findings detected.");
        assert_eq!(prediction.confidence, 0.5);
        assert_eq!(prediction.recommendations, "No recommendations available.");
        assert_eq!(prediction.severity, "unknown");
    }

    #[test]
    fn test_from_raw_defaults_fields_independently() {
        // 只有findings有效，其余字段各自回落
        let raw: RawPrediction =
            serde_json::from_value(json!({ "findings": "nodule detected" })).unwrap();
        let prediction = Prediction::from_raw(raw);
        assert_eq!(prediction.findings, "nodule detected");
        assert_eq!(prediction.confidence, 0.5);
        assert_eq!(prediction.recommendations, "No recommendations available.");
        assert_eq!(prediction.severity, "unknown");
    }

    #[test]
    fn test_from_raw_rejects_wrong_types() {
        let raw: RawPrediction = serde_json::from_value(json!({
            "findings": 42,
            "confidence": "high",
            "severity": ["a"]
        }))
        .unwrap();
        let prediction = Prediction::from_raw(raw);
        assert_eq!(prediction.findings, "No specific findings detected.");
        assert_eq!(prediction.confidence, 0.5);
        assert_eq!(prediction.severity, "unknown");
    }

    #[test]
    fn test_confidence_clamped_to_unit_interval() {
        let raw: RawPrediction =
            serde_json::from_value(json!({ "confidence": 1.7 })).unwrap();
        assert_eq!(Prediction::from_raw(raw).confidence, 1.0);

        let raw: RawPrediction =
            serde_json::from_value(json!({ "confidence": -0.2 })).unwrap();
        assert_eq!(Prediction::from_raw(raw).confidence, 0.0);
    }

    #[test]
    fn test_unavailable_survives_normalization() {
        // 兜底结果再过一遍逐字段归一化必须原样保留
        let normalized = Prediction::from_raw(RawPrediction::from(Prediction::unavailable()));
        assert_eq!(normalized, Prediction::unavailable());
    }
}
