//! 核心数据模型定义

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// 诊断报告
///
/// 一次上传的诊断资料及其生命周期：创建后只在推理完成时被更新一次。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub id: Uuid,
    pub patient_id: String,            // 患者标识
    pub test_type: String,             // 检查类型 (x_ray, mri, blood_test等)
    pub original_name: String,         // 原始文件名
    pub file_key: String,              // 对象存储键
    pub priority: Priority,
    pub notes: String,
    pub uploaded_by: String,           // 上传者标识
    pub patient_info: Value,           // 患者附加信息
    pub result: Option<Value>,         // 推理结果，完成前为空
    pub uploaded_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// 报告优先级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    Normal,
    Urgent,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Urgent => "urgent",
        }
    }

    /// 数据库字符串解码，未知值回落为默认优先级
    pub fn from_db(value: &str) -> Self {
        match value {
            "urgent" => Self::Urgent,
            _ => Self::Normal,
        }
    }
}

/// AI建议
///
/// 与报告一一对应的推理结果记录。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MlSuggestion {
    pub id: Uuid,
    pub report_id: Uuid,
    pub patient_id: String,
    pub test_type: String,
    pub findings: String,
    pub confidence: f64,               // 置信度 [0,1]
    pub recommendations: String,
    pub severity: String,
    pub review_status: ReviewStatus,
    pub processed_at: DateTime<Utc>,
}

/// 建议审核状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    #[default]
    PendingReview,
    Approved,
    Rejected,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingReview => "pending_review",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn from_db(value: &str) -> Self {
        match value {
            "approved" => Self::Approved,
            "rejected" => Self::Rejected,
            _ => Self::PendingReview,
        }
    }
}

/// 通知
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub target_role: Role,
    pub data: Value,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// 通知类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    NewReport,
    MlSuggestion,
    PatientMessage,
    SystemAlert,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NewReport => "new_report",
            Self::MlSuggestion => "ml_suggestion",
            Self::PatientMessage => "patient_message",
            Self::SystemAlert => "system_alert",
        }
    }

    pub fn from_db(value: &str) -> Self {
        match value {
            "new_report" => Self::NewReport,
            "ml_suggestion" => Self::MlSuggestion,
            "patient_message" => Self::PatientMessage,
            _ => Self::SystemAlert,
        }
    }
}

/// 通知受众角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Patient,
    Doctor,
    Lab,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Patient => "patient",
            Self::Doctor => "doctor",
            Self::Lab => "lab",
            Self::Admin => "admin",
        }
    }

    pub fn from_db(value: &str) -> Self {
        match value {
            "patient" => Self::Patient,
            "doctor" => Self::Doctor,
            "lab" => Self::Lab,
            _ => Self::Admin,
        }
    }
}

// 插入模型 - 用于创建新记录

/// 新报告插入模型
#[derive(Debug, Clone)]
pub struct NewReport {
    pub id: Uuid,
    pub patient_id: String,
    pub test_type: String,
    pub original_name: String,
    pub file_key: String,
    pub priority: Priority,
    pub notes: String,
    pub uploaded_by: String,
    pub patient_info: Value,
}

/// 新建议插入模型
#[derive(Debug, Clone)]
pub struct NewSuggestion {
    pub id: Uuid,
    pub report_id: Uuid,
    pub patient_id: String,
    pub test_type: String,
    pub findings: String,
    pub confidence: f64,
    pub recommendations: String,
    pub severity: String,
    pub review_status: ReviewStatus,
}

/// 新通知插入模型
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub target_role: Role,
    pub data: Value,
}
