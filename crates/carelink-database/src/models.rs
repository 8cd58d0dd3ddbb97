//! 数据库模型

use carelink_core::models::*;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

// 数据库表模型 - 使用FromRow trait用于SQL查询

/// 数据库报告表
#[derive(Debug, FromRow)]
pub struct DbReport {
    pub id: Uuid,
    pub patient_id: String,
    pub test_type: String,
    pub original_name: String,
    pub file_key: String,
    pub priority: String, // 存储为字符串，转换为Priority枚举
    pub notes: String,
    pub uploaded_by: String,
    pub patient_info: Value,
    pub result: Option<Value>,
    pub uploaded_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<DbReport> for Report {
    fn from(db_report: DbReport) -> Self {
        Report {
            id: db_report.id,
            patient_id: db_report.patient_id,
            test_type: db_report.test_type,
            original_name: db_report.original_name,
            file_key: db_report.file_key,
            priority: Priority::from_db(&db_report.priority),
            notes: db_report.notes,
            uploaded_by: db_report.uploaded_by,
            patient_info: db_report.patient_info,
            result: db_report.result,
            uploaded_at: db_report.uploaded_at,
            updated_at: db_report.updated_at,
        }
    }
}

/// 数据库建议表
#[derive(Debug, FromRow)]
pub struct DbSuggestion {
    pub id: Uuid,
    pub report_id: Uuid,
    pub patient_id: String,
    pub test_type: String,
    pub findings: String,
    pub confidence: f64,
    pub recommendations: String,
    pub severity: String,
    pub review_status: String, // 存储为字符串，转换为ReviewStatus枚举
    pub processed_at: DateTime<Utc>,
}

impl From<DbSuggestion> for MlSuggestion {
    fn from(db_suggestion: DbSuggestion) -> Self {
        MlSuggestion {
            id: db_suggestion.id,
            report_id: db_suggestion.report_id,
            patient_id: db_suggestion.patient_id,
            test_type: db_suggestion.test_type,
            findings: db_suggestion.findings,
            confidence: db_suggestion.confidence,
            recommendations: db_suggestion.recommendations,
            severity: db_suggestion.severity,
            review_status: ReviewStatus::from_db(&db_suggestion.review_status),
            processed_at: db_suggestion.processed_at,
        }
    }
}

/// 数据库通知表
#[derive(Debug, FromRow)]
pub struct DbNotification {
    pub id: Uuid,
    pub kind: String,        // 存储为字符串，转换为NotificationKind枚举
    pub title: String,
    pub message: String,
    pub target_role: String, // 存储为字符串，转换为Role枚举
    pub data: Value,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl From<DbNotification> for Notification {
    fn from(db_notification: DbNotification) -> Self {
        Notification {
            id: db_notification.id,
            kind: NotificationKind::from_db(&db_notification.kind),
            title: db_notification.title,
            message: db_notification.message,
            target_role: Role::from_db(&db_notification.target_role),
            data: db_notification.data,
            is_read: db_notification.is_read,
            created_at: db_notification.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_report_conversion_decodes_enums() {
        let db_report = DbReport {
            id: Uuid::new_v4(),
            patient_id: "38".to_string(),
            test_type: "x_ray".to_string(),
            original_name: "a.jpg".to_string(),
            file_key: "38/a.jpg".to_string(),
            priority: "urgent".to_string(),
            notes: String::new(),
            uploaded_by: "u1".to_string(),
            patient_info: json!({}),
            result: None,
            uploaded_at: Utc::now(),
            updated_at: None,
        };

        let report = Report::from(db_report);
        assert_eq!(report.priority, Priority::Urgent);
        assert!(report.result.is_none());
        assert!(report.updated_at.is_none());
    }

    #[test]
    fn test_notification_conversion_tolerates_unknown_strings() {
        let db_notification = DbNotification {
            id: Uuid::new_v4(),
            kind: "not-a-kind".to_string(),
            title: "t".to_string(),
            message: "m".to_string(),
            target_role: "not-a-role".to_string(),
            data: json!({}),
            is_read: false,
            created_at: Utc::now(),
        };

        let notification = Notification::from(db_notification);
        assert_eq!(notification.kind, NotificationKind::SystemAlert);
        assert_eq!(notification.target_role, Role::Admin);
    }
}
