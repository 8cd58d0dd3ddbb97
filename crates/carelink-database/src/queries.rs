//! 数据库查询操作

use crate::connection::DatabasePool;
use crate::models::*;
use async_trait::async_trait;
use carelink_core::models::*;
use carelink_core::store::{NotificationStore, ReportStore, SuggestionStore};
use carelink_core::{CarelinkError, Result};
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::Row;
use uuid::Uuid;

/// 创建数据库表
pub async fn create_tables(pool: &DatabasePool) -> Result<()> {
    let pool = pool.pool();

    // 创建报告表
    sqlx::query(r#"
        CREATE TABLE IF NOT EXISTS reports (
            id UUID PRIMARY KEY,
            patient_id VARCHAR(64) NOT NULL,
            test_type VARCHAR(32) NOT NULL,
            original_name VARCHAR(255) NOT NULL,
            file_key VARCHAR(512) NOT NULL,
            priority VARCHAR(16) NOT NULL DEFAULT 'normal',
            notes TEXT NOT NULL DEFAULT '',
            uploaded_by VARCHAR(64) NOT NULL,
            patient_info JSONB NOT NULL DEFAULT '{}',
            result JSONB,
            uploaded_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMP WITH TIME ZONE
        )
    "#).execute(pool).await.map_err(|e| CarelinkError::Database(e.to_string()))?;

    // 创建建议表
    sqlx::query(r#"
        CREATE TABLE IF NOT EXISTS ml_suggestions (
            id UUID PRIMARY KEY,
            report_id UUID NOT NULL REFERENCES reports(id),
            patient_id VARCHAR(64) NOT NULL,
            test_type VARCHAR(32) NOT NULL,
            findings TEXT NOT NULL,
            confidence DOUBLE PRECISION NOT NULL,
            recommendations TEXT NOT NULL,
            severity VARCHAR(32) NOT NULL,
            review_status VARCHAR(32) NOT NULL DEFAULT 'pending_review',
            processed_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
        )
    "#).execute(pool).await.map_err(|e| CarelinkError::Database(e.to_string()))?;

    // 创建通知表
    sqlx::query(r#"
        CREATE TABLE IF NOT EXISTS notifications (
            id UUID PRIMARY KEY,
            kind VARCHAR(32) NOT NULL,
            title VARCHAR(255) NOT NULL,
            message TEXT NOT NULL,
            target_role VARCHAR(16) NOT NULL,
            data JSONB NOT NULL DEFAULT '{}',
            is_read BOOLEAN NOT NULL DEFAULT FALSE,
            created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
        )
    "#).execute(pool).await.map_err(|e| CarelinkError::Database(e.to_string()))?;

    // 创建索引以优化查询性能
    create_indexes(pool).await?;

    tracing::info!("Database tables created successfully");
    Ok(())
}

/// 创建数据库索引
async fn create_indexes(pool: &sqlx::PgPool) -> Result<()> {
    let indexes = vec![
        "CREATE INDEX IF NOT EXISTS idx_reports_patient_id ON reports(patient_id)",
        "CREATE INDEX IF NOT EXISTS idx_reports_uploaded_at ON reports(uploaded_at)",
        "CREATE INDEX IF NOT EXISTS idx_suggestions_report_id ON ml_suggestions(report_id)",
        "CREATE INDEX IF NOT EXISTS idx_suggestions_review_status ON ml_suggestions(review_status)",
        "CREATE INDEX IF NOT EXISTS idx_notifications_role_unread ON notifications(target_role, is_read)",
        "CREATE INDEX IF NOT EXISTS idx_notifications_created_at ON notifications(created_at)",
    ];

    for index_sql in indexes {
        sqlx::query(index_sql)
            .execute(pool)
            .await
            .map_err(|e| CarelinkError::Database(e.to_string()))?;
    }

    tracing::info!("Database indexes created successfully");
    Ok(())
}

// ========== 报告相关操作 ==========

/// 报告表存储实现
#[derive(Debug, Clone)]
pub struct PgReportStore {
    pool: DatabasePool,
}

impl PgReportStore {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReportStore for PgReportStore {
    async fn insert(&self, report: &NewReport) -> Result<Uuid> {
        let pool = self.pool.pool();

        sqlx::query(r#"
            INSERT INTO reports (id, patient_id, test_type, original_name, file_key, priority, notes, uploaded_by, patient_info)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
        "#)
        .bind(report.id)
        .bind(&report.patient_id)
        .bind(&report.test_type)
        .bind(&report.original_name)
        .bind(&report.file_key)
        .bind(report.priority.as_str())
        .bind(&report.notes)
        .bind(&report.uploaded_by)
        .bind(&report.patient_info)
        .fetch_one(pool)
        .await
        .map(|row| row.get("id"))
        .map_err(|e| CarelinkError::Database(e.to_string()))
    }

    async fn get(&self, id: Uuid) -> Result<Option<Report>> {
        let pool = self.pool.pool();

        let result = sqlx::query_as::<_, DbReport>(
            "SELECT * FROM reports WHERE id = $1"
        )
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|e| CarelinkError::Database(e.to_string()))?;

        Ok(result.map(Report::from))
    }

    async fn list_by_patient(&self, patient_id: &str) -> Result<Vec<Report>> {
        let pool = self.pool.pool();

        let results = sqlx::query_as::<_, DbReport>(
            "SELECT * FROM reports WHERE patient_id = $1 ORDER BY uploaded_at DESC"
        )
        .bind(patient_id)
        .fetch_all(pool)
        .await
        .map_err(|e| CarelinkError::Database(e.to_string()))?;

        Ok(results.into_iter().map(Report::from).collect())
    }

    async fn update_result(
        &self,
        id: Uuid,
        result: Value,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        let pool = self.pool.pool();

        let affected = sqlx::query(
            "UPDATE reports SET result = $1, updated_at = $2 WHERE id = $3"
        )
        .bind(result)
        .bind(updated_at)
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| CarelinkError::Database(e.to_string()))?
        .rows_affected();

        if affected == 0 {
            return Err(CarelinkError::NotFound(format!("report {} not found", id)));
        }
        Ok(())
    }
}

// ========== 建议相关操作 ==========

/// 建议表存储实现
#[derive(Debug, Clone)]
pub struct PgSuggestionStore {
    pool: DatabasePool,
}

impl PgSuggestionStore {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SuggestionStore for PgSuggestionStore {
    async fn insert(&self, suggestion: &NewSuggestion) -> Result<Uuid> {
        let pool = self.pool.pool();

        sqlx::query(r#"
            INSERT INTO ml_suggestions (id, report_id, patient_id, test_type, findings, confidence, recommendations, severity, review_status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
        "#)
        .bind(suggestion.id)
        .bind(suggestion.report_id)
        .bind(&suggestion.patient_id)
        .bind(&suggestion.test_type)
        .bind(&suggestion.findings)
        .bind(suggestion.confidence)
        .bind(&suggestion.recommendations)
        .bind(&suggestion.severity)
        .bind(suggestion.review_status.as_str())
        .fetch_one(pool)
        .await
        .map(|row| row.get("id"))
        .map_err(|e| CarelinkError::Database(e.to_string()))
    }

    async fn list_by_report(&self, report_id: Uuid) -> Result<Vec<MlSuggestion>> {
        let pool = self.pool.pool();

        let results = sqlx::query_as::<_, DbSuggestion>(
            "SELECT * FROM ml_suggestions WHERE report_id = $1 ORDER BY processed_at DESC"
        )
        .bind(report_id)
        .fetch_all(pool)
        .await
        .map_err(|e| CarelinkError::Database(e.to_string()))?;

        Ok(results.into_iter().map(MlSuggestion::from).collect())
    }

    async fn find_orphaned_results(&self) -> Result<Vec<Uuid>> {
        let pool = self.pool.pool();

        // 有结果却没有建议记录的报告，供对账清理
        sqlx::query_scalar::<_, Uuid>(r#"
            SELECT r.id FROM reports r
            LEFT JOIN ml_suggestions s ON s.report_id = r.id
            WHERE r.result IS NOT NULL AND s.id IS NULL
        "#)
        .fetch_all(pool)
        .await
        .map_err(|e| CarelinkError::Database(e.to_string()))
    }
}

// ========== 通知相关操作 ==========

/// 通知表存储实现
#[derive(Debug, Clone)]
pub struct PgNotificationStore {
    pool: DatabasePool,
}

impl PgNotificationStore {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationStore for PgNotificationStore {
    async fn insert(&self, notification: &NewNotification) -> Result<Notification> {
        let pool = self.pool.pool();

        let created_at: DateTime<Utc> = sqlx::query(r#"
            INSERT INTO notifications (id, kind, title, message, target_role, data)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING created_at
        "#)
        .bind(notification.id)
        .bind(notification.kind.as_str())
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(notification.target_role.as_str())
        .bind(&notification.data)
        .fetch_one(pool)
        .await
        .map(|row| row.get("created_at"))
        .map_err(|e| CarelinkError::Database(e.to_string()))?;

        Ok(Notification {
            id: notification.id,
            kind: notification.kind,
            title: notification.title.clone(),
            message: notification.message.clone(),
            target_role: notification.target_role,
            data: notification.data.clone(),
            is_read: false,
            created_at,
        })
    }

    async fn mark_read(&self, id: Uuid) -> Result<Notification> {
        let pool = self.pool.pool();

        // 对已读行重复标记仍返回该行，保持幂等
        let result = sqlx::query_as::<_, DbNotification>(
            "UPDATE notifications SET is_read = TRUE WHERE id = $1 RETURNING *"
        )
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|e| CarelinkError::Database(e.to_string()))?;

        result
            .map(Notification::from)
            .ok_or_else(|| CarelinkError::NotFound(format!("notification {} not found", id)))
    }

    async fn mark_all_read(&self, role: Role) -> Result<u64> {
        let pool = self.pool.pool();

        let affected = sqlx::query(
            "UPDATE notifications SET is_read = TRUE WHERE target_role = $1 AND is_read = FALSE"
        )
        .bind(role.as_str())
        .execute(pool)
        .await
        .map_err(|e| CarelinkError::Database(e.to_string()))?
        .rows_affected();

        Ok(affected)
    }

    async fn count_unread(&self, role: Role) -> Result<i64> {
        let pool = self.pool.pool();

        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM notifications WHERE target_role = $1 AND is_read = FALSE"
        )
        .bind(role.as_str())
        .fetch_one(pool)
        .await
        .map_err(|e| CarelinkError::Database(e.to_string()))
    }

    async fn list_for_role(&self, role: Role, limit: i64) -> Result<Vec<Notification>> {
        let pool = self.pool.pool();

        let results = sqlx::query_as::<_, DbNotification>(
            "SELECT * FROM notifications WHERE target_role = $1 ORDER BY created_at DESC LIMIT $2"
        )
        .bind(role.as_str())
        .bind(limit)
        .fetch_all(pool)
        .await
        .map_err(|e| CarelinkError::Database(e.to_string()))?;

        Ok(results.into_iter().map(Notification::from).collect())
    }
}
