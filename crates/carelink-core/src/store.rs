//! 存储接口定义
//!
//! 协调器通过这些接口访问关系存储，实现可在测试中替换。

use crate::models::{
    MlSuggestion, NewNotification, NewReport, NewSuggestion, Notification, Report, Role,
};
use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

/// 报告表操作接口
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// 插入新报告并返回其ID
    async fn insert(&self, report: &NewReport) -> Result<Uuid>;

    /// 根据ID查找报告
    async fn get(&self, id: Uuid) -> Result<Option<Report>>;

    /// 获取患者的所有报告
    async fn list_by_patient(&self, patient_id: &str) -> Result<Vec<Report>>;

    /// 写入推理结果并刷新更新时间
    async fn update_result(
        &self,
        id: Uuid,
        result: Value,
        updated_at: DateTime<Utc>,
    ) -> Result<()>;
}

/// 建议表操作接口
#[async_trait]
pub trait SuggestionStore: Send + Sync {
    /// 插入新建议并返回其ID
    async fn insert(&self, suggestion: &NewSuggestion) -> Result<Uuid>;

    /// 获取报告关联的所有建议
    async fn list_by_report(&self, report_id: Uuid) -> Result<Vec<MlSuggestion>>;

    /// 查找已有结果但缺失建议记录的报告
    async fn find_orphaned_results(&self) -> Result<Vec<Uuid>>;
}

/// 通知表操作接口
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// 插入新通知并返回完整记录
    async fn insert(&self, notification: &NewNotification) -> Result<Notification>;

    /// 标记单条通知已读，重复标记不是错误
    async fn mark_read(&self, id: Uuid) -> Result<Notification>;

    /// 标记某角色的全部通知已读，返回受影响行数
    async fn mark_all_read(&self, role: Role) -> Result<u64>;

    /// 统计某角色的未读通知数
    async fn count_unread(&self, role: Role) -> Result<i64>;

    /// 获取某角色最近的通知
    async fn list_for_role(&self, role: Role, limit: i64) -> Result<Vec<Notification>>;
}
