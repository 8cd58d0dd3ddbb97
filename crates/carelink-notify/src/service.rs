//! 通知分发服务

use crate::feed::NotificationFeed;
use carelink_core::models::{NewNotification, Notification, NotificationKind, Role};
use carelink_core::store::NotificationStore;
use carelink_core::Result;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};
use uuid::Uuid;

/// 通知变更事件
///
/// 事件负载仅作提示，消费者应在收到事件后重新查询未读计数等派生状态。
#[derive(Debug, Clone)]
pub enum NotificationEvent {
    Inserted(Notification),
    Updated {
        id: Uuid,
        target_role: Role,
        is_read: bool,
    },
    AllRead {
        target_role: Role,
    },
}

impl NotificationEvent {
    pub fn target_role(&self) -> Role {
        match self {
            Self::Inserted(notification) => notification.target_role,
            Self::Updated { target_role, .. } => *target_role,
            Self::AllRead { target_role } => *target_role,
        }
    }
}

/// 通知服务
#[derive(Clone)]
pub struct NotificationService {
    store: Arc<dyn NotificationStore>,
    events: broadcast::Sender<NotificationEvent>,
}

impl NotificationService {
    pub fn new(store: Arc<dyn NotificationStore>) -> Self {
        let (events, _) = broadcast::channel(256);
        Self { store, events }
    }

    /// 创建通知并广播插入事件
    pub async fn create(
        &self,
        kind: NotificationKind,
        title: &str,
        message: &str,
        target_role: Role,
        data: Value,
    ) -> Result<Uuid> {
        let new_notification = NewNotification {
            id: Uuid::new_v4(),
            kind,
            title: title.to_string(),
            message: message.to_string(),
            target_role,
            data,
        };

        let notification = self.store.insert(&new_notification).await?;
        let id = notification.id;
        debug!("Notification {} created for role {}", id, target_role.as_str());

        // 无订阅者时发送失败是正常情况
        let _ = self.events.send(NotificationEvent::Inserted(notification));
        Ok(id)
    }

    /// 尽力而为地创建通知，任何失败只记录日志，绝不向调用方传播
    pub async fn create_best_effort(
        &self,
        kind: NotificationKind,
        title: &str,
        message: &str,
        target_role: Role,
        data: Value,
    ) {
        if let Err(e) = self.create(kind, title, message, target_role, data).await {
            warn!("Notification delivery failed (ignored): {}", e);
        }
    }

    /// 标记单条通知已读，重复标记是无操作
    pub async fn mark_read(&self, id: Uuid) -> Result<()> {
        let notification = self.store.mark_read(id).await?;
        let _ = self.events.send(NotificationEvent::Updated {
            id: notification.id,
            target_role: notification.target_role,
            is_read: notification.is_read,
        });
        Ok(())
    }

    /// 标记某角色全部通知已读，返回受影响条数
    pub async fn mark_all_read(&self, role: Role) -> Result<u64> {
        let affected = self.store.mark_all_read(role).await?;
        let _ = self.events.send(NotificationEvent::AllRead { target_role: role });
        Ok(affected)
    }

    /// 某角色的未读通知数
    pub async fn unread_count(&self, role: Role) -> Result<i64> {
        self.store.count_unread(role).await
    }

    /// 某角色最近的通知列表
    pub async fn list(&self, role: Role, limit: i64) -> Result<Vec<Notification>> {
        self.store.list_for_role(role, limit).await
    }

    /// 订阅某角色的通知事件流
    pub fn subscribe(&self, role: Role) -> NotificationFeed {
        NotificationFeed::new(role, self.events.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use carelink_core::CarelinkError;
    use chrono::Utc;
    use serde_json::json;
    use std::sync::Mutex;

    /// 内存通知存储，可注入故障
    struct MemoryNotificationStore {
        rows: Mutex<Vec<Notification>>,
        fail_insert: bool,
    }

    impl MemoryNotificationStore {
        fn new() -> Self {
            Self {
                rows: Mutex::new(Vec::new()),
                fail_insert: false,
            }
        }

        fn failing() -> Self {
            Self {
                rows: Mutex::new(Vec::new()),
                fail_insert: true,
            }
        }
    }

    #[async_trait]
    impl NotificationStore for MemoryNotificationStore {
        async fn insert(&self, notification: &NewNotification) -> Result<Notification> {
            if self.fail_insert {
                return Err(CarelinkError::Database("insert failed".to_string()));
            }
            let row = Notification {
                id: notification.id,
                kind: notification.kind,
                title: notification.title.clone(),
                message: notification.message.clone(),
                target_role: notification.target_role,
                data: notification.data.clone(),
                is_read: false,
                created_at: Utc::now(),
            };
            self.rows.lock().unwrap().push(row.clone());
            Ok(row)
        }

        async fn mark_read(&self, id: Uuid) -> Result<Notification> {
            let mut rows = self.rows.lock().unwrap();
            let row = rows
                .iter_mut()
                .find(|n| n.id == id)
                .ok_or_else(|| CarelinkError::NotFound(format!("notification {} not found", id)))?;
            row.is_read = true;
            Ok(row.clone())
        }

        async fn mark_all_read(&self, role: Role) -> Result<u64> {
            let mut rows = self.rows.lock().unwrap();
            let mut affected = 0;
            for row in rows.iter_mut().filter(|n| n.target_role == role && !n.is_read) {
                row.is_read = true;
                affected += 1;
            }
            Ok(affected)
        }

        async fn count_unread(&self, role: Role) -> Result<i64> {
            let rows = self.rows.lock().unwrap();
            Ok(rows
                .iter()
                .filter(|n| n.target_role == role && !n.is_read)
                .count() as i64)
        }

        async fn list_for_role(&self, role: Role, limit: i64) -> Result<Vec<Notification>> {
            let rows = self.rows.lock().unwrap();
            Ok(rows
                .iter()
                .filter(|n| n.target_role == role)
                .take(limit as usize)
                .cloned()
                .collect())
        }
    }

    #[tokio::test]
    async fn test_create_broadcasts_inserted_event() {
        let service = NotificationService::new(Arc::new(MemoryNotificationStore::new()));
        let mut feed = service.subscribe(Role::Doctor);

        let id = service
            .create(
                NotificationKind::NewReport,
                "New report",
                "A report arrived",
                Role::Doctor,
                json!({}),
            )
            .await
            .unwrap();

        match feed.recv().await {
            Some(NotificationEvent::Inserted(notification)) => {
                assert_eq!(notification.id, id);
                assert!(!notification.is_read);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_feed_filters_by_role() {
        let service = NotificationService::new(Arc::new(MemoryNotificationStore::new()));
        let mut feed = service.subscribe(Role::Doctor);

        // 患者通知在前，医生订阅不应看到
        service
            .create(
                NotificationKind::PatientMessage,
                "Message",
                "for patient",
                Role::Patient,
                json!({}),
            )
            .await
            .unwrap();
        service
            .create(
                NotificationKind::NewReport,
                "Report",
                "for doctor",
                Role::Doctor,
                json!({}),
            )
            .await
            .unwrap();

        match feed.recv().await {
            Some(NotificationEvent::Inserted(notification)) => {
                assert_eq!(notification.target_role, Role::Doctor);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_stopped_feed_returns_none() {
        let service = NotificationService::new(Arc::new(MemoryNotificationStore::new()));
        let mut feed = service.subscribe(Role::Doctor);
        feed.stop();
        assert!(feed.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_mark_read_is_idempotent() {
        let service = NotificationService::new(Arc::new(MemoryNotificationStore::new()));
        let id = service
            .create(
                NotificationKind::NewReport,
                "Report",
                "msg",
                Role::Doctor,
                json!({}),
            )
            .await
            .unwrap();

        service.mark_read(id).await.unwrap();
        // 第二次标记同样成功
        service.mark_read(id).await.unwrap();
        assert_eq!(service.unread_count(Role::Doctor).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_best_effort_create_swallows_failures() {
        let service = NotificationService::new(Arc::new(MemoryNotificationStore::failing()));
        // 存储故障不panic、不返回错误
        service
            .create_best_effort(
                NotificationKind::NewReport,
                "Report",
                "msg",
                Role::Doctor,
                json!({}),
            )
            .await;
    }

    #[tokio::test]
    async fn test_mark_all_read_scoped_to_role() {
        let service = NotificationService::new(Arc::new(MemoryNotificationStore::new()));
        for role in [Role::Doctor, Role::Doctor, Role::Patient] {
            service
                .create(NotificationKind::NewReport, "t", "m", role, json!({}))
                .await
                .unwrap();
        }

        let affected = service.mark_all_read(Role::Doctor).await.unwrap();
        assert_eq!(affected, 2);
        assert_eq!(service.unread_count(Role::Doctor).await.unwrap(), 0);
        assert_eq!(service.unread_count(Role::Patient).await.unwrap(), 1);
    }
}
