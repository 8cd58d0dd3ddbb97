//! 通知订阅

use crate::service::NotificationEvent;
use carelink_core::models::Role;
use tokio::sync::broadcast;
use tracing::warn;

/// 角色范围的通知事件订阅句柄
///
/// 持有方在组件销毁时调用stop释放监听，避免泄漏。
pub struct NotificationFeed {
    role: Role,
    receiver: Option<broadcast::Receiver<NotificationEvent>>,
}

impl NotificationFeed {
    pub(crate) fn new(role: Role, receiver: broadcast::Receiver<NotificationEvent>) -> Self {
        Self {
            role,
            receiver: Some(receiver),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// 接收下一条本角色的事件，订阅停止或通道关闭后返回None
    ///
    /// 落后于广播缓冲时事件会被跳过，消费者应重新查询派生状态而非依赖逐条送达。
    pub async fn recv(&mut self) -> Option<NotificationEvent> {
        let receiver = self.receiver.as_mut()?;
        loop {
            match receiver.recv().await {
                Ok(event) if event.target_role() == self.role => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Notification feed lagged, skipped {} events", skipped);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// 停止订阅并释放监听资源
    pub fn stop(&mut self) {
        self.receiver = None;
    }
}
