//! # Carelink Notify
//!
//! 通知分发：尽力而为的创建、幂等的已读标记、按角色订阅的实时事件流。

pub mod feed;
pub mod service;

pub use feed::NotificationFeed;
pub use service::{NotificationEvent, NotificationService};
