//! # Carelink Database
//!
//! reports、ml_suggestions、notifications三张表的连接管理、行模型与查询实现。

pub mod connection;
pub mod models;
pub mod queries;

pub use connection::DatabasePool;
pub use queries::{
    create_tables, PgNotificationStore, PgReportStore, PgSuggestionStore,
};
