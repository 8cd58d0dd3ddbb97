//! # Carelink Web
//!
//! 报告与通知的HTTP接口层。

pub mod handlers;
pub mod server;

pub use handlers::AppState;
pub use server::{create_router, WebServer};
