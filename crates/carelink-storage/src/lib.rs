//! # Carelink Storage
//!
//! 上传文件的对象存储抽象、签名下载链接与推理暂存管理。

pub mod signing;
pub mod staging;
pub mod storage;

pub use signing::UrlSigner;
pub use staging::{StagedFile, StagingArea};
pub use storage::{LocalObjectStore, ObjectEntry, ObjectStore};
