//! 推理暂存文件管理
//!
//! 推理调用前把文件内容落一份本地临时副本，单次调用独占，用完即弃。

use carelink_core::{CarelinkError, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing::warn;
use uuid::Uuid;

/// 暂存目录
#[derive(Debug, Clone)]
pub struct StagingArea {
    dir: PathBuf,
}

impl StagingArea {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// 写入一份暂存副本，文件名对每次调用唯一
    pub async fn stage(&self, original_name: &str, data: &[u8]) -> Result<StagedFile> {
        let name = format!(
            "{}-{}-{}",
            Uuid::new_v4().simple(),
            Utc::now().timestamp_millis(),
            original_name.replace(['/', '\\', ' '], "_")
        );
        let path = self.dir.join(name);

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| CarelinkError::Storage(e.to_string()))?;
        tokio::fs::write(&path, data)
            .await
            .map_err(|e| CarelinkError::Storage(e.to_string()))?;

        Ok(StagedFile { path })
    }
}

/// 单次调用的暂存副本
#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
}

impl StagedFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 删除暂存副本，失败只记录日志
    pub async fn cleanup(self) {
        if let Err(e) = tokio::fs::remove_file(&self.path).await {
            warn!("Failed to remove staging file {}: {}", self.path.display(), e);
        }
    }
}
