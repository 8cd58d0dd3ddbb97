//! 上传文件存储管理

use crate::signing::UrlSigner;
use async_trait::async_trait;
use carelink_core::utils::is_valid_object_key;
use carelink_core::{CarelinkError, Result};
use std::path::PathBuf;

/// 对象条目
#[derive(Debug, Clone)]
pub struct ObjectEntry {
    pub key: String,
    pub size: u64,
}

/// 对象存储接口
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// 按键存储文件内容
    async fn store(&self, key: &str, data: &[u8]) -> Result<()>;

    /// 按键获取文件内容，键不存在返回NotFound
    async fn download(&self, key: &str) -> Result<Vec<u8>>;

    /// 列出某前缀下的对象
    async fn list(&self, prefix: &str) -> Result<Vec<ObjectEntry>>;

    /// 生成限时签名下载链接
    fn signed_url(&self, key: &str, ttl_secs: i64) -> Result<String>;
}

/// 本地文件系统对象存储
pub struct LocalObjectStore {
    root: PathBuf,
    signer: UrlSigner,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>, signer: UrlSigner) -> Self {
        Self {
            root: root.into(),
            signer,
        }
    }

    /// 将对象键解析为根目录下的路径，拒绝越界键
    fn resolve(&self, key: &str) -> Result<PathBuf> {
        if !is_valid_object_key(key) {
            return Err(CarelinkError::Storage(format!("invalid object key: {}", key)));
        }
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn store(&self, key: &str, data: &[u8]) -> Result<()> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| CarelinkError::Storage(e.to_string()))?;
        }

        tokio::fs::write(&path, data)
            .await
            .map_err(|e| CarelinkError::Storage(e.to_string()))?;
        Ok(())
    }

    async fn download(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.resolve(key)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(CarelinkError::NotFound(
                format!("object not found: {}", key),
            )),
            Err(e) => Err(CarelinkError::Storage(e.to_string())),
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectEntry>> {
        let dir = self.resolve(prefix.trim_end_matches('/'))?;
        let mut entries = Vec::new();

        let mut read_dir = match tokio::fs::read_dir(&dir).await {
            Ok(read_dir) => read_dir,
            // 空前缀视为无对象
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(entries),
            Err(e) => return Err(CarelinkError::Storage(e.to_string())),
        };

        while let Some(entry) = read_dir
            .next_entry()
            .await
            .map_err(|e| CarelinkError::Storage(e.to_string()))?
        {
            let metadata = entry
                .metadata()
                .await
                .map_err(|e| CarelinkError::Storage(e.to_string()))?;
            if metadata.is_file() {
                entries.push(ObjectEntry {
                    key: format!(
                        "{}/{}",
                        prefix.trim_end_matches('/'),
                        entry.file_name().to_string_lossy()
                    ),
                    size: metadata.len(),
                });
            }
        }

        Ok(entries)
    }

    fn signed_url(&self, key: &str, ttl_secs: i64) -> Result<String> {
        self.signer.sign(key, ttl_secs)
    }
}
