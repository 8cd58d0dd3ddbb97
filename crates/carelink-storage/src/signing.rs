//! 下载链接签名

use carelink_core::{CarelinkError, Result};
use chrono::Utc;
use sha2::{Digest, Sha256};

/// 签名下载链接生成与校验
#[derive(Debug, Clone)]
pub struct UrlSigner {
    secret: String,
}

impl UrlSigner {
    pub fn new(secret: &str) -> Self {
        Self {
            secret: secret.to_string(),
        }
    }

    /// 生成限时签名链接
    pub fn sign(&self, key: &str, ttl_secs: i64) -> Result<String> {
        if self.secret.is_empty() {
            return Err(CarelinkError::Configuration(
                "签名密钥未配置".to_string(),
            ));
        }

        let expires = Utc::now().timestamp() + ttl_secs;
        Ok(format!(
            "/objects/{}?expires={}&sig={}",
            key,
            expires,
            self.signature(key, expires)
        ))
    }

    /// 校验签名与有效期
    pub fn verify(&self, key: &str, expires: i64, sig: &str) -> bool {
        if expires <= Utc::now().timestamp() {
            return false;
        }
        self.signature(key, expires) == sig
    }

    fn signature(&self, key: &str, expires: i64) -> String {
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        hasher.update(b"|");
        hasher.update(expires.to_string().as_bytes());
        hasher.update(b"|");
        hasher.update(self.secret.as_bytes());
        format!("sha256={:x}", hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_verify() {
        let signer = UrlSigner::new("test-secret");
        let url = signer.sign("38/scan.jpg", 600).unwrap();
        assert!(url.starts_with("/objects/38/scan.jpg?expires="));

        // 从链接反解参数再校验
        let query = url.split('?').nth(1).unwrap();
        let mut expires = 0;
        let mut sig = String::new();
        for pair in query.split('&') {
            let (name, value) = pair.split_once('=').unwrap();
            match name {
                "expires" => expires = value.parse().unwrap(),
                "sig" => sig = value.to_string(),
                _ => {}
            }
        }
        assert!(signer.verify("38/scan.jpg", expires, &sig));
    }

    #[test]
    fn test_verify_rejects_expired() {
        let signer = UrlSigner::new("test-secret");
        let expires = Utc::now().timestamp() - 10;
        let sig = signer.signature("38/scan.jpg", expires);
        assert!(!signer.verify("38/scan.jpg", expires, &sig));
    }

    #[test]
    fn test_verify_rejects_bad_signature() {
        let signer = UrlSigner::new("test-secret");
        let expires = Utc::now().timestamp() + 600;
        assert!(!signer.verify("38/scan.jpg", expires, "sha256=deadbeef"));

        // 其他密钥签出的链接无效
        let other = UrlSigner::new("other-secret");
        let sig = other.signature("38/scan.jpg", expires);
        assert!(!signer.verify("38/scan.jpg", expires, &sig));
    }

    #[test]
    fn test_sign_requires_secret() {
        let signer = UrlSigner::new("");
        assert!(signer.sign("38/scan.jpg", 600).is_err());
    }
}
