//! 访问凭据
//!
//! 网关只依赖 [`CredentialProvider`]，令牌的获取和刷新由外部完成。

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::path::PathBuf;

/// 提供访问令牌的能力
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn access_token(&self) -> Result<String>;
}

/// 固定令牌
pub struct StaticToken {
    token: String,
}

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl CredentialProvider for StaticToken {
    async fn access_token(&self) -> Result<String> {
        if self.token.is_empty() {
            return Err(anyhow!("access token is empty"));
        }
        Ok(self.token.clone())
    }
}

/// 从缓存的 token.json 读取令牌，每次调用都重新读取文件，
/// 这样外部刷新后的令牌能立即生效
pub struct TokenFile {
    path: PathBuf,
}

impl TokenFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CredentialProvider for TokenFile {
    async fn access_token(&self) -> Result<String> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| anyhow!("failed to read {}: {}", self.path.display(), e))?;
        let value: serde_json::Value = serde_json::from_str(&content)?;

        // 兼容 {"access_token": ...} 和 google 授权文件的 {"token": ...}
        value
            .get("access_token")
            .or_else(|| value.get("token"))
            .and_then(|v| v.as_str())
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .ok_or_else(|| anyhow!("no access token in {}", self.path.display()))
    }
}
