pub mod credentials;
pub mod drive;
pub mod operator;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

pub use credentials::{CredentialProvider, StaticToken, TokenFile};
pub use drive::DriveGateway;
pub use operator::OperatorGateway;

// ============ 公共常量 ============

/// 非 IO 操作超时（秒）- 创建目录等
pub const OP_TIMEOUT_SECS: u64 = 60;
/// IO 操作超时（秒）- 上传文件内容
pub const IO_TIMEOUT_SECS: u64 = 300;

/// 远程网关错误
///
/// 上传流程不区分具体原因，统一归为 HTTP_ERROR；这里保留细节用于日志。
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("请求失败: {0}")]
    Request(#[from] reqwest::Error),

    #[error("存储操作失败: {0}")]
    Storage(#[from] opendal::Error),

    #[error("无效的响应: {0}")]
    InvalidResponse(String),

    #[error("无法获取访问凭据: {0}")]
    Credentials(String),
}

/// 远程存储网关
///
/// 每次创建都返回一个不透明的标识，子节点用父节点的标识作为创建参数。
#[async_trait]
pub trait RemoteGateway: Send + Sync {
    /// 在顶层创建本次上传的根目录
    async fn create_root_folder(&self, name: &str) -> Result<String, GatewayError>;

    /// 在父目录下创建子目录
    async fn create_folder(&self, parent_id: &str, name: &str) -> Result<String, GatewayError>;

    /// 在父目录下上传文件
    async fn create_file(
        &self,
        parent_id: &str,
        name: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> Result<String, GatewayError>;

    /// 网关名称（用于日志）
    fn name(&self) -> &str;
}

/// 网关类型
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GatewayType {
    Drive,
    Local,
    S3,
    WebDav,
}

/// 网关配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    #[serde(rename = "type")]
    pub typ: GatewayType,
    /// Drive：直接给定的访问令牌
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    /// Drive：缓存令牌的 JSON 文件
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_file: Option<String>,
    /// Local：目标目录
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webdav_endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
}

impl GatewayConfig {
    pub fn new(typ: GatewayType) -> Self {
        Self {
            typ,
            access_token: None,
            token_file: None,
            path: None,
            bucket: None,
            region: None,
            access_key: None,
            secret_key: None,
            endpoint: None,
            prefix: None,
            webdav_endpoint: None,
            username: None,
            password: None,
            root: None,
        }
    }
}

/// 根据配置创建网关实例
pub fn create_gateway(config: &GatewayConfig) -> Result<Arc<dyn RemoteGateway>> {
    match config.typ {
        GatewayType::Drive => {
            let credentials: Arc<dyn CredentialProvider> =
                match (&config.access_token, &config.token_file) {
                    (Some(token), _) => Arc::new(StaticToken::new(token)),
                    (None, Some(file)) => Arc::new(TokenFile::new(file)),
                    (None, None) => {
                        return Err(anyhow::anyhow!(
                            "Drive gateway requires accessToken or tokenFile"
                        ))
                    }
                };
            tracing::info!("初始化 Google Drive 网关");
            Ok(Arc::new(DriveGateway::new(credentials)?) as Arc<dyn RemoteGateway>)
        }
        GatewayType::Local => {
            let path = config
                .path
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("Local gateway requires path"))?;
            tracing::info!("初始化本地网关: {}", path);
            Ok(Arc::new(OperatorGateway::local(path)?) as Arc<dyn RemoteGateway>)
        }
        GatewayType::S3 => {
            let bucket = config
                .bucket
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("S3 gateway requires bucket"))?;
            let region = config
                .region
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("S3 gateway requires region"))?;
            let access_key = config
                .access_key
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("S3 gateway requires accessKey"))?;
            let secret_key = config
                .secret_key
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("S3 gateway requires secretKey"))?;
            tracing::info!("初始化S3网关: bucket={}, region={}", bucket, region);
            Ok(Arc::new(OperatorGateway::s3(
                bucket,
                region,
                access_key,
                secret_key,
                config.endpoint.clone(),
                config.prefix.clone(),
            )?) as Arc<dyn RemoteGateway>)
        }
        GatewayType::WebDav => {
            let endpoint = config
                .webdav_endpoint
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("WebDAV gateway requires webdavEndpoint"))?;
            let username = config
                .username
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("WebDAV gateway requires username"))?;
            let password = config
                .password
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("WebDAV gateway requires password"))?;
            tracing::info!("初始化WebDAV网关: endpoint={}, root={:?}", endpoint, config.root);
            Ok(Arc::new(OperatorGateway::webdav(
                endpoint,
                username,
                password,
                config.root.clone(),
            )?) as Arc<dyn RemoteGateway>)
        }
    }
}
