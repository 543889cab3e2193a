//! 基于 opendal 的网关：标识就是远程路径
//!
//! 目录标识以 `/` 结尾，子节点标识为 `父标识 + 名称`。

use super::{GatewayError, RemoteGateway, IO_TIMEOUT_SECS, OP_TIMEOUT_SECS};
use async_trait::async_trait;
use opendal::{layers::TimeoutLayer, Operator};
use std::time::Duration;
use tracing::{debug, info};

pub struct OperatorGateway {
    operator: Operator,
    name: String,
}

impl OperatorGateway {
    pub fn new(operator: Operator, name: impl Into<String>) -> Self {
        Self {
            operator,
            name: name.into(),
        }
    }

    /// 本地目录
    pub fn local(path: &str) -> Result<Self, GatewayError> {
        use opendal::services::Fs;

        std::fs::create_dir_all(path).map_err(|e| {
            GatewayError::InvalidResponse(format!("无法创建目标目录 {}: {}", path, e))
        })?;
        let operator = Operator::new(Fs::default().root(path))?.finish();
        Ok(Self::new(operator, format!("local:{}", path)))
    }

    pub fn s3(
        bucket: &str,
        region: &str,
        access_key: &str,
        secret_key: &str,
        endpoint: Option<String>,
        prefix: Option<String>,
    ) -> Result<Self, GatewayError> {
        use opendal::services::S3;

        let mut builder = S3::default()
            .bucket(bucket)
            .region(region)
            .access_key_id(access_key)
            .secret_access_key(secret_key);

        if let Some(ref ep) = endpoint {
            builder = builder.endpoint(ep);
        }

        if let Some(ref p) = prefix {
            builder = builder.root(p);
        }

        let operator = Operator::new(builder)?
            .layer(
                TimeoutLayer::default()
                    .with_timeout(Duration::from_secs(OP_TIMEOUT_SECS))
                    .with_io_timeout(Duration::from_secs(IO_TIMEOUT_SECS)),
            )
            .finish();

        let name = format!(
            "s3://{}{}",
            bucket,
            prefix
                .as_deref()
                .map(|p| format!("/{}", p.trim_start_matches('/')))
                .unwrap_or_default()
        );

        Ok(Self::new(operator, name))
    }

    pub fn webdav(
        endpoint: &str,
        username: &str,
        password: &str,
        root: Option<String>,
    ) -> Result<Self, GatewayError> {
        use opendal::services::Webdav;

        let mut builder = Webdav::default()
            .endpoint(endpoint)
            .username(username)
            .password(password);

        if let Some(ref r) = root {
            builder = builder.root(r);
        }

        let operator = Operator::new(builder)?
            .layer(
                TimeoutLayer::default()
                    .with_timeout(Duration::from_secs(OP_TIMEOUT_SECS))
                    .with_io_timeout(Duration::from_secs(IO_TIMEOUT_SECS)),
            )
            .finish();

        let name = format!(
            "webdav://{}{}",
            endpoint.trim_end_matches('/'),
            root.as_deref()
                .map(|r| format!("/{}", r.trim_start_matches('/')))
                .unwrap_or_default()
        );

        Ok(Self::new(operator, name))
    }

    async fn exists(&self, path: &str) -> Result<bool, GatewayError> {
        match self.operator.stat(path).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == opendal::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// 目录标识统一以 `/` 结尾
fn dir_id(parent_id: &str, name: &str) -> String {
    format!("{}{}/", parent_id, name)
}

#[async_trait]
impl RemoteGateway for OperatorGateway {
    async fn create_root_folder(&self, name: &str) -> Result<String, GatewayError> {
        let mut id = dir_id("", name);
        // 每次上传都应得到新的根目录
        if self.exists(&id).await? {
            let suffix = uuid::Uuid::new_v4().simple().to_string();
            id = dir_id("", &format!("{}-{}", name, &suffix[..8]));
            info!("根目录 {} 已存在，改用 {}", name, id);
        }

        self.operator.create_dir(&id).await?;
        Ok(id)
    }

    async fn create_folder(&self, parent_id: &str, name: &str) -> Result<String, GatewayError> {
        let id = dir_id(parent_id, name);
        self.operator.create_dir(&id).await?;
        Ok(id)
    }

    async fn create_file(
        &self,
        parent_id: &str,
        name: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> Result<String, GatewayError> {
        let id = format!("{}{}", parent_id, name);
        let size = data.len();

        if self
            .operator
            .info()
            .full_capability()
            .write_with_content_type
        {
            self.operator
                .write_with(&id, data)
                .content_type(content_type)
                .await?;
        } else {
            self.operator.write(&id, data).await?;
        }

        debug!("写入 {} ({} 字节, {})", id, size, content_type);
        Ok(id)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
