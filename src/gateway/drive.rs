//! Google Drive v3 网关

use super::{CredentialProvider, GatewayError, RemoteGateway, IO_TIMEOUT_SECS, OP_TIMEOUT_SECS};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub const DRIVE_FILES_URL: &str = "https://www.googleapis.com/drive/v3/files";
pub const DRIVE_UPLOAD_URL: &str = "https://www.googleapis.com/upload/drive/v3/files";
/// Drive 用这个 MIME 类型表示目录
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

#[derive(Debug, Deserialize)]
struct CreatedFile {
    #[serde(default)]
    id: String,
}

pub struct DriveGateway {
    client: Client,
    credentials: Arc<dyn CredentialProvider>,
    files_url: String,
    upload_url: String,
    name: String,
}

impl DriveGateway {
    pub fn new(credentials: Arc<dyn CredentialProvider>) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(OP_TIMEOUT_SECS))
            .timeout(Duration::from_secs(IO_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            credentials,
            files_url: DRIVE_FILES_URL.to_string(),
            upload_url: DRIVE_UPLOAD_URL.to_string(),
            name: "gdrive".to_string(),
        })
    }

    /// 替换 API 地址（测试或代理时使用）
    pub fn with_endpoints(mut self, files_url: &str, upload_url: &str) -> Self {
        self.files_url = files_url.trim_end_matches('/').to_string();
        self.upload_url = upload_url.trim_end_matches('/').to_string();
        self
    }

    async fn token(&self) -> Result<String, GatewayError> {
        self.credentials
            .access_token()
            .await
            .map_err(|e| GatewayError::Credentials(e.to_string()))
    }

    async fn create_folder_in(
        &self,
        parent_id: Option<&str>,
        name: &str,
    ) -> Result<String, GatewayError> {
        let mut metadata = json!({
            "name": name,
            "mimeType": FOLDER_MIME_TYPE,
        });
        if let Some(parent) = parent_id {
            metadata["parents"] = json!([parent]);
        }

        let response = self
            .client
            .post(format!("{}?fields=id", self.files_url))
            .bearer_auth(self.token().await?)
            .json(&metadata)
            .send()
            .await?;

        let id = Self::parse_id(response).await?;
        debug!("创建目录 {} -> {}", name, id);
        Ok(id)
    }

    async fn parse_id(response: Response) -> Result<String, GatewayError> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let created: CreatedFile = serde_json::from_str(&body)
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;
        if created.id.is_empty() {
            return Err(GatewayError::InvalidResponse("missing id".to_string()));
        }
        Ok(created.id)
    }
}

/// 构造 multipart/related 请求体：第一部分是 JSON 元数据，第二部分是文件内容
pub(crate) fn multipart_related(
    boundary: &str,
    metadata: &serde_json::Value,
    content_type: &str,
    data: &[u8],
) -> Vec<u8> {
    let mut body = Vec::with_capacity(data.len() + 512);
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.extend_from_slice(metadata.to_string().as_bytes());
    body.extend_from_slice(format!("\r\n--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    body
}

#[async_trait]
impl RemoteGateway for DriveGateway {
    async fn create_root_folder(&self, name: &str) -> Result<String, GatewayError> {
        self.create_folder_in(None, name).await
    }

    async fn create_folder(&self, parent_id: &str, name: &str) -> Result<String, GatewayError> {
        self.create_folder_in(Some(parent_id), name).await
    }

    async fn create_file(
        &self,
        parent_id: &str,
        name: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> Result<String, GatewayError> {
        let metadata = json!({
            "name": name,
            "parents": [parent_id],
        });
        let boundary = format!("drivemirror-{}", uuid::Uuid::new_v4().simple());
        let body = multipart_related(&boundary, &metadata, content_type, &data);

        let response = self
            .client
            .post(format!("{}?uploadType=multipart&fields=id", self.upload_url))
            .bearer_auth(self.token().await?)
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/related; boundary={}", boundary),
            )
            .body(body)
            .send()
            .await?;

        let id = Self::parse_id(response).await?;
        debug!("上传文件 {} ({} 字节) -> {}", name, data.len(), id);
        Ok(id)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::StaticToken;
    use std::sync::Mutex;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// 收到的请求：请求头（原样文本）和请求体
    type Captured = Arc<Mutex<Vec<(String, Vec<u8>)>>>;

    /// 极简 HTTP 服务，按顺序返回预设响应
    async fn serve(responses: Vec<(u16, &'static str)>) -> (String, Captured) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let captured: Captured = Arc::new(Mutex::new(Vec::new()));
        let sink = captured.clone();

        tokio::spawn(async move {
            for (status, body) in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut buf = Vec::new();
                let mut chunk = [0u8; 4096];
                let (head, body_start) = loop {
                    let n = socket.read(&mut chunk).await.unwrap();
                    buf.extend_from_slice(&chunk[..n]);
                    if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                        break (String::from_utf8_lossy(&buf[..pos]).to_string(), pos + 4);
                    }
                };
                let len = head
                    .lines()
                    .find_map(|l| {
                        let lower = l.to_ascii_lowercase();
                        lower
                            .strip_prefix("content-length:")
                            .map(|v| v.trim().parse::<usize>().unwrap())
                    })
                    .unwrap_or(0);
                while buf.len() < body_start + len {
                    let n = socket.read(&mut chunk).await.unwrap();
                    buf.extend_from_slice(&chunk[..n]);
                }
                sink.lock()
                    .unwrap()
                    .push((head, buf[body_start..body_start + len].to_vec()));

                let response = format!(
                    "HTTP/1.1 {} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                socket.write_all(response.as_bytes()).await.unwrap();
                socket.shutdown().await.ok();
            }
        });

        (format!("http://{}", addr), captured)
    }

    fn gateway(base: &str) -> DriveGateway {
        DriveGateway::new(Arc::new(StaticToken::new("secret")))
            .unwrap()
            .with_endpoints(&format!("{}/files", base), &format!("{}/upload", base))
    }

    #[test]
    fn test_multipart_layout() {
        let metadata = json!({"name": "a.png", "parents": ["P"]});
        let body = multipart_related("b", &metadata, "image/png", b"DATA");
        let text = String::from_utf8(body).unwrap();

        assert!(text.starts_with("--b\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{"));
        assert!(text.contains("\"parents\":[\"P\"]"));
        assert!(text.contains("\r\n--b\r\nContent-Type: image/png\r\n\r\nDATA\r\n--b--\r\n"));
    }

    #[tokio::test]
    async fn test_create_root_and_child_folder() {
        let (base, captured) = serve(vec![(200, r#"{"id":"R"}"#), (200, r#"{"id":"P"}"#)]).await;
        let gw = gateway(&base);

        assert_eq!(gw.create_root_folder("ROOT").await.unwrap(), "R");
        assert_eq!(gw.create_folder("R", "pics").await.unwrap(), "P");

        let requests = captured.lock().unwrap().clone();
        assert_eq!(requests.len(), 2);

        let (head, body) = &requests[0];
        assert!(head.starts_with("POST /files?fields=id "));
        assert!(head.to_ascii_lowercase().contains("authorization: bearer secret"));
        let root: serde_json::Value = serde_json::from_slice(body).unwrap();
        assert_eq!(root["name"], "ROOT");
        assert_eq!(root["mimeType"], FOLDER_MIME_TYPE);
        assert!(root.get("parents").is_none());

        let child: serde_json::Value = serde_json::from_slice(&requests[1].1).unwrap();
        assert_eq!(child["parents"], json!(["R"]));
    }

    #[tokio::test]
    async fn test_create_file_uploads_multipart() {
        let (base, captured) = serve(vec![(200, r#"{"id":"F1"}"#)]).await;
        let gw = gateway(&base);

        let id = gw
            .create_file("R", "notes.txt", "text/plain", b"hello".to_vec())
            .await
            .unwrap();
        assert_eq!(id, "F1");

        let (head, body) = captured.lock().unwrap()[0].clone();
        assert!(head.starts_with("POST /upload?uploadType=multipart&fields=id "));
        assert!(head.to_ascii_lowercase().contains("content-type: multipart/related; boundary="));
        let text = String::from_utf8(body).unwrap();
        assert!(text.contains("Content-Type: text/plain\r\n\r\nhello\r\n"));
        assert!(text.contains("\"name\":\"notes.txt\""));
    }

    #[tokio::test]
    async fn test_error_status_is_gateway_error() {
        let (base, _) = serve(vec![(403, r#"{"error":"quota"}"#)]).await;
        let err = gateway(&base).create_root_folder("ROOT").await.unwrap_err();

        assert!(matches!(err, GatewayError::Status { status: 403, .. }));
    }

    #[tokio::test]
    async fn test_missing_id_is_invalid_response() {
        let (base, _) = serve(vec![(200, r#"{}"#)]).await;
        let err = gateway(&base).create_root_folder("ROOT").await.unwrap_err();

        assert!(matches!(err, GatewayError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_credentials_failure() {
        let gw = DriveGateway::new(Arc::new(StaticToken::new("")))
            .unwrap()
            .with_endpoints("http://127.0.0.1:9/files", "http://127.0.0.1:9/upload");
        let err = gw.create_root_folder("ROOT").await.unwrap_err();

        assert!(matches!(err, GatewayError::Credentials(_)));
    }
}
