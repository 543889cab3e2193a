//! 上传编排 - 把本地目录树按深度优先顺序在远程重建

use crate::core::builder::{ScanConfig, TreeBuilder};
use crate::core::node::{FolderNode, Node, TreeStats};
use crate::error::{ErrorKind, Result, UploadError};
use crate::fs::FileSystem;
use crate::gateway::RemoteGateway;
use crate::platform::Platform;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

/// 上传配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadConfig {
    /// 自动生成根目录名时使用的前缀
    #[serde(default = "default_root_name_prefix")]
    pub root_name_prefix: String,
    /// 固定的根目录名，设置后不再自动生成
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_name: Option<String>,
}

fn default_root_name_prefix() -> String {
    "DRIVEMIRROR-RESULT".to_string()
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            root_name_prefix: default_root_name_prefix(),
            root_name: None,
        }
    }
}

impl UploadConfig {
    /// 本次上传的根目录名
    pub fn resolve_root_name(&self) -> String {
        match &self.root_name {
            Some(name) if !name.is_empty() => name.clone(),
            _ => generate_root_name(&self.root_name_prefix),
        }
    }
}

/// 按当前时间生成根目录名
pub fn generate_root_name(prefix: &str) -> String {
    let now = chrono::Local::now();
    format!("{}-{}", prefix, now.format("[%Y-%m-%d]-[%H:%M:%S]"))
}

/// 上传进度
#[derive(Debug, Clone)]
pub struct UploadProgress {
    pub current_path: String,
    pub folders_created: u32,
    pub files_created: u32,
    pub bytes_uploaded: u64,
    pub total_folders: u32,
    pub total_files: u32,
    pub done: bool,
}

/// 上传报告
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadReport {
    pub root_id: String,
    pub root_name: String,
    pub folders_created: u32,
    pub files_created: u32,
    pub bytes_uploaded: u64,
    pub duration_ms: u64,
    /// 完成后的树，每个节点都带有远程标识
    pub tree: FolderNode,
}

/// 一次上传的最终结果，供命令行以 JSON 输出
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadOutcome<'a> {
    pub kind: ErrorKind,
    pub code: u8,
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<&'a UploadReport>,
}

impl<'a> UploadOutcome<'a> {
    pub fn from_result(result: &'a Result<UploadReport>) -> Self {
        let kind = ErrorKind::of(result);
        let (error, report) = match result {
            Ok(report) => (None, Some(report)),
            Err(e) => (Some(e.to_string()), None),
        };
        Self {
            kind,
            code: kind.code(),
            message: kind.message(),
            error,
            report,
        }
    }
}

/// 一次上传过程中的计数
struct Counters {
    total: TreeStats,
    folders: u32,
    files: u32,
    bytes: u64,
}

/// 上传编排器
pub struct Uploader {
    gateway: Arc<dyn RemoteGateway>,
    fs: Arc<dyn FileSystem>,
    platform: Platform,
    scan_config: ScanConfig,
    upload_config: UploadConfig,
    progress_tx: Option<mpsc::Sender<UploadProgress>>,
}

impl Uploader {
    pub fn new(gateway: Arc<dyn RemoteGateway>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            gateway,
            fs,
            platform: Platform::current(),
            scan_config: ScanConfig::default(),
            upload_config: UploadConfig::default(),
            progress_tx: None,
        }
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub fn with_scan_config(mut self, config: ScanConfig) -> Self {
        self.scan_config = config;
        self
    }

    pub fn with_upload_config(mut self, config: UploadConfig) -> Self {
        self.upload_config = config;
        self
    }

    pub fn with_progress(mut self, tx: mpsc::Sender<UploadProgress>) -> Self {
        self.progress_tx = Some(tx);
        self
    }

    /// 上传入口：检查平台、扫描目录、在远程重建整棵树
    ///
    /// 第一个错误就会终止整个流程，已创建的远程对象不会回滚。
    pub async fn upload(&self, root_path: &str) -> Result<UploadReport> {
        let start = Instant::now();
        let mut tree = self.build_tree(root_path).await?;
        let stats = self.upload_tree(&mut tree).await?;

        let report = UploadReport {
            root_id: tree.remote_id.clone(),
            root_name: tree.name.clone(),
            folders_created: stats.folders,
            files_created: stats.files,
            bytes_uploaded: stats.bytes,
            duration_ms: start.elapsed().as_millis() as u64,
            tree,
        };

        info!(
            "上传完成: {} 个目录, {} 个文件, {} 字节, 耗时 {}ms",
            report.folders_created, report.files_created, report.bytes_uploaded, report.duration_ms
        );

        Ok(report)
    }

    /// 检查平台并扫描目录
    pub async fn build_tree(&self, root_path: &str) -> Result<FolderNode> {
        if !self.platform.is_supported() {
            error!("不支持的平台: {}", self.platform);
            return Err(UploadError::NotSupportedPlatform(self.platform.to_string()));
        }

        let root_name = self.upload_config.resolve_root_name();
        let builder =
            TreeBuilder::with_config(self.fs.clone(), self.platform, self.scan_config.clone());

        builder.build(root_path, &root_name).await.inspect_err(|e| {
            error!("扫描目录失败: {}", e);
        })
    }

    /// 在远程重建一棵已构建的树
    ///
    /// 出错时树中已经创建成功的节点仍保留各自的远程标识。
    pub async fn upload_tree(&self, root: &mut FolderNode) -> Result<TreeStats> {
        let mut counters = Counters {
            total: root.stats(),
            folders: 0,
            files: 0,
            bytes: 0,
        };

        info!(
            "开始上传到 {}: {} 个目录, {} 个文件",
            self.gateway.name(),
            counters.total.folders,
            counters.total.files
        );

        if let Err(e) = self.upload_folder(root, &mut counters).await {
            error!("上传失败: {}", e);
            return Err(e);
        }

        self.send_progress(&counters, "", true).await;

        Ok(TreeStats {
            folders: counters.folders,
            files: counters.files,
            bytes: counters.bytes,
        })
    }

    /// 先保证当前目录已存在于远程，再按顺序处理子节点
    fn upload_folder<'a>(
        &'a self,
        folder: &'a mut FolderNode,
        counters: &'a mut Counters,
    ) -> BoxFuture<'a, Result<()>> {
        async move {
            if folder.is_root {
                folder.remote_id = self.gateway.create_root_folder(&folder.name).await?;
                counters.folders += 1;
                debug!("创建根目录 {} -> {}", folder.name, folder.remote_id);
                self.send_progress(counters, &folder.local_path, false).await;
            }

            let parent_id = folder.remote_id.clone();

            for child in folder.children.iter_mut() {
                match child {
                    Node::Folder(sub) => {
                        sub.remote_id = self.gateway.create_folder(&parent_id, &sub.name).await?;
                        counters.folders += 1;
                        debug!("创建目录 {} -> {}", sub.local_path, sub.remote_id);
                        self.send_progress(counters, &sub.local_path, false).await;

                        self.upload_folder(sub, counters).await?;
                    }
                    Node::File(file) => {
                        let data = self.fs.read_file(&file.local_path).await?;
                        let size = data.len() as u64;
                        file.remote_id = self
                            .gateway
                            .create_file(&parent_id, &file.name, &file.content_type, data)
                            .await?;
                        counters.files += 1;
                        counters.bytes += size;
                        debug!("上传文件 {} -> {}", file.local_path, file.remote_id);
                        self.send_progress(counters, &file.local_path, false).await;
                    }
                }
            }

            Ok(())
        }
        .boxed()
    }

    async fn send_progress(&self, counters: &Counters, current_path: &str, done: bool) {
        if let Some(tx) = &self.progress_tx {
            let _ = tx
                .send(UploadProgress {
                    current_path: current_path.to_string(),
                    folders_created: counters.folders,
                    files_created: counters.files,
                    bytes_uploaded: counters.bytes,
                    total_folders: counters.total.folders,
                    total_files: counters.total.files,
                    done,
                })
                .await;
        }
    }
}
