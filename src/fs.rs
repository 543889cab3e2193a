//! 本地文件系统抽象
//!
//! 树构建和上传只通过 [`FileSystem`] 访问磁盘，测试中可以替换为内存实现。

use async_trait::async_trait;
use std::io;
use thiserror::Error;
use tokio::fs;

/// 目录条目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub is_symlink: bool,
}

/// 文件系统错误
#[derive(Error, Debug)]
pub enum FsError {
    #[error("路径不存在: {0}")]
    NotFound(String),

    #[error("没有权限访问: {0}")]
    PermissionDenied(String),

    #[error("不是目录: {0}")]
    NotADirectory(String),

    #[error("文件系统错误: {path}: {source}")]
    Other {
        path: String,
        #[source]
        source: io::Error,
    },
}

impl FsError {
    pub fn from_io(path: &str, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => FsError::NotFound(path.to_string()),
            io::ErrorKind::PermissionDenied => FsError::PermissionDenied(path.to_string()),
            _ => FsError::Other {
                path: path.to_string(),
                source: err,
            },
        }
    }
}

/// 文件系统接口
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// 列出目录条目（顺序由底层文件系统决定）
    async fn list_directory(&self, path: &str) -> Result<Vec<DirEntry>, FsError>;

    /// 路径是否为目录（跟随符号链接，出错视为否）
    async fn is_directory(&self, path: &str) -> bool;

    /// 读取整个文件
    async fn read_file(&self, path: &str) -> Result<Vec<u8>, FsError>;

    /// 文件大小，无法获取时为 0
    async fn file_len(&self, path: &str) -> u64;

    /// 规范化路径（解析符号链接），用于检测目录环
    async fn canonicalize(&self, path: &str) -> Result<String, FsError>;
}

/// 基于 tokio::fs 的本地实现
#[derive(Debug, Default, Clone)]
pub struct LocalFileSystem;

impl LocalFileSystem {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FileSystem for LocalFileSystem {
    async fn list_directory(&self, path: &str) -> Result<Vec<DirEntry>, FsError> {
        let metadata = fs::metadata(path)
            .await
            .map_err(|e| FsError::from_io(path, e))?;
        if !metadata.is_dir() {
            return Err(FsError::NotADirectory(path.to_string()));
        }

        let mut reader = fs::read_dir(path)
            .await
            .map_err(|e| FsError::from_io(path, e))?;

        let mut entries = Vec::new();
        while let Some(entry) = reader
            .next_entry()
            .await
            .map_err(|e| FsError::from_io(path, e))?
        {
            let is_symlink = entry
                .file_type()
                .await
                .map(|t| t.is_symlink())
                .unwrap_or(false);
            entries.push(DirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_symlink,
            });
        }

        Ok(entries)
    }

    async fn is_directory(&self, path: &str) -> bool {
        fs::metadata(path)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
    }

    async fn read_file(&self, path: &str) -> Result<Vec<u8>, FsError> {
        fs::read(path).await.map_err(|e| FsError::from_io(path, e))
    }

    async fn file_len(&self, path: &str) -> u64 {
        fs::metadata(path).await.map(|m| m.len()).unwrap_or(0)
    }

    async fn canonicalize(&self, path: &str) -> Result<String, FsError> {
        let canonical = fs::canonicalize(path)
            .await
            .map_err(|e| FsError::from_io(path, e))?;
        Ok(canonical.to_string_lossy().into_owned())
    }
}
