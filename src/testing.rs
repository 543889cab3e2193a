//! 测试用的内存文件系统和记录调用的远程网关

use crate::fs::{DirEntry, FileSystem, FsError};
use crate::gateway::{GatewayError, RemoteGateway};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

enum MemEntry {
    Dir { children: Vec<String> },
    File { data: Vec<u8> },
    Symlink { target: String },
}

/// 内存文件系统，目录列表保持插入顺序
pub struct MemoryFileSystem {
    sep: char,
    entries: HashMap<String, MemEntry>,
    denied: HashSet<String>,
    broken: HashSet<String>,
    calls: AtomicUsize,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::with_separator('/')
    }

    pub fn with_separator(sep: char) -> Self {
        Self {
            sep,
            entries: HashMap::new(),
            denied: HashSet::new(),
            broken: HashSet::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn dir(self, path: &str) -> Self {
        self.insert(path, MemEntry::Dir { children: Vec::new() })
    }

    pub fn file(self, path: &str, data: &[u8]) -> Self {
        self.insert(path, MemEntry::File { data: data.to_vec() })
    }

    pub fn symlink(self, path: &str, target: &str) -> Self {
        self.insert(
            path,
            MemEntry::Symlink {
                target: target.to_string(),
            },
        )
    }

    /// 访问该路径时返回权限错误
    pub fn deny(mut self, path: &str) -> Self {
        self.denied.insert(path.to_string());
        self
    }

    /// 访问该路径时返回其他 IO 错误
    pub fn break_path(mut self, path: &str) -> Self {
        self.broken.insert(path.to_string());
        self
    }

    /// list_directory / read_file 的调用次数
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn insert(mut self, path: &str, entry: MemEntry) -> Self {
        if let Some((parent, name)) = path.rsplit_once(self.sep) {
            if let Some(MemEntry::Dir { children }) = self.entries.get_mut(parent) {
                if !children.iter().any(|c| c == name) {
                    children.push(name.to_string());
                }
            }
        }
        self.entries.insert(path.to_string(), entry);
        self
    }

    /// 解析路径中的符号链接前缀
    fn resolve(&self, path: &str) -> String {
        let mut current = path.to_string();
        for _ in 0..16 {
            let hit = self.entries.iter().find_map(|(link, entry)| match entry {
                MemEntry::Symlink { target } => {
                    if current == *link {
                        Some(target.clone())
                    } else {
                        current
                            .strip_prefix(link.as_str())
                            .filter(|rest| rest.starts_with(self.sep))
                            .map(|rest| format!("{}{}", target, rest))
                    }
                }
                _ => None,
            });
            match hit {
                Some(next) => current = next,
                None => break,
            }
        }
        current
    }

    fn check_access(&self, path: &str) -> Result<(), FsError> {
        if self.denied.contains(path) {
            return Err(FsError::PermissionDenied(path.to_string()));
        }
        if self.broken.contains(path) {
            return Err(FsError::Other {
                path: path.to_string(),
                source: io::Error::new(io::ErrorKind::Other, "simulated failure"),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl FileSystem for MemoryFileSystem {
    async fn list_directory(&self, path: &str) -> Result<Vec<DirEntry>, FsError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.check_access(path)?;

        let resolved = self.resolve(path);
        match self.entries.get(&resolved) {
            Some(MemEntry::Dir { children }) => Ok(children
                .iter()
                .map(|name| {
                    let full = format!("{}{}{}", resolved, self.sep, name);
                    DirEntry {
                        name: name.clone(),
                        is_symlink: matches!(
                            self.entries.get(&full),
                            Some(MemEntry::Symlink { .. })
                        ),
                    }
                })
                .collect()),
            Some(_) => Err(FsError::NotADirectory(path.to_string())),
            None => Err(FsError::NotFound(path.to_string())),
        }
    }

    async fn is_directory(&self, path: &str) -> bool {
        matches!(
            self.entries.get(&self.resolve(path)),
            Some(MemEntry::Dir { .. })
        )
    }

    async fn read_file(&self, path: &str) -> Result<Vec<u8>, FsError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.check_access(path)?;

        match self.entries.get(&self.resolve(path)) {
            Some(MemEntry::File { data }) => Ok(data.clone()),
            Some(_) => Err(FsError::Other {
                path: path.to_string(),
                source: io::Error::new(io::ErrorKind::Other, "not a file"),
            }),
            None => Err(FsError::NotFound(path.to_string())),
        }
    }

    async fn file_len(&self, path: &str) -> u64 {
        match self.entries.get(&self.resolve(path)) {
            Some(MemEntry::File { data }) => data.len() as u64,
            _ => 0,
        }
    }

    async fn canonicalize(&self, path: &str) -> Result<String, FsError> {
        let resolved = self.resolve(path);
        if self.entries.contains_key(&resolved) {
            Ok(resolved)
        } else {
            Err(FsError::NotFound(path.to_string()))
        }
    }
}

/// 网关收到的一次调用
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    RootFolder {
        name: String,
    },
    Folder {
        parent_id: String,
        name: String,
    },
    File {
        parent_id: String,
        name: String,
        content_type: String,
        data: Vec<u8>,
    },
}

impl GatewayCall {
    pub fn parent_id(&self) -> Option<&str> {
        match self {
            GatewayCall::RootFolder { .. } => None,
            GatewayCall::Folder { parent_id, .. } | GatewayCall::File { parent_id, .. } => {
                Some(parent_id)
            }
        }
    }
}

/// 记录所有调用的网关，第 n 次调用返回 `id-n`
pub struct RecordingGateway {
    calls: Mutex<Vec<GatewayCall>>,
    fail_at: Option<usize>,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_at: None,
        }
    }

    /// 第 `n` 次调用（从 1 开始）失败
    pub fn failing_at(n: usize) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_at: Some(n),
        }
    }

    pub fn calls(&self) -> Vec<GatewayCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: GatewayCall) -> Result<String, GatewayError> {
        let mut calls = self.calls.lock().unwrap();
        calls.push(call);
        let n = calls.len();
        if self.fail_at == Some(n) {
            return Err(GatewayError::Status {
                status: 500,
                body: "injected failure".to_string(),
            });
        }
        Ok(format!("id-{}", n))
    }
}

#[async_trait]
impl RemoteGateway for RecordingGateway {
    async fn create_root_folder(&self, name: &str) -> Result<String, GatewayError> {
        self.record(GatewayCall::RootFolder {
            name: name.to_string(),
        })
    }

    async fn create_folder(&self, parent_id: &str, name: &str) -> Result<String, GatewayError> {
        self.record(GatewayCall::Folder {
            parent_id: parent_id.to_string(),
            name: name.to_string(),
        })
    }

    async fn create_file(
        &self,
        parent_id: &str,
        name: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> Result<String, GatewayError> {
        self.record(GatewayCall::File {
            parent_id: parent_id.to_string(),
            name: name.to_string(),
            content_type: content_type.to_string(),
            data,
        })
    }

    fn name(&self) -> &str {
        "recording"
    }
}
