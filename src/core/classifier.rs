//! 路径分类 - 区分目录和文件，并按扩展名推断文件的内容类型

use crate::fs::FileSystem;
use std::collections::HashMap;
use std::path::Path;

/// 未知或缺失扩展名时使用的内容类型
pub const DEFAULT_CONTENT_TYPE: &str = "text/plain";

/// 内置扩展名映射
const BUILTIN_CONTENT_TYPES: &[(&str, &str)] = &[
    ("txt", "text/plain"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
    ("bmp", "image/bmp"),
    ("webp", "image/webp"),
    ("svg", "image/svg+xml"),
    ("pdf", "application/pdf"),
    ("json", "application/json"),
    ("csv", "text/csv"),
    ("html", "text/html"),
    ("htm", "text/html"),
    ("xml", "application/xml"),
    ("zip", "application/zip"),
    ("mp3", "audio/mpeg"),
    ("mp4", "video/mp4"),
];

/// 分类结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathKind {
    Folder,
    File { content_type: String },
}

/// 扩展名到内容类型的映射表
#[derive(Debug, Clone)]
pub struct ContentTypes {
    table: HashMap<String, String>,
}

impl Default for ContentTypes {
    fn default() -> Self {
        Self {
            table: BUILTIN_CONTENT_TYPES
                .iter()
                .map(|(ext, ct)| (ext.to_string(), ct.to_string()))
                .collect(),
        }
    }
}

impl ContentTypes {
    /// 内置映射加上用户配置的覆盖项
    pub fn with_overrides(overrides: &HashMap<String, String>) -> Self {
        let mut types = Self::default();
        for (ext, ct) in overrides {
            let ext = ext.trim_start_matches('.').to_lowercase();
            if !ext.is_empty() && !ct.is_empty() {
                types.table.insert(ext, ct.clone());
            }
        }
        types
    }

    /// 根据文件名查找内容类型（取最后一个 `.` 之后的部分，大小写不敏感）
    pub fn lookup(&self, file_name: &str) -> &str {
        file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .and_then(|ext| self.table.get(&ext))
            .map(String::as_str)
            .unwrap_or(DEFAULT_CONTENT_TYPE)
    }

    /// 对路径进行分类
    pub async fn classify(&self, fs: &dyn FileSystem, path: &str) -> PathKind {
        if fs.is_directory(path).await {
            return PathKind::Folder;
        }

        let name = Path::new(path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string());

        PathKind::File {
            content_type: self.lookup(&name).to_string(),
        }
    }
}

/// 使用内置映射对路径分类
pub async fn classify(fs: &dyn FileSystem, path: &str) -> PathKind {
    ContentTypes::default().classify(fs, path).await
}
