use crate::core::classifier::{ContentTypes, PathKind};
use crate::core::node::{FileNode, FolderNode, Node};
use crate::error::{Result, UploadError};
use crate::fs::FileSystem;
use crate::platform::Platform;
use futures::future::BoxFuture;
use futures::FutureExt;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 目录扫描配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanConfig {
    /// 每一层按名称排序，保证结果确定；关闭后保持文件系统返回的顺序
    #[serde(default = "default_true")]
    pub sort_entries: bool,
    /// 是否跟随符号链接；关闭时直接跳过链接条目
    #[serde(default = "default_true")]
    pub follow_symlinks: bool,
    /// 排除规则（glob，相对于根目录）
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
    /// 额外的扩展名 -> 内容类型映射
    #[serde(default)]
    pub content_types: HashMap<String, String>,
}

fn default_true() -> bool {
    true
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            sort_entries: true,
            follow_symlinks: true,
            exclude_patterns: Vec::new(),
            content_types: HashMap::new(),
        }
    }
}

/// 编译后的排除规则
struct ExcludeRule {
    regex: Regex,
    /// 规则不含 `/` 时同时匹配文件名
    match_name: bool,
}

/// 目录树构建器
pub struct TreeBuilder {
    fs: Arc<dyn FileSystem>,
    platform: Platform,
    config: ScanConfig,
    content_types: ContentTypes,
    excludes: Vec<ExcludeRule>,
}

impl TreeBuilder {
    pub fn new(fs: Arc<dyn FileSystem>, platform: Platform) -> Self {
        Self::with_config(fs, platform, ScanConfig::default())
    }

    pub fn with_config(fs: Arc<dyn FileSystem>, platform: Platform, config: ScanConfig) -> Self {
        let content_types = ContentTypes::with_overrides(&config.content_types);
        let excludes = config
            .exclude_patterns
            .iter()
            .filter_map(|p| {
                let rule = compile_pattern(p);
                if rule.is_none() {
                    warn!("忽略无效的排除规则: {}", p);
                }
                rule
            })
            .collect();

        Self {
            fs,
            platform,
            config,
            content_types,
            excludes,
        }
    }

    /// 扫描 `root_path`，生成以 `root_name` 命名的镜像树
    ///
    /// 任何文件系统错误都会立即终止扫描，不返回部分结果。
    pub async fn build(&self, root_path: &str, root_name: &str) -> Result<FolderNode> {
        if !self.platform.is_supported() {
            return Err(UploadError::NotSupportedPlatform(self.platform.to_string()));
        }

        info!("开始扫描目录: {}", root_path);

        let mut root = FolderNode::root(root_name, root_path);
        let mut ancestors = HashSet::new();
        // 根目录不存在时这里会失败，交给下面的列目录报告具体错误
        if let Ok(canonical) = self.fs.canonicalize(root_path).await {
            ancestors.insert(canonical);
        }

        self.scan_folder(&mut root, root_path, &mut ancestors).await?;

        let stats = root.stats();
        info!(
            "扫描完成: {} 个目录, {} 个文件, 共 {} 字节",
            stats.folders, stats.files, stats.bytes
        );

        Ok(root)
    }

    /// 深度优先扫描单个目录，子目录在处理下一个兄弟条目前完整展开
    ///
    /// `ancestors` 只包含当前路径上各级目录的规范路径，
    /// 同一目录经不同链接再次出现不算环。
    fn scan_folder<'a>(
        &'a self,
        folder: &'a mut FolderNode,
        root_path: &'a str,
        ancestors: &'a mut HashSet<String>,
    ) -> BoxFuture<'a, Result<()>> {
        async move {
            let mut entries = self.fs.list_directory(&folder.local_path).await?;
            if self.config.sort_entries {
                entries.sort_by(|a, b| a.name.cmp(&b.name));
            }

            for entry in entries {
                let path = self
                    .platform
                    .join(&folder.local_path, &entry.name)
                    .ok_or_else(|| UploadError::NotSupportedPlatform(self.platform.to_string()))?;

                if entry.is_symlink && !self.config.follow_symlinks {
                    debug!("跳过符号链接: {}", path);
                    continue;
                }

                let kind = self.content_types.classify(self.fs.as_ref(), &path).await;
                let is_folder = kind == PathKind::Folder;

                if self.is_excluded(root_path, &path, is_folder) {
                    debug!("排除: {}", path);
                    continue;
                }

                match kind {
                    PathKind::Folder => {
                        let canonical = self.fs.canonicalize(&path).await?;
                        if !ancestors.insert(canonical.clone()) {
                            warn!("检测到符号链接环，跳过: {} -> {}", path, canonical);
                            continue;
                        }

                        let mut child = FolderNode::new(entry.name, path);
                        self.scan_folder(&mut child, root_path, ancestors).await?;
                        ancestors.remove(&canonical);
                        folder.push(Node::Folder(child));
                    }
                    PathKind::File { content_type } => {
                        let size = self.fs.file_len(&path).await;
                        folder.push(Node::File(FileNode::new(
                            entry.name,
                            path,
                            content_type,
                            size,
                        )));
                    }
                }
            }

            Ok(())
        }
        .boxed()
    }

    /// 检查路径是否命中排除规则
    fn is_excluded(&self, root_path: &str, path: &str, is_folder: bool) -> bool {
        if self.excludes.is_empty() {
            return false;
        }

        let sep = self.platform.separator().unwrap_or('/');
        let relative = path
            .strip_prefix(root_path)
            .unwrap_or(path)
            .trim_start_matches(sep)
            .replace(sep, "/")
            .to_lowercase();
        let name = relative.rsplit('/').next().unwrap_or(&relative).to_string();
        let as_dir = format!("{}/", relative);

        self.excludes.iter().any(|rule| {
            rule.regex.is_match(&relative)
                || (is_folder && rule.regex.is_match(&as_dir))
                || (rule.match_name && rule.regex.is_match(&name))
        })
    }
}

/// 把 glob 规则转换成正则：`**` 跨目录，`*` 和 `?` 不跨目录
fn compile_pattern(pattern: &str) -> Option<ExcludeRule> {
    let pattern = pattern.trim().replace('\\', "/").to_lowercase();
    if pattern.is_empty() {
        return None;
    }

    let mut re = String::from("^");
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                if chars.peek() == Some(&'/') {
                    chars.next();
                    re.push_str("(?:.*/)?");
                } else {
                    re.push_str(".*");
                }
            }
            '*' => re.push_str("[^/]*"),
            '?' => re.push_str("[^/]"),
            c => re.push_str(&regex::escape(c.encode_utf8(&mut [0u8; 4]))),
        }
    }
    re.push('$');

    Regex::new(&re).ok().map(|regex| ExcludeRule {
        regex,
        match_name: !pattern.contains('/'),
    })
}
