//! 镜像树节点

use serde::Serialize;

/// 树中的一个条目：目录或文件
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Node {
    Folder(FolderNode),
    File(FileNode),
}

impl Node {
    pub fn name(&self) -> &str {
        match self {
            Node::Folder(f) => &f.name,
            Node::File(f) => &f.name,
        }
    }

    pub fn local_path(&self) -> &str {
        match self {
            Node::Folder(f) => &f.local_path,
            Node::File(f) => &f.local_path,
        }
    }

    /// 远程标识，创建成功前为空
    pub fn remote_id(&self) -> &str {
        match self {
            Node::Folder(f) => &f.remote_id,
            Node::File(f) => &f.remote_id,
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(self, Node::Folder(_))
    }
}

/// 目录节点
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderNode {
    pub name: String,
    pub local_path: String,
    /// 子节点，保持构建时的顺序
    pub children: Vec<Node>,
    pub is_root: bool,
    pub remote_id: String,
}

impl FolderNode {
    pub fn new(name: impl Into<String>, local_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            local_path: local_path.into(),
            children: Vec::new(),
            is_root: false,
            remote_id: String::new(),
        }
    }

    /// 树的根节点，每棵树有且只有一个
    pub fn root(name: impl Into<String>, local_path: impl Into<String>) -> Self {
        Self {
            is_root: true,
            ..Self::new(name, local_path)
        }
    }

    pub fn push(&mut self, node: Node) {
        self.children.push(node);
    }

    /// 统计整棵子树（包含自身）
    pub fn stats(&self) -> TreeStats {
        let mut stats = TreeStats {
            folders: 1,
            ..TreeStats::default()
        };
        for child in &self.children {
            match child {
                Node::Folder(sub) => stats.add(&sub.stats()),
                Node::File(file) => {
                    stats.files += 1;
                    stats.bytes += file.size;
                }
            }
        }
        stats
    }

    /// 子树中 is_root 为 true 的节点数
    pub fn root_count(&self) -> usize {
        let own = usize::from(self.is_root);
        own + self
            .children
            .iter()
            .map(|c| match c {
                Node::Folder(sub) => sub.root_count(),
                Node::File(_) => 0,
            })
            .sum::<usize>()
    }

    /// 按路径（子节点名序列）查找节点
    pub fn find(&self, names: &[&str]) -> Option<&Node> {
        let (first, rest) = names.split_first()?;
        let child = self.children.iter().find(|c| c.name() == *first)?;
        if rest.is_empty() {
            return Some(child);
        }
        match child {
            Node::Folder(sub) => sub.find(rest),
            Node::File(_) => None,
        }
    }
}

/// 文件节点
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileNode {
    pub name: String,
    pub local_path: String,
    /// 构建时确定，之后不再变化
    pub content_type: String,
    pub size: u64,
    pub remote_id: String,
}

impl FileNode {
    pub fn new(
        name: impl Into<String>,
        local_path: impl Into<String>,
        content_type: impl Into<String>,
        size: u64,
    ) -> Self {
        Self {
            name: name.into(),
            local_path: local_path.into(),
            content_type: content_type.into(),
            size,
            remote_id: String::new(),
        }
    }
}

/// 树统计信息
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TreeStats {
    pub folders: u32,
    pub files: u32,
    pub bytes: u64,
}

impl TreeStats {
    fn add(&mut self, other: &TreeStats) {
        self.folders += other.folders;
        self.files += other.files;
        self.bytes += other.bytes;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FolderNode {
        let mut pics = FolderNode::new("pics", "/r/pics");
        pics.push(Node::File(FileNode::new("a.png", "/r/pics/a.png", "image/png", 10)));

        let mut root = FolderNode::root("ROOT", "/r");
        root.push(Node::File(FileNode::new("n.txt", "/r/n.txt", "text/plain", 5)));
        root.push(Node::Folder(pics));
        root
    }

    #[test]
    fn test_stats() {
        let stats = sample().stats();
        assert_eq!(
            stats,
            TreeStats {
                folders: 2,
                files: 2,
                bytes: 15
            }
        );
    }

    #[test]
    fn test_single_root() {
        let root = sample();
        assert_eq!(root.root_count(), 1);
        assert!(root.is_root);
    }

    #[test]
    fn test_find_and_accessors() {
        let root = sample();
        let node = root.find(&["pics", "a.png"]).unwrap();
        assert_eq!(node.name(), "a.png");
        assert_eq!(node.local_path(), "/r/pics/a.png");
        assert_eq!(node.remote_id(), "");
        assert!(!node.is_container());
        assert!(root.find(&["pics"]).unwrap().is_container());
        assert!(root.find(&["n.txt", "x"]).is_none());
    }
}
