pub mod builder;
pub mod classifier;
pub mod node;
pub mod uploader;

pub use builder::{ScanConfig, TreeBuilder};
pub use classifier::{classify, ContentTypes, PathKind, DEFAULT_CONTENT_TYPE};
pub use node::{FileNode, FolderNode, Node, TreeStats};
pub use uploader::{
    generate_root_name, UploadConfig, UploadOutcome, UploadProgress, UploadReport, Uploader,
};
