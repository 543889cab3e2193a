pub mod config;
pub mod core;
pub mod error;
pub mod fs;
pub mod gateway;
pub mod logging;
pub mod platform;

#[cfg(test)]
mod testing;

pub use config::AppConfig;
pub use crate::core::{
    FileNode, FolderNode, Node, ScanConfig, TreeBuilder, UploadConfig, UploadOutcome,
    UploadProgress, UploadReport, Uploader,
};
pub use error::{ErrorKind, Result, UploadError};
pub use fs::{FileSystem, LocalFileSystem};
pub use gateway::{create_gateway, GatewayConfig, GatewayType, RemoteGateway};
pub use platform::Platform;

/// 按系统约定定位配置目录
pub mod dirs {
    use std::path::PathBuf;

    pub fn config_dir() -> Option<PathBuf> {
        if cfg!(target_os = "windows") {
            std::env::var("APPDATA").ok().map(PathBuf::from)
        } else if cfg!(target_os = "macos") {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join("Library").join("Application Support"))
        } else {
            std::env::var("XDG_CONFIG_HOME")
                .ok()
                .map(PathBuf::from)
                .or_else(|| {
                    std::env::var("HOME")
                        .ok()
                        .map(|h| PathBuf::from(h).join(".config"))
                })
        }
    }

    /// 应用数据目录，config.json 和 logs/ 都放在这里
    pub fn data_dir() -> PathBuf {
        config_dir()
            .map(|p| p.join("drivemirror"))
            .unwrap_or_else(|| PathBuf::from(".drivemirror"))
    }
}
