//! 错误类型 - 上传流程对外只暴露一组扁平的错误种类

use crate::fs::FsError;
use crate::gateway::GatewayError;
use serde::Serialize;
use thiserror::Error;

/// 上传结果的错误种类（`None` 表示成功）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    None,
    NotSupportedPlatform,
    HttpError,
    FileNotFound,
    NotPermission,
    NotDirectory,
    UnknownError,
}

impl ErrorKind {
    /// 稳定的数字编码，同时用作命令行退出码
    pub fn code(self) -> u8 {
        match self {
            ErrorKind::None => 0,
            ErrorKind::NotSupportedPlatform => 1,
            ErrorKind::HttpError => 3,
            ErrorKind::FileNotFound => 4,
            ErrorKind::NotPermission => 5,
            ErrorKind::NotDirectory => 6,
            ErrorKind::UnknownError => 7,
        }
    }

    /// 面向用户的提示信息
    pub fn message(self) -> &'static str {
        match self {
            ErrorKind::None => "上传完成",
            ErrorKind::NotSupportedPlatform => "不支持的平台",
            ErrorKind::HttpError => "远程请求失败",
            ErrorKind::FileNotFound => "找不到文件或目录",
            ErrorKind::NotPermission => "没有访问权限",
            ErrorKind::NotDirectory => "请求的路径不是目录",
            ErrorKind::UnknownError => "未知错误",
        }
    }

    /// 把一次上传的结果归为单一错误种类
    pub fn of<T>(result: &Result<T>) -> Self {
        match result {
            Ok(_) => ErrorKind::None,
            Err(e) => e.kind(),
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::None => "NONE",
            ErrorKind::NotSupportedPlatform => "NOT_SUPPORTED_PLATFORM",
            ErrorKind::HttpError => "HTTP_ERROR",
            ErrorKind::FileNotFound => "FILE_NOT_FOUND",
            ErrorKind::NotPermission => "NOT_PERMISSION",
            ErrorKind::NotDirectory => "NOT_DIRECTORY",
            ErrorKind::UnknownError => "UNKNOWN_ERROR",
        };
        write!(f, "{}", name)
    }
}

/// 上传流程中的错误，携带用于日志的上下文
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("不支持的平台: {0}")]
    NotSupportedPlatform(String),

    #[error("找不到文件或目录: {path}")]
    FileNotFound { path: String },

    #[error("没有访问权限: {path}")]
    NotPermission { path: String },

    #[error("请求的路径不是目录: {path}")]
    NotDirectory { path: String },

    #[error("远程请求失败: {0}")]
    Http(#[from] GatewayError),

    #[error("未知错误: {path}: {message}")]
    Unknown { path: String, message: String },
}

impl UploadError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            UploadError::NotSupportedPlatform(_) => ErrorKind::NotSupportedPlatform,
            UploadError::FileNotFound { .. } => ErrorKind::FileNotFound,
            UploadError::NotPermission { .. } => ErrorKind::NotPermission,
            UploadError::NotDirectory { .. } => ErrorKind::NotDirectory,
            UploadError::Http(_) => ErrorKind::HttpError,
            UploadError::Unknown { .. } => ErrorKind::UnknownError,
        }
    }
}

impl From<FsError> for UploadError {
    fn from(err: FsError) -> Self {
        match err {
            FsError::NotFound(path) => UploadError::FileNotFound { path },
            FsError::PermissionDenied(path) => UploadError::NotPermission { path },
            FsError::NotADirectory(path) => UploadError::NotDirectory { path },
            FsError::Other { path, source } => UploadError::Unknown {
                path,
                message: source.to_string(),
            },
        }
    }
}

/// 上传流程的 Result 别名
pub type Result<T> = std::result::Result<T, UploadError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_fs_errors_map_to_distinct_kinds() {
        let cases = vec![
            (FsError::NotFound("/a".into()), ErrorKind::FileNotFound),
            (FsError::PermissionDenied("/a".into()), ErrorKind::NotPermission),
            (FsError::NotADirectory("/a".into()), ErrorKind::NotDirectory),
            (
                FsError::Other {
                    path: "/a".into(),
                    source: io::Error::new(io::ErrorKind::Other, "disk on fire"),
                },
                ErrorKind::UnknownError,
            ),
        ];

        for (fs_err, expected) in cases {
            assert_eq!(UploadError::from(fs_err).kind(), expected);
        }
    }

    #[test]
    fn test_gateway_error_is_http_error() {
        let err: UploadError = GatewayError::Status {
            status: 503,
            body: String::new(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::HttpError);
    }

    #[test]
    fn test_kind_of_result() {
        let ok: Result<()> = Ok(());
        assert_eq!(ErrorKind::of(&ok), ErrorKind::None);

        let err: Result<()> = Err(UploadError::NotSupportedPlatform("plan9".into()));
        assert_eq!(ErrorKind::of(&err), ErrorKind::NotSupportedPlatform);
    }

    #[test]
    fn test_codes_and_names() {
        assert_eq!(ErrorKind::None.code(), 0);
        assert_eq!(ErrorKind::HttpError.code(), 3);
        assert_eq!(ErrorKind::UnknownError.code(), 7);
        assert_eq!(ErrorKind::NotPermission.to_string(), "NOT_PERMISSION");
        assert!(!ErrorKind::NotDirectory.message().is_empty());
    }
}
