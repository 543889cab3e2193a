//! 平台检测

/// 运行平台
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    Linux,
    MacOs,
    Unsupported(&'static str),
}

impl Platform {
    /// 当前进程所在的平台
    pub fn current() -> Self {
        Self::from_os_name(std::env::consts::OS)
    }

    pub fn from_os_name(os: &'static str) -> Self {
        match os {
            "windows" => Platform::Windows,
            "linux" => Platform::Linux,
            "macos" => Platform::MacOs,
            other => Platform::Unsupported(other),
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, Platform::Unsupported(_))
    }

    /// 路径分隔符，不支持的平台返回 None
    pub fn separator(&self) -> Option<char> {
        match self {
            Platform::Windows => Some('\\'),
            Platform::Linux | Platform::MacOs => Some('/'),
            Platform::Unsupported(_) => None,
        }
    }

    /// 拼接父路径和条目名
    pub fn join(&self, parent: &str, name: &str) -> Option<String> {
        let sep = self.separator()?;
        if parent.ends_with(sep) {
            Some(format!("{}{}", parent, name))
        } else {
            Some(format!("{}{}{}", parent, sep, name))
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Platform::Windows => write!(f, "Windows"),
            Platform::Linux => write!(f, "Linux"),
            Platform::MacOs => write!(f, "macOS"),
            Platform::Unsupported(name) => write!(f, "{}", name),
        }
    }
}
