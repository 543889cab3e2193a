//! 日志模块 - 文件日志（按大小轮转）加控制台输出

use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

pub const LOG_FILE_NAME: &str = "drivemirror.log";

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogConfig {
    /// 是否写日志文件
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// 日志文件上限（MB）
    #[serde(default = "default_max_size_mb")]
    pub max_size_mb: u32,
    /// "error", "warn", "info", "debug", "trace"
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_enabled() -> bool {
    true
}

fn default_max_size_mb() -> u32 {
    5
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            max_size_mb: default_max_size_mb(),
            level: default_level(),
        }
    }
}

impl LogConfig {
    pub fn tracing_level(&self) -> tracing::Level {
        match self.level.to_lowercase().as_str() {
            "error" => tracing::Level::ERROR,
            "warn" => tracing::Level::WARN,
            "debug" => tracing::Level::DEBUG,
            "trace" => tracing::Level::TRACE,
            _ => tracing::Level::INFO,
        }
    }
}

/// 写入器共享的状态
struct RotatingFile {
    file_path: PathBuf,
    max_size: u64,
    writer: Mutex<Option<BufWriter<File>>>,
}

impl RotatingFile {
    fn lock(&self) -> MutexGuard<'_, Option<BufWriter<File>>> {
        self.writer.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn open(&self) -> io::Result<BufWriter<File>> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file_path)?;
        Ok(BufWriter::new(file))
    }

    fn over_limit(&self) -> bool {
        fs::metadata(&self.file_path)
            .map(|m| m.len() > self.max_size)
            .unwrap_or(false)
    }

    /// 超过上限时把当前日志改名为 .log.old 并重新打开
    fn rotate_if_needed(&self, slot: &mut Option<BufWriter<File>>) -> io::Result<()> {
        if !self.over_limit() {
            return Ok(());
        }

        if let Some(mut w) = slot.take() {
            let _ = w.flush();
        }

        let backup_path = self.file_path.with_extension("log.old");
        if backup_path.exists() {
            fs::remove_file(&backup_path)?;
        }
        fs::rename(&self.file_path, &backup_path)?;

        *slot = Some(self.open()?);
        Ok(())
    }
}

/// 带大小限制的日志写入器
#[derive(Clone)]
pub struct SizeRotatingWriter {
    inner: Arc<RotatingFile>,
}

impl SizeRotatingWriter {
    pub fn new(log_dir: &Path, max_size_mb: u32) -> io::Result<Self> {
        fs::create_dir_all(log_dir)?;

        let inner = Arc::new(RotatingFile {
            file_path: log_dir.join(LOG_FILE_NAME),
            max_size: u64::from(max_size_mb) * 1024 * 1024,
            writer: Mutex::new(None),
        });

        {
            let mut slot = inner.lock();
            inner.rotate_if_needed(&mut slot)?;
            if slot.is_none() {
                *slot = Some(inner.open()?);
            }
        }

        Ok(Self { inner })
    }

    #[cfg(test)]
    fn with_max_bytes(log_dir: &Path, max_size: u64) -> io::Result<Self> {
        let writer = Self::new(log_dir, 1)?;
        let inner = Arc::new(RotatingFile {
            file_path: writer.inner.file_path.clone(),
            max_size,
            writer: Mutex::new(writer.inner.lock().take()),
        });
        Ok(Self { inner })
    }

    pub fn file_path(&self) -> &Path {
        &self.inner.file_path
    }
}

/// 单次写入使用的句柄
pub struct LogWriter {
    inner: Arc<RotatingFile>,
}

impl Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut slot = self.inner.lock();
        let writer = slot
            .as_mut()
            .ok_or_else(|| io::Error::other("log writer not available"))?;

        let written = writer.write(buf)?;
        writer.flush()?;

        // 轮转失败不影响本次写入
        let _ = self.inner.rotate_if_needed(&mut slot);
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.inner.lock().as_mut() {
            Some(writer) => writer.flush(),
            None => Ok(()),
        }
    }
}

impl<'a> MakeWriter<'a> for SizeRotatingWriter {
    type Writer = LogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogWriter {
            inner: self.inner.clone(),
        }
    }
}

/// 构建订阅器：EnvFilter 加可选的文件层和 stderr 层
///
/// 同时返回文件日志的路径，未启用或创建失败时为 None。
fn build_subscriber(
    data_dir: &Path,
    config: &LogConfig,
    verbose: bool,
) -> (impl tracing::Subscriber + Send + Sync + 'static, Option<PathBuf>) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        config.tracing_level()
    };

    let mut env_filter = EnvFilter::from_default_env().add_directive(level.into());
    // 降低依赖库的日志噪音
    for directive in ["hyper=warn", "reqwest=warn", "opendal=warn"] {
        if let Ok(d) = directive.parse() {
            env_filter = env_filter.add_directive(d);
        }
    }

    let file_writer = if config.enabled {
        match SizeRotatingWriter::new(&data_dir.join("logs"), config.max_size_mb) {
            Ok(writer) => Some(writer),
            Err(e) => {
                eprintln!("无法创建日志文件: {}", e);
                None
            }
        }
    } else {
        None
    };
    let log_path = file_writer.as_ref().map(|w| w.file_path().to_path_buf());

    let file_layer = file_writer.map(|writer| {
        tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false)
    });

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_target(false);

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer);

    (subscriber, log_path)
}

/// 初始化日志系统：文件日志写到 `<data_dir>/logs`，同时输出到 stderr
pub fn init_logging(data_dir: &Path, config: &LogConfig, verbose: bool) -> Option<PathBuf> {
    let (subscriber, log_path) = build_subscriber(data_dir, config, verbose);
    let _ = tracing::subscriber::set_global_default(subscriber);
    log_path
}
