use clap::Parser;
use drivemirror_lib::config::CONFIG_FILE;
use drivemirror_lib::logging::init_logging;
use drivemirror_lib::{
    create_gateway, dirs, AppConfig, ErrorKind, LocalFileSystem, UploadOutcome, Uploader,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::mpsc;

/// 把本地目录树原样镜像到远程存储
#[derive(Parser, Debug)]
#[command(name = "drivemirror", version, about)]
struct Cli {
    /// 要上传的本地目录
    path: String,

    /// 配置目录（默认使用系统配置目录下的 drivemirror）
    #[arg(long)]
    config_dir: Option<PathBuf>,

    /// 远程根目录名，缺省时按时间生成
    #[arg(long)]
    root_name: Option<String>,

    /// 保持目录列举的原始顺序
    #[arg(long)]
    no_sort: bool,

    /// 输出调试日志
    #[arg(short, long)]
    verbose: bool,

    /// 以 JSON 输出结果（包含带远程标识的完整目录树）
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config_dir = cli.config_dir.clone().unwrap_or_else(dirs::data_dir);
    let mut config = AppConfig::load(&config_dir);
    init_logging(&config_dir, &config.log, cli.verbose);

    if let Some(name) = cli.root_name {
        config.upload.root_name = Some(name);
    }
    if cli.no_sort {
        config.scan.sort_entries = false;
    }

    let Some(gateway_config) = config.gateway.as_ref() else {
        let config_file = config_dir.join(CONFIG_FILE);
        // 首次运行时写出一份默认配置，方便用户补上 gateway 节
        if !config_file.exists() {
            if let Err(e) = AppConfig::default().save(&config_dir) {
                tracing::warn!("无法写入默认配置 {:?}: {}", config_file, e);
            }
        }
        eprintln!("未配置远程网关，请在 {:?} 中设置 gateway 节", config_file);
        return ExitCode::from(ErrorKind::UnknownError.code());
    };

    let gateway = match create_gateway(gateway_config) {
        Ok(gateway) => gateway,
        Err(e) => {
            eprintln!("网关初始化失败: {:#}", e);
            return ExitCode::from(ErrorKind::UnknownError.code());
        }
    };
    tracing::info!("上传 {} -> {}", cli.path, gateway.name());

    let (tx, mut rx) = mpsc::channel(64);
    let uploader = Uploader::new(gateway, Arc::new(LocalFileSystem::new()))
        .with_scan_config(config.scan.clone())
        .with_upload_config(config.upload.clone())
        .with_progress(tx);

    let printer = tokio::spawn(async move {
        while let Some(progress) = rx.recv().await {
            if !progress.done {
                tracing::debug!(
                    "[{}/{} 目录, {}/{} 文件] {}",
                    progress.folders_created,
                    progress.total_folders,
                    progress.files_created,
                    progress.total_files,
                    progress.current_path
                );
            }
        }
    });

    let result = uploader.upload(&cli.path).await;
    drop(uploader);
    let _ = printer.await;

    let kind = ErrorKind::of(&result);
    if let Err(e) = &result {
        tracing::error!("上传失败: {}", e);
    }

    if cli.json {
        match serde_json::to_string_pretty(&UploadOutcome::from_result(&result)) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("无法序列化结果: {}", e),
        }
        return ExitCode::from(kind.code());
    }

    match &result {
        Ok(report) => {
            println!(
                "{}: {} ({} 个目录, {} 个文件, {} 字节, {} ms)",
                kind.message(),
                report.root_name,
                report.folders_created,
                report.files_created,
                report.bytes_uploaded,
                report.duration_ms
            );
        }
        Err(e) => {
            eprintln!("{} [{}]: {}", kind.message(), kind, e);
        }
    }

    ExitCode::from(kind.code())
}
