use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

use find_chinese::presentation::format_file_size;
use find_chinese::{
    print_scan_result, render_json, Config, ErrorLogger, Logger, LoggerTrait,
    ScanRequest, ScanSummary, Scanner,
};

/// 查找名称或内容包含中文的文件
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// 要扫描的目录路径
    #[clap(required = true)]
    directory: String,

    /// 排除的扩展名，以逗号分隔 (例如 "txt,jpg,png")
    #[clap(short = 'e', long, default_value = "")]
    exclude_extensions: String,

    /// 排除的目录名或路径，以逗号分隔
    #[clap(short = 'd', long, default_value = "")]
    exclude_directories: String,

    /// 配置文件路径，默认使用程序同级目录下的 config.toml
    #[clap(long)]
    config: Option<PathBuf>,

    /// 以 JSON 格式输出结果
    #[clap(long)]
    json: bool,

    /// 启用详细日志记录，日志文件将保存到当前目录下
    #[clap(long)]
    log: bool,

    /// 超时秒数，超时后扫描被取消
    #[clap(long)]
    timeout: Option<u64>,

    /// 内容检查线程数 (默认使用所有可用CPU)
    #[clap(long)]
    workers: Option<usize>,
}

/// 加载配置：显式指定的文件必须存在；默认位置不可写时退回默认配置
fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load_from_file(path)?,
        None => match Config::default_config_path().and_then(|path| Config::load_or_create(&path)) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("无法加载默认配置，使用内置默认值: {:#}", err);
                Config::default()
            }
        },
    };

    if let Some(workers) = args.workers {
        config.performance.workers = workers;
    }
    if let Some(timeout) = args.timeout {
        config.performance.timeout_secs = timeout;
    }

    config.validate().context("配置无效")?;
    Ok(config)
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;

    // 初始化日志记录器
    let logger = Arc::new(Logger::new(args.log)?);
    let error_logger = Arc::new(ErrorLogger::new(args.log)?);

    let request = ScanRequest::from_query(
        &args.directory,
        &args.exclude_extensions,
        &args.exclude_directories,
    );

    if !args.json {
        println!("扫描目录: {}", request.root_directory().display());
        println!("排除扩展名: {}", args.exclude_extensions);
        println!("排除目录: {}", args.exclude_directories);
        println!("单文件上限: {}", format_file_size(config.scan.max_file_bytes));
        println!("检查线程: {}", config.worker_count());
        println!("启用日志记录: {}", args.log);
        println!();
    }

    if logger.is_enabled() {
        logger.log_message(&format!("配置: {:?}", config))?;
    }

    let mut scanner = Scanner::new(
        config.clone(),
        Arc::clone(&logger) as Arc<dyn LoggerTrait>,
        Arc::clone(&error_logger),
    );
    if !args.json {
        let progress = ProgressBar::new_spinner();
        progress.set_style(
            ProgressStyle::default_spinner()
                .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .context("无效的进度条模板")?,
        );
        progress.enable_steady_tick(Duration::from_millis(100));
        scanner = scanner.with_progress(progress);
    }

    let start_time = Instant::now();
    let result = scanner
        .scan(&request)
        .with_context(|| format!("扫描失败: {}", request.root_directory().display()))?;
    let duration = start_time.elapsed();

    if args.json {
        println!("{}", render_json(&result)?);
    } else {
        print_scan_result(&result, &config.display)?;

        let summary = ScanSummary {
            duration,
            max_file_bytes: config.scan.max_file_bytes,
            workers: config.worker_count(),
        };
        summary.print(&result)?;
        error_logger.print_error_summary();
    }

    error_logger.finalize()?;

    if logger.is_enabled() {
        eprintln!("完整日志已保存到: {}", logger.log_path().display());
    }

    Ok(())
}
