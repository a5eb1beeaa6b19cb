use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use crossbeam_channel::{bounded, Receiver, Sender};
use indicatif::ProgressBar;
use thiserror::Error;

use crate::application::cancel::CancelToken;
use crate::application::config::Config;
use crate::domain::content::{ContentReader, FileContent};
use crate::domain::path_matcher::PathMatcher;
use crate::domain::request::{ScanOutcome, ScanRequest, ScanResult, ScanStats};
use crate::domain::script::ScriptDetector;
use crate::domain::tree_walker::{EntryKind, TreeWalker, WalkEvent};
use crate::infrastructure::{ErrorLogger, ErrorType, LoggerTrait};

/// 使整个请求失败的错误，不产生任何结果
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("目录不存在: {}", path.display())]
    RootNotFound { path: PathBuf },

    #[error("路径不是目录: {}", path.display())]
    NotADirectory { path: PathBuf },

    /// 被调用方取消或超时，已收集的部分结果被丢弃
    #[error("扫描已取消")]
    Cancelled,

    #[error("扫描内部错误: {0}")]
    Internal(String),
}

/// 扫描协调器
///
/// 遍历在调用线程上顺序进行，名称匹配在这里直接按发现顺序记录；文件内容检查
/// 通过有界队列分发给固定数量的工作线程。工作线程只返回 `ScanOutcome`，
/// 由唯一的汇总线程写入内容匹配和错误列表。队列满时遍历线程阻塞等待。
pub struct Scanner {
    config: Config,
    logger: Arc<dyn LoggerTrait>,
    error_logger: Arc<ErrorLogger>,
    progress: ProgressBar,
}

impl Scanner {
    pub fn new(config: Config, logger: Arc<dyn LoggerTrait>, error_logger: Arc<ErrorLogger>) -> Self {
        Self {
            config,
            logger,
            error_logger,
            progress: ProgressBar::hidden(),
        }
    }

    /// 使用进度条显示遍历进度
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// 执行扫描，超时时间取自配置
    pub fn scan(&self, request: &ScanRequest) -> Result<ScanResult, ScanError> {
        let cancel = match self.config.timeout() {
            Some(timeout) => CancelToken::new().with_timeout(timeout),
            None => CancelToken::new(),
        };
        self.scan_with_cancel(request, &cancel)
    }

    /// 执行扫描，可由外部取消
    ///
    /// 取消后遍历不再列出新目录，工作线程放弃尚未开始的文件，调用返回
    /// `ScanError::Cancelled`，不会返回不完整的结果。
    pub fn scan_with_cancel(&self, request: &ScanRequest, cancel: &CancelToken) -> Result<ScanResult, ScanError> {
        check_root(request.root_directory())?;
        if cancel.is_cancelled() {
            return Err(ScanError::Cancelled);
        }

        // 根目录解析为绝对路径，输出路径和排除规则都以它为准
        let request = request
            .resolved()
            .map_err(|_| ScanError::RootNotFound {
                path: request.root_directory().to_path_buf(),
            })?
            .with_defaults(
                &self.config.exclude.default_extensions,
                &self.config.exclude.default_dirs,
            );
        let root = request.root_directory();
        let matcher = Arc::new(PathMatcher::from_request(
            &request,
            self.config.exclude.case_insensitive,
        ));

        let start_time = Instant::now();
        self.log_request(&request);

        // 根目录本身被排除时不做任何遍历
        if matcher.is_directory_excluded(root) {
            if self.logger.is_enabled() {
                let _ = self.logger.log_message("根目录命中排除规则，跳过扫描");
            }
            return Ok(ScanResult::default());
        }

        let reader = self.config.content_reader();
        let workers = self.config.worker_count();
        let capacity = self.config.queue_capacity();
        let interrupted = AtomicBool::new(false);

        let (job_tx, job_rx) = bounded::<PathBuf>(capacity);
        let (outcome_tx, outcome_rx) = bounded::<ScanOutcome>(capacity);

        let mut chinese_names = Vec::new();
        let mut stats = ScanStats::default();

        let aggregated = thread::scope(|s| {
            for _ in 0..workers {
                let job_rx = job_rx.clone();
                let outcome_tx = outcome_tx.clone();
                let reader = &reader;
                let interrupted = &interrupted;
                s.spawn(move || {
                    run_worker(reader, job_rx, outcome_tx, self.config.scan.excerpt_window, cancel, interrupted)
                });
            }
            drop(job_rx);

            let aggregator = s.spawn(move || self.aggregate(outcome_rx));

            let mut walk = TreeWalker::new(root, Arc::clone(&matcher)).walk();
            for event in walk.by_ref() {
                if cancel.is_cancelled() {
                    interrupted.store(true, Ordering::Relaxed);
                    break;
                }

                match event {
                    WalkEvent::Error(err) => {
                        let message = format!("遍历错误: {}", err.message);
                        if outcome_tx.send(ScanOutcome::WalkFailed { message }).is_err() {
                            break;
                        }
                    }
                    WalkEvent::Entry(entry) => {
                        stats.entries_visited += 1;
                        self.progress
                            .set_message(format!("已遍历 {} 个条目", stats.entries_visited));
                        self.progress.tick();

                        // 符号链接可能指向目录，命中目录排除规则时连名称也不检查
                        if entry.kind == EntryKind::Symlink && matcher.is_directory_excluded(&entry.path) {
                            continue;
                        }

                        let display = entry.path.to_string_lossy().to_string();
                        if ScriptDetector::contains_chinese_script(&entry.name()) {
                            chinese_names.push(display);
                        }

                        if entry.kind != EntryKind::File || matcher.is_excluded(&entry.path, false) {
                            continue;
                        }

                        if self.logger.is_enabled() {
                            let _ = self.logger.log_file(&entry.path, entry.size.unwrap_or(0), "待检查");
                        }

                        // 队列满时在此阻塞，限制积压的文件数
                        if job_tx.send(entry.path).is_err() {
                            break;
                        }
                    }
                }
            }
            stats.dirs_pruned = walk.pruned_dirs();

            drop(job_tx);
            drop(outcome_tx);

            aggregator
                .join()
                .map_err(|_| ScanError::Internal("结果汇总线程异常退出".to_string()))
        })?;

        self.progress
            .finish_with_message(format!("完成! 已遍历 {} 个条目", stats.entries_visited));

        if interrupted.load(Ordering::Relaxed) {
            if self.logger.is_enabled() {
                let _ = self.logger.log_message("扫描已取消，丢弃部分结果");
            }
            return Err(ScanError::Cancelled);
        }

        let (files_with_chinese, errors, content_stats) = aggregated;
        stats.files_inspected = content_stats.files_inspected;
        stats.binary_skipped = content_stats.binary_skipped;
        stats.files_truncated = content_stats.files_truncated;

        let result = ScanResult {
            chinese_names,
            files_with_chinese,
            errors,
            stats,
        };

        if self.logger.is_enabled() {
            let _ = self.logger.finalize(&result, start_time.elapsed());
        }

        Ok(result)
    }

    /// 汇总工作线程和遍历线程发来的结果，是结果集合唯一的写入点
    fn aggregate(&self, outcomes: Receiver<ScanOutcome>) -> (BTreeMap<String, String>, Vec<String>, ScanStats) {
        let mut files_with_chinese = BTreeMap::new();
        let mut errors = Vec::new();
        let mut stats = ScanStats::default();
        let max_bytes = self.config.scan.max_file_bytes;
        let report_truncation = self.config.scan.report_truncation;

        for outcome in outcomes {
            match outcome {
                ScanOutcome::Matched { path, excerpt, truncated } => {
                    stats.files_inspected += 1;
                    if truncated {
                        stats.files_truncated += 1;
                        if report_truncation {
                            errors.push(self.record_truncation(&path, max_bytes));
                        }
                    }
                    if self.logger.is_enabled() {
                        let _ = self.logger.log_message(&format!("内容匹配: {} -> {}", path, excerpt));
                    }
                    files_with_chinese.insert(path, excerpt);
                }
                ScanOutcome::NoMatch { path, truncated } => {
                    stats.files_inspected += 1;
                    if truncated {
                        stats.files_truncated += 1;
                        if report_truncation {
                            errors.push(self.record_truncation(&path, max_bytes));
                        }
                    }
                }
                ScanOutcome::Binary { path } => {
                    stats.files_inspected += 1;
                    stats.binary_skipped += 1;
                    if self.logger.is_enabled() {
                        let _ = self.logger.log_message(&format!("跳过二进制文件: {}", path));
                    }
                }
                ScanOutcome::Failed { path, message, decode } => {
                    stats.files_inspected += 1;
                    let error_type = if decode { ErrorType::Decode } else { ErrorType::FileRead };
                    let _ = self.error_logger.log_error(error_type, Some(&path), &message);
                    errors.push(message);
                }
                ScanOutcome::WalkFailed { message } => {
                    let _ = self.error_logger.log_error(ErrorType::DirectoryRead, None, &message);
                    errors.push(message);
                }
            }
        }

        (files_with_chinese, errors, stats)
    }

    fn record_truncation(&self, path: &str, max_bytes: u64) -> String {
        let message = format!("文件超过 {} 字节，仅检查了开头部分: {}", max_bytes, path);
        let _ = self.error_logger.log_error(ErrorType::Truncated, Some(path), &message);
        message
    }

    fn log_request(&self, request: &ScanRequest) {
        if !self.logger.is_enabled() {
            return;
        }
        let join = |set: &BTreeSet<String>| {
            set.iter().cloned().collect::<Vec<_>>().join(", ")
        };
        let _ = self.logger.log_message(&format!(
            "开始扫描目录: {}",
            request.root_directory().display()
        ));
        let _ = self
            .logger
            .log_message(&format!("排除扩展名: {}", join(request.exclude_extensions())));
        let _ = self
            .logger
            .log_message(&format!("排除目录: {}", join(request.exclude_directories())));
        let _ = self.logger.log_message(&format!(
            "检查线程数: {}, 单文件字节上限: {}",
            self.config.worker_count(),
            self.config.scan.max_file_bytes
        ));
    }
}

/// 根目录必须存在且是目录
fn check_root(root: &Path) -> Result<(), ScanError> {
    match fs::metadata(root) {
        Ok(metadata) if metadata.is_dir() => Ok(()),
        Ok(_) => Err(ScanError::NotADirectory {
            path: root.to_path_buf(),
        }),
        Err(_) => Err(ScanError::RootNotFound {
            path: root.to_path_buf(),
        }),
    }
}

/// 工作线程：逐个读取文件并检查内容，结果发给汇总线程
fn run_worker(
    reader: &ContentReader,
    jobs: Receiver<PathBuf>,
    outcomes: Sender<ScanOutcome>,
    window: usize,
    cancel: &CancelToken,
    interrupted: &AtomicBool,
) {
    for path in jobs {
        // 已取消时继续取出队列中的任务但不再读取，使遍历线程不会阻塞
        if cancel.is_cancelled() {
            interrupted.store(true, Ordering::Relaxed);
            continue;
        }

        let outcome = inspect_file(reader, &path, window);
        if outcomes.send(outcome).is_err() {
            break;
        }
    }
}

/// 检查单个文件的内容
pub fn inspect_file(reader: &ContentReader, path: &Path, window: usize) -> ScanOutcome {
    let display = path.to_string_lossy().to_string();

    match reader.read_for_scan(path) {
        Ok(FileContent::Binary) => ScanOutcome::Binary { path: display },
        Ok(FileContent::Text { text, truncated }) => {
            match ScriptDetector::first_match_excerpt(&text, window) {
                Some(excerpt) => ScanOutcome::Matched {
                    path: display,
                    excerpt,
                    truncated,
                },
                None => ScanOutcome::NoMatch {
                    path: display,
                    truncated,
                },
            }
        }
        Err(err) => ScanOutcome::Failed {
            path: display,
            message: err.to_string(),
            decode: err.is_decode(),
        },
    }
}
