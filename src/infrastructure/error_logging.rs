use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Result;
use chrono::Local;

const CATEGORIES: usize = 4;

/// 扫描中遇到的非致命问题类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorType {
    /// 目录无法列出，整棵子树未被检查
    DirectoryRead,
    /// 文件无法打开或读取
    FileRead,
    /// 文件内容不是合法的 UTF-8
    Decode,
    /// 文件超出字节预算，只检查了开头
    Truncated,
}

impl ErrorType {
    /// 固定的输出顺序
    pub const ALL: [ErrorType; CATEGORIES] = [
        ErrorType::DirectoryRead,
        ErrorType::FileRead,
        ErrorType::Decode,
        ErrorType::Truncated,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::DirectoryRead => "目录读取",
            ErrorType::FileRead => "文件读取",
            ErrorType::Decode => "文件解码",
            ErrorType::Truncated => "内容截断",
        }
    }

    /// 该类问题对扫描覆盖范围的影响
    pub fn consequence(&self) -> &'static str {
        match self {
            ErrorType::DirectoryRead => "子树未检查",
            ErrorType::FileRead => "名称已检查，内容未检查",
            ErrorType::Decode => "内容无法按 UTF-8 解析",
            ErrorType::Truncated => "仅检查了开头部分",
        }
    }

    /// 截断只是提示，文件仍可能被判定为包含中文
    pub fn is_notice(&self) -> bool {
        matches!(self, ErrorType::Truncated)
    }

    fn index(&self) -> usize {
        match self {
            ErrorType::DirectoryRead => 0,
            ErrorType::FileRead => 1,
            ErrorType::Decode => 2,
            ErrorType::Truncated => 3,
        }
    }
}

/// 扫描问题记录器
///
/// 按类别计数始终生效；启用时每条问题另写一行到 `scan_errors_<时间>.log`。
pub struct ErrorLogger {
    error_file: Mutex<Option<File>>,
    error_path: PathBuf,
    counts: Mutex<[usize; CATEGORIES]>,
}

impl ErrorLogger {
    /// 日志文件写在当前目录
    pub fn new(enabled: bool) -> Result<Self> {
        Self::new_in(Path::new("."), enabled)
    }

    pub fn new_in(dir: &Path, enabled: bool) -> Result<Self> {
        let counts = Mutex::new([0; CATEGORIES]);
        if !enabled {
            return Ok(Self {
                error_file: Mutex::new(None),
                error_path: PathBuf::new(),
                counts,
            });
        }

        let now = Local::now();
        let error_path = dir.join(format!("scan_errors_{}.log", now.format("%Y%m%d_%H%M%S")));

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&error_path)?;

        // UTF-8 BOM，便于记事本等工具识别中文
        file.write_all(&[0xEF, 0xBB, 0xBF])?;
        writeln!(file, "# FindChinese 扫描问题记录 ({})", now.format("%Y-%m-%d %H:%M:%S"))?;
        writeln!(file, "# 格式: 时间 [类别] 路径 :: 说明")?;

        Ok(Self {
            error_file: Mutex::new(Some(file)),
            error_path,
            counts,
        })
    }

    pub fn is_enabled(&self) -> bool {
        !self.error_path.as_os_str().is_empty()
    }

    pub fn error_path(&self) -> &Path {
        &self.error_path
    }

    /// 记录一条问题
    pub fn log_error(&self, error_type: ErrorType, file_path: Option<&str>, message: &str) -> Result<()> {
        if let Ok(mut counts) = self.counts.lock() {
            counts[error_type.index()] += 1;
        }

        let Ok(mut guard) = self.error_file.lock() else {
            return Ok(());
        };
        if let Some(file) = guard.as_mut() {
            writeln!(
                file,
                "{} [{}] {} :: {}",
                Local::now().format("%H:%M:%S%.3f"),
                error_type.as_str(),
                file_path.unwrap_or("-"),
                message
            )?;
            file.flush()?;
        }

        Ok(())
    }

    /// 各类别的计数，按固定顺序，省略为零的类别
    pub fn summary(&self) -> Vec<(ErrorType, usize)> {
        let counts = match self.counts.lock() {
            Ok(counts) => *counts,
            Err(_) => return Vec::new(),
        };
        ErrorType::ALL
            .iter()
            .map(|error_type| (*error_type, counts[error_type.index()]))
            .filter(|(_, count)| *count > 0)
            .collect()
    }

    /// 导致条目未被完整检查的问题数（不含截断提示）
    pub fn failures(&self) -> usize {
        self.summary()
            .iter()
            .filter(|(error_type, _)| !error_type.is_notice())
            .map(|(_, count)| count)
            .sum()
    }

    pub fn total(&self) -> usize {
        self.summary().iter().map(|(_, count)| count).sum()
    }

    pub fn has_errors(&self) -> bool {
        self.total() > 0
    }

    /// 在日志文件末尾写入分类统计
    pub fn finalize(&self) -> Result<()> {
        let summary = self.summary();
        let Ok(mut guard) = self.error_file.lock() else {
            return Ok(());
        };
        if let Some(file) = guard.as_mut() {
            writeln!(file, "# 结束于 {}", Local::now().format("%Y-%m-%d %H:%M:%S"))?;
            for (error_type, count) in &summary {
                writeln!(file, "# {} × {} ({})", error_type.as_str(), count, error_type.consequence())?;
            }
            writeln!(file, "# 未完整检查的条目: {}", self.failures())?;
            file.flush()?;
        }
        Ok(())
    }

    /// 在控制台输出扫描覆盖范围的缺口
    pub fn print_error_summary(&self) {
        let summary = self.summary();
        if summary.is_empty() {
            return;
        }

        println!("\n扫描覆盖情况:");
        for (error_type, count) in &summary {
            println!("  {:<6} {:>6}  {}", error_type.as_str(), count, error_type.consequence());
        }
        println!("  未完整检查的条目: {}", self.failures());
        if self.is_enabled() {
            println!("  明细: {}", self.error_path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_disabled_logger_still_counts() {
        let logger = ErrorLogger::new(false).unwrap();
        assert!(!logger.has_errors());
        assert!(!logger.is_enabled());

        logger.log_error(ErrorType::Decode, Some("a.txt"), "非法 UTF-8").unwrap();
        logger.log_error(ErrorType::Decode, Some("b.txt"), "非法 UTF-8").unwrap();
        logger.log_error(ErrorType::DirectoryRead, None, "权限不足").unwrap();

        assert_eq!(
            logger.summary(),
            vec![(ErrorType::DirectoryRead, 1), (ErrorType::Decode, 2)]
        );
        assert_eq!(logger.total(), 3);
    }

    #[test]
    fn test_truncation_is_not_a_failure() {
        let logger = ErrorLogger::new(false).unwrap();
        logger.log_error(ErrorType::Truncated, Some("big.txt"), "超过上限").unwrap();
        logger.log_error(ErrorType::FileRead, Some("gone.txt"), "文件已消失").unwrap();

        assert_eq!(logger.total(), 2);
        assert_eq!(logger.failures(), 1);
    }

    #[test]
    fn test_entries_written_one_per_line() {
        let dir = tempdir().unwrap();
        let logger = ErrorLogger::new_in(dir.path(), true).unwrap();
        assert!(logger.is_enabled());

        logger
            .log_error(ErrorType::FileRead, Some("/scan/root/a.txt"), "权限不足")
            .unwrap();
        logger.log_error(ErrorType::DirectoryRead, None, "无法列出").unwrap();
        logger.finalize().unwrap();

        let content = fs::read_to_string(logger.error_path()).unwrap();
        assert!(content.contains("[文件读取] /scan/root/a.txt :: 权限不足"));
        assert!(content.contains("[目录读取] - :: 无法列出"));
        assert!(content.contains("# 文件读取 × 1 (名称已检查，内容未检查)"));
        assert!(content.contains("# 未完整检查的条目: 2"));
    }

    #[test]
    fn test_category_order_is_fixed() {
        let order: Vec<_> = ErrorType::ALL.iter().map(ErrorType::as_str).collect();
        assert_eq!(order, vec!["目录读取", "文件读取", "文件解码", "内容截断"]);
        assert!(ErrorType::Truncated.is_notice());
        assert!(!ErrorType::Decode.is_notice());
    }
}
