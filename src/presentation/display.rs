use std::io::{self, Write};
use std::time::Duration;

use anyhow::Result;
use humansize::{format_size, BINARY};

use crate::application::config::DisplayConfig;
use crate::domain::request::ScanResult;
use crate::domain::script::is_chinese_char;

/// 格式化文件大小
pub fn format_file_size(size: u64) -> String {
    format_size(size, BINARY)
}

/// 格式化持续时间
pub fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let hours = total_secs / 3600;
    let mins = (total_secs % 3600) / 60;
    let secs = total_secs % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, mins, secs)
    } else if mins > 0 {
        format!("{}m {}s", mins, secs)
    } else {
        format!("{}.{:03}s", secs, duration.subsec_millis())
    }
}

/// 按最大长度截断并高亮中文字符
pub fn render_excerpt(excerpt: &str, display: &DisplayConfig) -> String {
    let mut out = String::new();
    let mut in_highlight = false;

    for (count, c) in excerpt.chars().enumerate() {
        if count >= display.max_line_length {
            if in_highlight {
                out.push_str("\x1b[0m");
                in_highlight = false;
            }
            out.push('…');
            break;
        }

        if display.highlight_matches {
            let chinese = is_chinese_char(c);
            if chinese && !in_highlight {
                out.push_str("\x1b[1;31m");
                in_highlight = true;
            } else if !chinese && in_highlight {
                out.push_str("\x1b[0m");
                in_highlight = false;
            }
        }
        out.push(c);
    }

    if in_highlight {
        out.push_str("\x1b[0m");
    }
    out
}

/// 输出扫描结果
pub fn print_scan_result(result: &ScanResult, display: &DisplayConfig) -> Result<()> {
    let mut stdout = io::stdout().lock();

    writeln!(stdout, "\x1b[1m名称包含中文的文件/目录 ({}):\x1b[0m", result.chinese_names.len())?;
    for name in &result.chinese_names {
        writeln!(stdout, "  \x1b[1;32m{}\x1b[0m", name)?;
    }

    writeln!(stdout)?;
    writeln!(stdout, "\x1b[1m内容包含中文的文件 ({}):\x1b[0m", result.files_with_chinese.len())?;
    for (path, excerpt) in &result.files_with_chinese {
        writeln!(stdout, "\x1b[1;32m{}\x1b[0m", path)?;
        writeln!(stdout, "  {}", render_excerpt(excerpt, display))?;
    }

    if !result.errors.is_empty() {
        writeln!(stdout)?;
        writeln!(stdout, "\x1b[1;33m错误 ({}):\x1b[0m", result.errors.len())?;
        for error in &result.errors {
            writeln!(stdout, "  {}", error)?;
        }
    }

    Ok(())
}

/// 以 JSON 形式输出结果（chineseNames / filesWithChinese / errors）
pub fn render_json(result: &ScanResult) -> Result<String> {
    Ok(serde_json::to_string_pretty(result)?)
}

/// 扫描摘要
pub struct ScanSummary {
    pub duration: Duration,
    pub max_file_bytes: u64,
    pub workers: usize,
}

impl ScanSummary {
    pub fn print(&self, result: &ScanResult) -> Result<()> {
        let stats = &result.stats;
        let mut stdout = io::stdout().lock();

        writeln!(stdout, "\n扫描摘要:")?;
        writeln!(stdout, "----------------------------")?;
        writeln!(stdout, "总用时: {}", format_duration(self.duration))?;
        writeln!(stdout, "检查线程: {}", self.workers)?;
        writeln!(stdout, "单文件上限: {}", format_file_size(self.max_file_bytes))?;
        writeln!(stdout, "遍历条目: {}", stats.entries_visited)?;
        writeln!(stdout, "检查文件: {}", stats.files_inspected)?;
        writeln!(stdout, "跳过二进制: {}", stats.binary_skipped)?;
        writeln!(stdout, "截断文件: {}", stats.files_truncated)?;
        writeln!(stdout, "剪除目录: {}", stats.dirs_pruned)?;
        writeln!(stdout, "中文名称: {}", result.chinese_names.len())?;
        writeln!(stdout, "中文内容: {}", result.files_with_chinese.len())?;
        writeln!(stdout, "错误: {}", result.errors.len())?;

        Ok(())
    }
}
