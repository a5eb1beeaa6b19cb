use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::content::{ContentReader, DecodePolicy};

/// 应用程序配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// 扫描相关配置
    pub scan: ScanConfig,
    /// 性能相关配置
    pub performance: PerformanceConfig,
    /// 排除规则配置
    pub exclude: ExcludeConfig,
    /// 显示相关配置
    pub display: DisplayConfig,
}

/// 扫描配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// 单个文件最多读取的字节数，超出部分不检查
    pub max_file_bytes: u64,
    /// 二进制判定时检查的前缀字节数
    pub binary_probe_bytes: usize,
    /// 匹配片段在匹配点前后各保留的字符数
    pub excerpt_window: usize,
    /// 非法 UTF-8 的处理方式
    pub decode_policy: DecodePolicy,
    /// 文件被截断时是否在错误列表中记录一条提示
    pub report_truncation: bool,
}

/// 性能配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceConfig {
    /// 内容检查线程数，0 表示使用 CPU 核心数
    pub workers: usize,
    /// 每个线程允许积压的待检查文件数
    pub queue_factor: usize,
    /// 扫描超时秒数，0 表示不限制
    pub timeout_secs: u64,
}

/// 排除规则配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExcludeConfig {
    /// 每次扫描都排除的扩展名
    pub default_extensions: Vec<String>,
    /// 每次扫描都排除的目录
    pub default_dirs: Vec<String>,
    /// 路径比较是否忽略大小写
    pub case_insensitive: bool,
}

/// 显示配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// 最大行长度
    pub max_line_length: usize,
    /// 是否高亮中文内容
    pub highlight_matches: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scan: ScanConfig {
                max_file_bytes: 8 * 1024 * 1024,
                binary_probe_bytes: 8 * 1024,
                excerpt_window: 40,
                decode_policy: DecodePolicy::Strict,
                report_truncation: true,
            },
            performance: PerformanceConfig {
                workers: 0,
                queue_factor: 2,
                timeout_secs: 0,
            },
            exclude: ExcludeConfig {
                default_extensions: vec![],
                default_dirs: vec![],
                case_insensitive: false,
            },
            display: DisplayConfig {
                max_line_length: 200,
                highlight_matches: true,
            },
        }
    }
}

impl Config {
    /// 从配置文件加载配置，如果文件不存在则创建默认配置文件
    pub fn load_or_create(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            Self::load_from_file(config_path)
        } else {
            let config = Self::default();
            config.save_to_file(config_path)?;
            eprintln!("已创建默认配置文件: {}", config_path.display());
            Ok(config)
        }
    }

    /// 从文件加载配置
    pub fn load_from_file(config_path: &Path) -> Result<Self> {
        let content = fs::read_to_string(config_path)
            .with_context(|| format!("无法读取配置文件: {}", config_path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("无法解析配置文件: {}", config_path.display()))?;

        Ok(config)
    }

    /// 保存配置到文件
    pub fn save_to_file(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("无法创建配置目录: {}", parent.display()))?;
        }

        let content = toml::to_string_pretty(self).context("无法序列化配置")?;

        fs::write(config_path, content)
            .with_context(|| format!("无法写入配置文件: {}", config_path.display()))?;

        Ok(())
    }

    /// 获取配置文件的默认路径（程序所在目录下的 config.toml）
    pub fn default_config_path() -> Result<PathBuf> {
        let exe_path = std::env::current_exe().context("无法获取程序路径")?;

        let exe_dir = exe_path.parent().context("无法获取程序目录")?;

        Ok(exe_dir.join("config.toml"))
    }

    /// 验证配置的有效性
    pub fn validate(&self) -> Result<()> {
        if self.scan.max_file_bytes == 0 {
            anyhow::bail!("max_file_bytes 必须大于 0");
        }

        if self.scan.binary_probe_bytes == 0 {
            anyhow::bail!("binary_probe_bytes 必须大于 0");
        }

        if self.scan.excerpt_window > 1000 {
            anyhow::bail!("excerpt_window 不能超过 1000");
        }

        if self.performance.workers > 512 {
            anyhow::bail!("workers 不能超过 512");
        }

        if self.performance.queue_factor == 0 || self.performance.queue_factor > 64 {
            anyhow::bail!("queue_factor 必须在 1-64 之间");
        }

        if self.display.max_line_length < 50 {
            anyhow::bail!("max_line_length 不能小于 50");
        }

        Ok(())
    }

    /// 实际使用的检查线程数
    pub fn worker_count(&self) -> usize {
        match self.performance.workers {
            0 => num_cpus::get().max(1),
            n => n,
        }
    }

    /// 待检查队列容量，决定遍历线程何时被阻塞
    pub fn queue_capacity(&self) -> usize {
        self.worker_count() * self.performance.queue_factor.max(1)
    }

    /// 扫描超时
    pub fn timeout(&self) -> Option<Duration> {
        match self.performance.timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// 按配置创建内容读取器
    pub fn content_reader(&self) -> ContentReader {
        ContentReader::new(
            self.scan.max_file_bytes,
            self.scan.binary_probe_bytes,
            self.scan.decode_policy,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.scan.max_file_bytes, 8 * 1024 * 1024);
        assert_eq!(config.scan.decode_policy, DecodePolicy::Strict);
        assert_eq!(config.performance.queue_factor, 2);
        assert!(config.timeout().is_none());
        assert!(config.worker_count() >= 1);
        // 默认区分大小写，各平台一致
        assert!(!config.exclude.case_insensitive);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        assert!(toml_str.contains("decode_policy = \"strict\""));

        let deserialized: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(config.scan.excerpt_window, deserialized.scan.excerpt_window);
        assert_eq!(config.performance.workers, deserialized.performance.workers);
    }

    #[test]
    fn test_config_file_operations() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.toml");

        let mut original = Config::default();
        original.exclude.default_dirs = vec![".git".to_string()];
        original.scan.decode_policy = DecodePolicy::Lossy;
        original.save_to_file(&config_path).unwrap();

        let loaded = Config::load_from_file(&config_path).unwrap();
        assert_eq!(loaded.exclude.default_dirs, vec![".git".to_string()]);
        assert_eq!(loaded.scan.decode_policy, DecodePolicy::Lossy);
    }

    #[test]
    fn test_load_or_create_writes_default() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.toml");

        let config = Config::load_or_create(&config_path).unwrap();
        assert!(config_path.exists());
        assert_eq!(config.scan.excerpt_window, 40);
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.scan.max_file_bytes = 0;
        assert!(config.validate().is_err());

        config = Config::default();
        config.performance.queue_factor = 0;
        assert!(config.validate().is_err());

        config = Config::default();
        config.scan.excerpt_window = 5000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_explicit_workers_and_timeout() {
        let mut config = Config::default();
        config.performance.workers = 3;
        config.performance.timeout_secs = 5;
        assert_eq!(config.worker_count(), 3);
        assert_eq!(config.queue_capacity(), 6);
        assert_eq!(config.timeout(), Some(Duration::from_secs(5)));
    }
}
