use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::domain::path_matcher::absolutize;

/// 一次扫描请求，构建后不再修改
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRequest {
    root_directory: PathBuf,
    exclude_extensions: BTreeSet<String>,
    exclude_directories: BTreeSet<String>,
}

impl ScanRequest {
    /// 从已拆分好的值创建请求
    ///
    /// 扩展名会被转为小写并去掉开头的 `.`，空项会被丢弃。
    pub fn new<E, D>(root_directory: impl Into<PathBuf>, exclude_extensions: E, exclude_directories: D) -> Self
    where
        E: IntoIterator,
        E::Item: AsRef<str>,
        D: IntoIterator,
        D::Item: AsRef<str>,
    {
        let exclude_extensions = exclude_extensions
            .into_iter()
            .map(|ext| ext.as_ref().trim().trim_start_matches('.').to_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();

        let exclude_directories = exclude_directories
            .into_iter()
            .map(|dir| dir.as_ref().trim().to_string())
            .filter(|dir| !dir.is_empty())
            .collect();

        Self {
            root_directory: root_directory.into(),
            exclude_extensions,
            exclude_directories,
        }
    }

    /// 从查询参数的原始字符串创建请求，列表以 `,` 或 `;` 分隔
    pub fn from_query(directory: &str, exclude_extensions: &str, exclude_directories: &str) -> Self {
        Self::new(
            directory.trim(),
            split_list(exclude_extensions),
            split_list(exclude_directories),
        )
    }

    /// 合并额外的排除项（例如配置文件中的默认值），返回新的请求
    pub fn with_defaults<E, D>(&self, extensions: E, directories: D) -> Self
    where
        E: IntoIterator,
        E::Item: AsRef<str>,
        D: IntoIterator,
        D::Item: AsRef<str>,
    {
        let merged = Self::new(&self.root_directory, extensions, directories);
        Self {
            root_directory: self.root_directory.clone(),
            exclude_extensions: self
                .exclude_extensions
                .union(&merged.exclude_extensions)
                .cloned()
                .collect(),
            exclude_directories: self
                .exclude_directories
                .union(&merged.exclude_directories)
                .cloned()
                .collect(),
        }
    }

    /// 根目录转为绝对路径后的请求，排除项不变
    pub fn resolved(&self) -> io::Result<Self> {
        Ok(Self {
            root_directory: absolutize(&self.root_directory)?,
            ..self.clone()
        })
    }

    pub fn root_directory(&self) -> &Path {
        &self.root_directory
    }

    pub fn exclude_extensions(&self) -> &BTreeSet<String> {
        &self.exclude_extensions
    }

    pub fn exclude_directories(&self) -> &BTreeSet<String> {
        &self.exclude_directories
    }
}

/// 拆分以逗号或分号分隔的列表
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split([',', ';'])
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// 扫描统计（不参与序列化）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub entries_visited: u64,
    pub files_inspected: u64,
    pub binary_skipped: u64,
    pub files_truncated: u64,
    pub dirs_pruned: u64,
}

/// 扫描结果
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResult {
    /// 名称含中文的文件与目录，按遍历顺序
    pub chinese_names: Vec<String>,
    /// 内容含中文的文件 -> 首个匹配片段
    pub files_with_chinese: BTreeMap<String, String>,
    /// 扫描过程中遇到的错误，不会中断扫描
    pub errors: Vec<String>,
    #[serde(skip)]
    pub stats: ScanStats,
}

/// 单个文件内容检查的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// 内容含中文，附带片段；`truncated` 表示只检查了前缀
    Matched {
        path: String,
        excerpt: String,
        truncated: bool,
    },
    /// 内容不含中文
    NoMatch { path: String, truncated: bool },
    /// 二进制文件，不做内容检查
    Binary { path: String },
    /// 读取或解码失败
    Failed { path: String, message: String, decode: bool },
    /// 目录遍历失败
    WalkFailed { message: String },
}
