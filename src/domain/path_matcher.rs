use std::collections::HashSet;
use std::io;
use std::path::{Component, Path, PathBuf};

use crate::domain::request::ScanRequest;

/// 路径排除匹配器
///
/// 排除集合在扫描开始时规范化一次（分隔符统一为 `/`，去掉末尾分隔符，
/// 大小写不敏感时统一转小写），之后每个条目只做字符串比较。
#[derive(Debug, Clone)]
pub struct PathMatcher {
    extensions: HashSet<String>,
    directories: Vec<String>,
    root: Option<PathBuf>,
    case_insensitive: bool,
}

impl PathMatcher {
    /// 创建匹配器
    pub fn new<E, D>(extensions: E, directories: D, case_insensitive: bool) -> Self
    where
        E: IntoIterator,
        E::Item: AsRef<str>,
        D: IntoIterator,
        D::Item: AsRef<str>,
    {
        let extensions = extensions
            .into_iter()
            .map(|ext| ext.as_ref().trim_start_matches('.').to_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();

        let directories = directories
            .into_iter()
            .map(|dir| resolve_entry(dir.as_ref()))
            .map(|dir| normalize(&dir, case_insensitive))
            .map(|dir| dir.strip_prefix("./").map(str::to_string).unwrap_or(dir))
            .filter(|dir| !dir.is_empty())
            .collect();

        Self {
            extensions,
            directories,
            root: None,
            case_insensitive,
        }
    }

    /// 根据扫描请求创建匹配器，并以请求根目录作为祖先检查的边界
    pub fn from_request(request: &ScanRequest, case_insensitive: bool) -> Self {
        Self::new(
            request.exclude_extensions(),
            request.exclude_directories(),
            case_insensitive,
        )
        .with_root(request.root_directory())
    }

    /// 设置扫描根目录：检查祖先目录时不越过根目录
    pub fn with_root(mut self, root: &Path) -> Self {
        self.root = Some(root.to_path_buf());
        self
    }

    /// 检查路径是否被排除
    pub fn is_excluded(&self, path: &Path, is_directory: bool) -> bool {
        if !is_directory && self.is_extension_excluded(path) {
            return true;
        }

        if is_directory && self.is_directory_excluded(path) {
            return true;
        }

        // 位于被排除目录之下的条目同样被排除
        self.ancestors_within_root(path)
            .any(|ancestor| self.is_directory_excluded(ancestor))
    }

    /// 文件扩展名是否在排除集合中（取基本名最后一个 `.` 之后的部分）
    pub fn is_extension_excluded(&self, path: &Path) -> bool {
        if self.extensions.is_empty() {
            return false;
        }
        match extension_of(path) {
            Some(ext) => self.extensions.contains(&ext),
            None => false,
        }
    }

    /// 目录本身是否命中排除规则：完整路径、基本名、或以排除项为路径前缀
    pub fn is_directory_excluded(&self, dir: &Path) -> bool {
        if self.directories.is_empty() {
            return false;
        }

        let full = normalize(&dir.to_string_lossy(), self.case_insensitive);
        let name = dir
            .file_name()
            .map(|n| normalize(&n.to_string_lossy(), self.case_insensitive));

        self.directories.iter().any(|excluded| {
            if full == *excluded || name.as_deref() == Some(excluded.as_str()) {
                return true;
            }
            // 前缀必须落在路径分隔符上，避免 /foo2 命中 /foo
            if full.starts_with(excluded.as_str()) && full[excluded.len()..].starts_with('/') {
                return true;
            }
            // 多段相对片段按结尾匹配，同样要求分隔符边界
            excluded.contains('/')
                && full.ends_with(excluded.as_str())
                && full[..full.len() - excluded.len()].ends_with('/')
        })
    }

    /// 路径的祖先目录，止于根目录（不含根目录本身）
    fn ancestors_within_root<'a>(&'a self, path: &'a Path) -> impl Iterator<Item = &'a Path> + 'a {
        path.ancestors()
            .skip(1)
            .take_while(move |ancestor| match &self.root {
                Some(root) => ancestor.starts_with(root) && *ancestor != root.as_path(),
                None => !ancestor.as_os_str().is_empty(),
            })
    }
}

/// 基本名中最后一个 `.` 之后的小写部分；没有 `.` 或结尾为 `.` 时返回 None
pub fn extension_of(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_string_lossy();
    let (_, ext) = name.rsplit_once('.')?;
    if ext.is_empty() {
        None
    } else {
        Some(ext.to_lowercase())
    }
}

/// 转为绝对路径，并按字面消去 `.` 和 `..`（不解析符号链接）
pub fn absolutize(path: &Path) -> io::Result<PathBuf> {
    let absolute = std::path::absolute(path)?;
    let mut resolved = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                resolved.pop();
            }
            other => resolved.push(other.as_os_str()),
        }
    }
    Ok(resolved)
}

/// 绝对路径形式的排除项与根目录按同样方式解析；相对片段保持原样
fn resolve_entry(raw: &str) -> String {
    let trimmed = raw.trim();
    let path = Path::new(trimmed);
    if !path.is_absolute() {
        return trimmed.to_string();
    }
    match absolutize(path) {
        Ok(resolved) => resolved.to_string_lossy().into_owned(),
        Err(_) => trimmed.to_string(),
    }
}

/// 统一分隔符并去掉末尾的 `/`
fn normalize(raw: &str, case_insensitive: bool) -> String {
    let mut normalized = raw.trim().replace('\\', "/");
    while normalized.len() > 1 && normalized.ends_with('/') {
        normalized.pop();
    }
    if case_insensitive {
        normalized.to_lowercase()
    } else {
        normalized
    }
}
