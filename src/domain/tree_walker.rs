use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ignore::{DirEntry, Walk, WalkBuilder};

use crate::domain::path_matcher::PathMatcher;

/// 条目类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    /// 符号链接不跟随，只参与名称匹配
    Symlink,
}

/// 遍历到的条目，交给调用方后立即消费
#[derive(Debug, Clone)]
pub struct VisitedEntry {
    pub path: PathBuf,
    pub kind: EntryKind,
    /// 仅文件有大小
    pub size: Option<u64>,
}

impl VisitedEntry {
    /// 条目的基本名
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

/// 遍历错误（目录无法列出、遍历过程中消失等）
#[derive(Debug, Clone)]
pub struct WalkError {
    pub path: Option<PathBuf>,
    pub message: String,
}

impl WalkError {
    fn from_ignore(err: &ignore::Error) -> Self {
        Self {
            path: error_path(err).map(Path::to_path_buf),
            message: err.to_string(),
        }
    }
}

/// 遍历事件
#[derive(Debug, Clone)]
pub enum WalkEvent {
    Entry(VisitedEntry),
    Error(WalkError),
}

/// 目录树遍历器
///
/// 单线程深度优先，同一目录下按文件名排序，保证名称匹配结果的顺序稳定。
/// 被排除的目录在进入之前就被剪掉，不跟随符号链接。每次调用 `walk`
/// 都从头开始遍历，不保留跨调用的状态。
pub struct TreeWalker {
    root: PathBuf,
    matcher: Arc<PathMatcher>,
}

impl TreeWalker {
    pub fn new(root: impl Into<PathBuf>, matcher: Arc<PathMatcher>) -> Self {
        Self {
            root: root.into(),
            matcher,
        }
    }

    /// 开始一次新的遍历
    pub fn walk(&self) -> TreeWalk {
        let pruned = Arc::new(AtomicU64::new(0));

        let mut builder = WalkBuilder::new(&self.root);
        builder
            .standard_filters(false) // 不使用 .gitignore、隐藏文件等过滤规则
            .follow_links(false) // 不跟随符号链接
            .sort_by_file_name(|a, b| a.cmp(b));

        let matcher = Arc::clone(&self.matcher);
        let pruned_clone = Arc::clone(&pruned);
        builder.filter_entry(move |entry: &DirEntry| {
            let is_dir = entry.file_type().map_or(false, |ft| ft.is_dir());
            if is_dir && matcher.is_excluded(entry.path(), true) {
                pruned_clone.fetch_add(1, Ordering::Relaxed);
                return false;
            }
            true
        });

        TreeWalk {
            inner: builder.build(),
            pruned,
        }
    }
}

/// 一次遍历的惰性事件流
pub struct TreeWalk {
    inner: Walk,
    pruned: Arc<AtomicU64>,
}

impl TreeWalk {
    /// 目前为止被剪掉的目录数
    pub fn pruned_dirs(&self) -> u64 {
        self.pruned.load(Ordering::Relaxed)
    }
}

impl Iterator for TreeWalk {
    type Item = WalkEvent;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.inner.next()? {
                Ok(entry) => entry,
                Err(err) => return Some(WalkEvent::Error(WalkError::from_ignore(&err))),
            };

            // 根目录本身不作为条目输出
            if entry.depth() == 0 {
                continue;
            }

            let kind = match entry.file_type() {
                Some(ft) if ft.is_symlink() => EntryKind::Symlink,
                Some(ft) if ft.is_dir() => EntryKind::Directory,
                Some(ft) if ft.is_file() => EntryKind::File,
                // 设备文件、管道等既不列出也不读取
                _ => continue,
            };

            let size = match kind {
                EntryKind::File => entry.metadata().ok().map(|m| m.len()),
                _ => None,
            };

            return Some(WalkEvent::Entry(VisitedEntry {
                path: entry.into_path(),
                kind,
                size,
            }));
        }
    }
}

/// 从 ignore 的错误中取出相关路径
fn error_path(err: &ignore::Error) -> Option<&Path> {
    match err {
        ignore::Error::WithPath { path, .. } => Some(path.as_path()),
        ignore::Error::WithDepth { err, .. } => error_path(err),
        ignore::Error::WithLineNumber { err, .. } => error_path(err),
        ignore::Error::Loop { child, .. } => Some(child.as_path()),
        _ => None,
    }
}
