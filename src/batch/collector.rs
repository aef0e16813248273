//! # 输出文件收集器
//!
//! 在已有的扫描工作目录下查找 pw.x 输出文件，供 `collect` 命令重新解析。
//!
//! ## 功能
//! - 输入可以是单个输出文件或工作根目录
//! - 按文件名模式过滤（默认 `pwscf.out`，支持 `*` 和 `?`）
//! - 可选递归搜索，结果按路径排序
//!
//! ## 依赖关系
//! - 被 `commands/collect.rs` 调用
//! - 使用 `walkdir` 遍历目录

use crate::batch::job::OUTPUT_FILE;

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// 输出文件收集器
pub struct OutputCollector {
    root: PathBuf,
    patterns: Vec<String>,
    recursive: bool,
}

impl OutputCollector {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            patterns: vec![OUTPUT_FILE.to_string()],
            recursive: false,
        }
    }

    /// 设置文件名模式（逗号分隔）
    pub fn with_pattern(mut self, pattern: &str) -> Self {
        let patterns: Vec<String> = pattern
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if !patterns.is_empty() {
            self.patterns = patterns;
        }
        self
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// 收集匹配的输出文件
    ///
    /// 非递归时只看根目录及其直接子目录（即每个作业目录一层）。
    pub fn collect(&self) -> Vec<PathBuf> {
        if self.root.is_file() {
            return vec![self.root.clone()];
        }
        if !self.root.is_dir() {
            return vec![];
        }

        let max_depth = if self.recursive { usize::MAX } else { 2 };
        let mut files: Vec<PathBuf> = WalkDir::new(&self.root)
            .max_depth(max_depth)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| self.matches(e.path()))
            .map(|e| e.into_path())
            .collect();

        files.sort();
        files
    }

    fn matches(&self, path: &Path) -> bool {
        match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => self.patterns.iter().any(|p| wildcard_match(p, name)),
            None => false,
        }
    }
}

/// 通配符匹配（`*` 任意串，`?` 单个字符）
fn wildcard_match(pattern: &str, name: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let name: Vec<char> = name.chars().collect();

    let (mut p, mut n) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while n < name.len() {
        match pattern.get(p) {
            Some('*') => {
                backtrack = Some((p, n));
                p += 1;
            }
            Some(&c) if c == '?' || c == name[n] => {
                p += 1;
                n += 1;
            }
            _ => match backtrack {
                Some((star, matched)) => {
                    p = star + 1;
                    n = matched + 1;
                    backtrack = Some((star, matched + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|&c| c == '*')
}
