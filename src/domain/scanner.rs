use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ignore::{DirEntry, WalkBuilder, WalkState};

use crate::domain::extension::{extension_of, is_hidden};
use crate::infrastructure::LoggerTrait;

/// 待移动的文件记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub path: PathBuf,
    pub extension: String,
}

/// 文件分类结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Eligibility {
    /// 可以整理的普通文件
    Eligible(FileRecord),
    /// 以隐藏标记开头的文件，永远不移动也不删除
    Hidden,
    /// 没有扩展名，保持原位
    Uncategorized,
    /// 目录、符号链接等
    NotAFile,
}

/// 文件筛选条件
#[derive(Debug, Clone)]
pub struct FileFilter {
    pub hidden_marker: String,
    pub excluded_dirs: HashSet<String>,
}

impl FileFilter {
    /// 创建新的文件过滤器
    pub fn new(hidden_marker: impl Into<String>, excluded_dirs: Vec<String>) -> Self {
        Self {
            hidden_marker: hidden_marker.into(),
            excluded_dirs: excluded_dirs.into_iter().collect(),
        }
    }

    /// 检查相对路径是否位于被排除的目录中
    pub fn is_path_excluded(&self, relative: &Path) -> bool {
        if self.excluded_dirs.is_empty() {
            return false;
        }

        relative.components().any(|component| {
            component
                .as_os_str()
                .to_str()
                .map_or(false, |name| self.excluded_dirs.contains(name))
        })
    }

    /// 对遍历到的条目分类
    pub fn classify(&self, entry: &DirEntry) -> Eligibility {
        // 只处理普通文件，不跟随符号链接
        if !entry.file_type().map_or(false, |ft| ft.is_file()) {
            return Eligibility::NotAFile;
        }

        if is_hidden(entry.file_name(), &self.hidden_marker) {
            return Eligibility::Hidden;
        }

        match extension_of(entry.path()) {
            Some(extension) => Eligibility::Eligible(FileRecord {
                path: entry.path().to_path_buf(),
                extension,
            }),
            None => Eligibility::Uncategorized,
        }
    }
}

impl Default for FileFilter {
    fn default() -> Self {
        Self::new(crate::domain::extension::DEFAULT_HIDDEN_MARKER, Vec::new())
    }
}

/// 创建遍历器：包含所有文件，不读取任何忽略规则
fn walk_builder(root: &Path, filter: &FileFilter, threads: usize) -> WalkBuilder {
    let mut builder = WalkBuilder::new(root);
    builder
        .standard_filters(false)
        .follow_links(false)
        .threads(threads.max(1));

    if !filter.excluded_dirs.is_empty() {
        let filter = filter.clone();
        let root = root.to_path_buf();
        builder.filter_entry(move |entry| match entry.path().strip_prefix(&root) {
            Ok(relative) => !filter.is_path_excluded(relative),
            Err(_) => true,
        });
    }

    builder
}

/// 并行扫描目录，对每个可整理的文件执行回调，返回文件数量
pub fn scan_directory<F>(
    root: &Path,
    filter: &FileFilter,
    threads: usize,
    logger: Arc<dyn LoggerTrait>,
    callback: F,
) -> u64
where
    F: Fn(FileRecord) + Send + Sync,
{
    let total_files = AtomicU64::new(0);

    walk_builder(root, filter, threads).build_parallel().run(|| {
        let logger = Arc::clone(&logger);
        let callback = &callback;
        let total_files = &total_files;

        Box::new(move |result| {
            let entry = match result {
                Ok(entry) => entry,
                Err(err) => {
                    logger.warn(&format!("遍历错误: {}", err));
                    return WalkState::Continue;
                }
            };

            if let Eligibility::Eligible(record) = filter.classify(&entry) {
                total_files.fetch_add(1, Ordering::Relaxed);
                callback(record);
            }

            WalkState::Continue
        })
    });

    total_files.load(Ordering::Relaxed)
}

/// 顺序遍历所有可整理的文件
pub fn eligible_files<'a>(
    root: &Path,
    filter: &'a FileFilter,
    logger: Arc<dyn LoggerTrait>,
) -> impl Iterator<Item = FileRecord> + 'a {
    walk_builder(root, filter, 1)
        .build()
        .filter_map(move |result| match result {
            Ok(entry) => match filter.classify(&entry) {
                Eligibility::Eligible(record) => Some(record),
                _ => None,
            },
            Err(err) => {
                logger.warn(&format!("遍历错误: {}", err));
                None
            }
        })
}

/// 统计树中剩余的隐藏文件
pub fn count_hidden_files(root: &Path, filter: &FileFilter, logger: &dyn LoggerTrait) -> u64 {
    let mut hidden = 0;
    for result in walk_builder(root, filter, 1).build() {
        match result {
            Ok(entry) => {
                if filter.classify(&entry) == Eligibility::Hidden {
                    hidden += 1;
                }
            }
            Err(err) => logger.warn(&format!("遍历错误: {}", err)),
        }
    }
    hidden
}

/// 收集根目录以下的所有子目录，最深的排在最前面
pub fn collect_directories(root: &Path, filter: &FileFilter, logger: &dyn LoggerTrait) -> Vec<PathBuf> {
    let mut dirs: Vec<(usize, PathBuf)> = Vec::new();
    for result in walk_builder(root, filter, 1).build() {
        match result {
            Ok(entry) => {
                let is_dir = entry.file_type().map_or(false, |ft| ft.is_dir());
                if is_dir && entry.depth() > 0 {
                    dirs.push((entry.depth(), entry.into_path()));
                }
            }
            Err(err) => logger.warn(&format!("遍历错误: {}", err)),
        }
    }

    dirs.sort_by(|a, b| b.0.cmp(&a.0));
    dirs.into_iter().map(|(_, path)| path).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::logging::testing::MemoryLogger;
    use std::collections::BTreeSet;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::tempdir;

    fn sample_tree() -> tempfile::TempDir {
        let temp_dir = tempdir().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("docs/deep")).unwrap();
        fs::create_dir_all(root.join("node_modules")).unwrap();
        fs::write(root.join("a.txt"), "a").unwrap();
        fs::write(root.join("docs/b.PDF"), "b").unwrap();
        fs::write(root.join("docs/deep/c.txt"), "c").unwrap();
        fs::write(root.join("docs/.secret.txt"), "s").unwrap();
        fs::write(root.join("Makefile"), "m").unwrap();
        fs::write(root.join("node_modules/lib.js"), "j").unwrap();
        temp_dir
    }

    #[test]
    fn test_path_exclusion() {
        let filter = FileFilter::new(".", vec!["target".to_string()]);

        assert!(filter.is_path_excluded(&PathBuf::from("target/debug/app")));
        assert!(!filter.is_path_excluded(&PathBuf::from("src/main.rs")));
        assert!(!FileFilter::default().is_path_excluded(&PathBuf::from("target/x")));
    }

    #[test]
    fn test_scan_collects_eligible_files() {
        let temp_dir = sample_tree();
        let logger = MemoryLogger::new();
        let found = Mutex::new(BTreeSet::new());

        let total = scan_directory(temp_dir.path(), &FileFilter::default(), 4, logger, |record| {
            found.lock().unwrap().insert(record.extension);
        });

        assert_eq!(total, 4);
        let found = found.into_inner().unwrap();
        let expected: BTreeSet<String> = ["txt", "PDF", "js"].iter().map(|s| s.to_string()).collect();
        assert_eq!(found, expected);
    }

    #[test]
    fn test_excluded_dirs_are_not_walked() {
        let temp_dir = sample_tree();
        let filter = FileFilter::new(".", vec!["node_modules".to_string()]);

        let files: Vec<FileRecord> = eligible_files(temp_dir.path(), &filter, MemoryLogger::new()).collect();

        assert_eq!(files.len(), 3);
        assert!(files.iter().all(|record| record.extension != "js"));
    }

    #[test]
    fn test_count_hidden_files() {
        let temp_dir = sample_tree();
        let logger = MemoryLogger::new();

        assert_eq!(count_hidden_files(temp_dir.path(), &FileFilter::default(), logger.as_ref()), 1);
    }

    #[test]
    fn test_collect_directories_deepest_first() {
        let temp_dir = sample_tree();
        let logger = MemoryLogger::new();

        let dirs = collect_directories(temp_dir.path(), &FileFilter::default(), logger.as_ref());

        assert_eq!(dirs.len(), 3);
        assert_eq!(dirs[0], temp_dir.path().join("docs/deep"));
        assert!(!dirs.contains(&temp_dir.path().to_path_buf()));
    }
}
