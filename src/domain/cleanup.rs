use std::fs;
use std::path::Path;

use crate::domain::error::SortError;
use crate::domain::scanner::{collect_directories, FileFilter};
use crate::infrastructure::filesystem::is_dir_empty;
use crate::infrastructure::LoggerTrait;

/// 清理阶段统计
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CleanupStats {
    pub dirs_removed: u64,
    pub removal_failures: u64,
}

/// 删除整理后留下的空目录，从最深的目录开始，根目录本身保留
///
/// 删除失败不会中断清理，只记录警告。
pub fn remove_empty_dirs(root: &Path, filter: &FileFilter, logger: &dyn LoggerTrait) -> CleanupStats {
    let mut stats = CleanupStats::default();

    for dir in collect_directories(root, filter, logger) {
        match is_dir_empty(&dir) {
            Ok(true) => {}
            Ok(false) => continue,
            // 目录可能已被其他进程删除
            Err(_) => continue,
        }

        match fs::remove_dir(&dir) {
            Ok(()) => {
                stats.dirs_removed += 1;
                let name = dir.strip_prefix(root).unwrap_or(&dir);
                logger.info(&format!("空文件夹 {} 已删除", name.display()));
            }
            Err(source) => {
                stats.removal_failures += 1;
                let err = SortError::DirectoryRemovalFailure { path: dir, source };
                logger.warn(&err.to_string());
            }
        }
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::logging::testing::MemoryLogger;
    use crate::infrastructure::LogLevel;
    use tempfile::tempdir;

    #[test]
    fn test_removes_nested_empty_dirs() {
        let temp_dir = tempdir().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("a/b/c")).unwrap();
        fs::create_dir_all(root.join("keep/inner")).unwrap();
        fs::write(root.join("keep/inner/file.txt"), "x").unwrap();
        let logger = MemoryLogger::new();

        let stats = remove_empty_dirs(root, &FileFilter::default(), logger.as_ref());

        assert_eq!(stats, CleanupStats { dirs_removed: 3, removal_failures: 0 });
        assert!(!root.join("a").exists());
        assert!(root.join("keep/inner/file.txt").exists());
        assert!(root.exists());
        assert_eq!(logger.messages(LogLevel::Info).len(), 3);
    }

    #[test]
    fn test_dir_with_hidden_file_is_kept() {
        let temp_dir = tempdir().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("config")).unwrap();
        fs::write(root.join("config/.env"), "KEY=1").unwrap();

        let stats = remove_empty_dirs(root, &FileFilter::default(), MemoryLogger::new().as_ref());

        assert_eq!(stats.dirs_removed, 0);
        assert!(root.join("config/.env").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_removal_failure_is_skipped() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = tempdir().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("locked/inner")).unwrap();
        fs::create_dir_all(root.join("loose/deeper")).unwrap();
        fs::set_permissions(root.join("locked"), fs::Permissions::from_mode(0o555)).unwrap();

        // root 用户可以删除只读目录中的条目
        if fs::create_dir(root.join("locked/marker")).is_ok() {
            fs::set_permissions(root.join("locked"), fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let logger = MemoryLogger::new();
        let stats = remove_empty_dirs(root, &FileFilter::default(), logger.as_ref());
        fs::set_permissions(root.join("locked"), fs::Permissions::from_mode(0o755)).unwrap();

        assert_eq!(stats, CleanupStats { dirs_removed: 2, removal_failures: 1 });
        assert!(root.join("locked/inner").exists());
        assert!(!root.join("loose").exists());
        assert_eq!(logger.messages(LogLevel::Warn).len(), 1);
    }

    #[test]
    fn test_empty_root_is_kept() {
        let temp_dir = tempdir().unwrap();

        let stats = remove_empty_dirs(temp_dir.path(), &FileFilter::default(), MemoryLogger::new().as_ref());

        assert_eq!(stats.dirs_removed, 0);
        assert!(temp_dir.path().exists());
    }
}
