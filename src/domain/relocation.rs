use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use crossbeam_channel::bounded;
use indicatif::{ProgressBar, ProgressStyle};

use crate::domain::error::SortError;
use crate::domain::extension::destination_folder_name;
use crate::domain::namer::DestinationNamer;
use crate::domain::scanner::{eligible_files, FileFilter, FileRecord};
use crate::infrastructure::filesystem;
use crate::infrastructure::LoggerTrait;

/// 移动阶段的参数
#[derive(Debug, Clone)]
pub struct RelocationOptions {
    pub folder_suffix: String,
    /// 工作线程数，至少为1
    pub workers: usize,
    /// 遍历线程与工作线程之间的通道容量
    pub queue_capacity: usize,
    pub show_progress: bool,
}

/// 单个文件的移动结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    Moved { destination: PathBuf, bytes: u64 },
    /// 文件已经位于自己的目标文件夹中
    AlreadySorted,
}

/// 移动阶段统计
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RelocationStats {
    pub files_moved: u64,
    pub already_sorted: u64,
    pub bytes_moved: u64,
}

#[derive(Default)]
struct Counters {
    moved: AtomicU64,
    already_sorted: AtomicU64,
    bytes: AtomicU64,
    processed: AtomicU64,
}

/// 把一个文件移动到 `<root>/<EXT>_Files/` 中
pub fn move_file(
    record: &FileRecord,
    root: &Path,
    folder_suffix: &str,
    namer: &DestinationNamer,
    logger: &dyn LoggerTrait,
) -> Result<MoveOutcome, SortError> {
    let folder = root.join(destination_folder_name(&record.extension, folder_suffix));

    if record.path.parent() == Some(folder.as_path()) {
        return Ok(MoveOutcome::AlreadySorted);
    }

    let file_name = record.path.file_name().ok_or_else(|| SortError::MoveFailure {
        from: record.path.clone(),
        to: folder.clone(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "缺少文件名"),
    })?;

    let claim = namer.claim(&folder, file_name)?;
    let bytes = filesystem::move_file(&record.path, claim.path()).map_err(|source| {
        SortError::MoveFailure {
            from: record.path.clone(),
            to: claim.path().to_path_buf(),
            source,
        }
    })?;

    logger.debug(&format!(
        "文件 {} 已移动到 {}",
        file_name.to_string_lossy(),
        folder.display()
    ));

    Ok(MoveOutcome::Moved {
        destination: claim.path().to_path_buf(),
        bytes,
    })
}

fn progress_bar(enabled: bool) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }

    let progress = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner()
        .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
        .template("{spinner:.green} [{elapsed_precise}] {msg}")
    {
        progress.set_style(style);
    }
    progress.set_message("已处理 0 文件");
    progress
}

/// 重新遍历目录，把每个文件交给工作线程池移动
///
/// 所有已提交的移动完成后才返回；有失败时返回遇到的第一个错误，
/// 已经移动的文件不会回滚。
pub fn relocate_all(
    root: &Path,
    filter: &FileFilter,
    options: &RelocationOptions,
    namer: &DestinationNamer,
    logger: Arc<dyn LoggerTrait>,
) -> Result<RelocationStats, SortError> {
    let (tx, rx) = bounded::<FileRecord>(options.queue_capacity.max(1));
    let counters = Counters::default();
    let first_error: Mutex<Option<SortError>> = Mutex::new(None);
    let progress = progress_bar(options.show_progress);

    thread::scope(|scope| {
        for _ in 0..options.workers.max(1) {
            let rx = rx.clone();
            let counters = &counters;
            let first_error = &first_error;
            let progress = &progress;
            let logger = logger.as_ref();

            scope.spawn(move || {
                for record in rx.iter() {
                    match move_file(&record, root, &options.folder_suffix, namer, logger) {
                        Ok(MoveOutcome::Moved { bytes, .. }) => {
                            counters.moved.fetch_add(1, Ordering::Relaxed);
                            counters.bytes.fetch_add(bytes, Ordering::Relaxed);
                        }
                        Ok(MoveOutcome::AlreadySorted) => {
                            counters.already_sorted.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(err) => {
                            logger.warn(&err.to_string());
                            let mut slot = first_error.lock().unwrap_or_else(|p| p.into_inner());
                            if slot.is_none() {
                                *slot = Some(err);
                            }
                        }
                    }

                    let processed = counters.processed.fetch_add(1, Ordering::Relaxed) + 1;
                    progress.set_message(format!("已处理 {} 文件", processed));
                    progress.tick();
                }
            });
        }
        drop(rx);

        for record in eligible_files(root, filter, Arc::clone(&logger)) {
            if tx.send(record).is_err() {
                break;
            }
        }
        drop(tx);
    });

    progress.finish_with_message(format!(
        "完成! 已处理 {} 文件",
        counters.processed.load(Ordering::Relaxed)
    ));

    if let Some(err) = first_error.into_inner().unwrap_or_else(|p| p.into_inner()) {
        return Err(err);
    }

    Ok(RelocationStats {
        files_moved: counters.moved.load(Ordering::Relaxed),
        already_sorted: counters.already_sorted.load(Ordering::Relaxed),
        bytes_moved: counters.bytes.load(Ordering::Relaxed),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::logging::testing::MemoryLogger;
    use crate::infrastructure::LogLevel;
    use std::fs;
    use tempfile::tempdir;

    fn options(workers: usize) -> RelocationOptions {
        RelocationOptions {
            folder_suffix: "_Files".to_string(),
            workers,
            queue_capacity: 4,
            show_progress: false,
        }
    }

    #[test]
    fn test_move_file_into_folder() {
        let temp_dir = tempdir().unwrap();
        let root = temp_dir.path();
        fs::create_dir(root.join("docs")).unwrap();
        fs::write(root.join("docs/notes.md"), "# notes").unwrap();
        let logger = MemoryLogger::new();
        let record = FileRecord {
            path: root.join("docs/notes.md"),
            extension: "md".to_string(),
        };

        let outcome = move_file(&record, root, "_Files", &DestinationNamer::new(), logger.as_ref()).unwrap();

        assert_eq!(
            outcome,
            MoveOutcome::Moved {
                destination: root.join("MD_Files/notes.md"),
                bytes: 7,
            }
        );
        assert!(!record.path.exists());
        assert_eq!(logger.messages(LogLevel::Debug).len(), 1);
    }

    #[test]
    fn test_move_file_already_sorted_is_noop() {
        let temp_dir = tempdir().unwrap();
        let root = temp_dir.path();
        fs::create_dir(root.join("TXT_Files")).unwrap();
        fs::write(root.join("TXT_Files/report.txt"), "r").unwrap();
        let record = FileRecord {
            path: root.join("TXT_Files/report.txt"),
            extension: "txt".to_string(),
        };

        let outcome = move_file(&record, root, "_Files", &DestinationNamer::new(), MemoryLogger::new().as_ref()).unwrap();

        assert_eq!(outcome, MoveOutcome::AlreadySorted);
        assert!(root.join("TXT_Files/report.txt").exists());
        assert!(!root.join("TXT_Files/report_1.txt").exists());
    }

    #[test]
    fn test_move_file_vanished_source() {
        let temp_dir = tempdir().unwrap();
        let root = temp_dir.path();
        let record = FileRecord {
            path: root.join("gone.txt"),
            extension: "txt".to_string(),
        };
        let namer = DestinationNamer::new();

        let result = move_file(&record, root, "_Files", &namer, MemoryLogger::new().as_ref());
        assert!(matches!(result, Err(SortError::MoveFailure { .. })));

        // 失败的名称被归还
        let claim = namer.claim(&root.join("TXT_Files"), std::ffi::OsStr::new("gone.txt")).unwrap();
        assert_eq!(claim.path(), root.join("TXT_Files/gone.txt"));
    }

    #[test]
    fn test_relocate_all_moves_every_file() {
        let temp_dir = tempdir().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("a/b")).unwrap();
        fs::write(root.join("one.txt"), "1").unwrap();
        fs::write(root.join("a/two.txt"), "22").unwrap();
        fs::write(root.join("a/b/three.csv"), "333").unwrap();
        fs::write(root.join("a/.hidden.txt"), "h").unwrap();

        let stats = relocate_all(
            root,
            &FileFilter::default(),
            &options(3),
            &DestinationNamer::new(),
            MemoryLogger::new(),
        )
        .unwrap();

        assert_eq!(stats.files_moved, 3);
        assert_eq!(stats.bytes_moved, 6);
        assert!(root.join("TXT_Files/one.txt").exists());
        assert!(root.join("TXT_Files/two.txt").exists());
        assert!(root.join("CSV_Files/three.csv").exists());
        assert!(root.join("a/.hidden.txt").exists());
    }

    #[test]
    fn test_relocate_all_reports_first_error_after_finishing() {
        let temp_dir = tempdir().unwrap();
        let root = temp_dir.path();
        // 没有扩展名的普通文件占用了 TXT_Files 这个名字
        fs::write(root.join("TXT_Files"), "blocker").unwrap();
        fs::write(root.join("a.txt"), "a").unwrap();
        fs::write(root.join("b.md"), "b").unwrap();
        let logger = MemoryLogger::new();

        let result = relocate_all(
            root,
            &FileFilter::default(),
            &options(2),
            &DestinationNamer::new(),
            logger.clone(),
        );

        assert!(matches!(result, Err(SortError::FolderCreationFailure { .. })));
        assert!(root.join("MD_Files/b.md").exists());
        assert!(root.join("a.txt").exists());
        assert_eq!(logger.messages(LogLevel::Warn).len(), 1);
    }
}
