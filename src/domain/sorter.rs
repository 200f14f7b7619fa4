use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::domain::cleanup::{remove_empty_dirs, CleanupStats};
use crate::domain::error::SortError;
use crate::domain::extension::{destination_folder_name, DEFAULT_FOLDER_SUFFIX, DEFAULT_HIDDEN_MARKER};
use crate::domain::namer::DestinationNamer;
use crate::domain::relocation::{relocate_all, RelocationOptions, RelocationStats};
use crate::domain::scanner::{count_hidden_files, scan_directory, FileFilter};
use crate::infrastructure::filesystem::{ensure_dir, is_writable};
use crate::infrastructure::LoggerTrait;

/// 整理器状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortState {
    Idle,
    PermissionChecked,
    ExtensionsCollected,
    FoldersCreated,
    Relocating,
    CleaningUp,
    Done,
}

/// 整理结果状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortStatus {
    Completed,
    /// 没有写入权限，什么都没有做
    SkippedNoPermission,
}

/// 一次整理的摘要
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortOutcome {
    pub status: SortStatus,
    pub extensions: BTreeSet<String>,
    pub folders_created: u64,
    pub files_moved: u64,
    pub already_sorted: u64,
    pub bytes_moved: u64,
    pub dirs_removed: u64,
    pub removal_failures: u64,
    pub hidden_files: u64,
}

impl SortOutcome {
    fn skipped() -> Self {
        Self {
            status: SortStatus::SkippedNoPermission,
            extensions: BTreeSet::new(),
            folders_created: 0,
            files_moved: 0,
            already_sorted: 0,
            bytes_moved: 0,
            dirs_removed: 0,
            removal_failures: 0,
            hidden_files: 0,
        }
    }
}

/// 整理参数
#[derive(Debug, Clone)]
pub struct SortOptions {
    pub hidden_marker: String,
    pub folder_suffix: String,
    pub excluded_dirs: Vec<String>,
    /// 工作线程数，0 表示每个CPU一个
    pub workers: usize,
    pub queue_capacity: usize,
    pub show_progress: bool,
}

impl Default for SortOptions {
    fn default() -> Self {
        Self {
            hidden_marker: DEFAULT_HIDDEN_MARKER.to_string(),
            folder_suffix: DEFAULT_FOLDER_SUFFIX.to_string(),
            excluded_dirs: Vec::new(),
            workers: 0,
            queue_capacity: 100,
            show_progress: false,
        }
    }
}

impl SortOptions {
    /// 实际使用的工作线程数
    pub fn worker_count(&self) -> usize {
        if self.workers == 0 {
            num_cpus::get()
        } else {
            self.workers
        }
    }
}

/// 文件整理器：按扩展名把目录树中的文件移动到 `<EXT>_Files` 文件夹
pub struct Sorter {
    root: PathBuf,
    options: SortOptions,
    filter: FileFilter,
    logger: Arc<dyn LoggerTrait>,
    state: SortState,
}

impl Sorter {
    pub fn new(root: impl Into<PathBuf>, options: SortOptions, logger: Arc<dyn LoggerTrait>) -> Self {
        let filter = FileFilter::new(options.hidden_marker.clone(), options.excluded_dirs.clone());
        Self {
            root: root.into(),
            options,
            filter,
            logger,
            state: SortState::Idle,
        }
    }

    pub fn state(&self) -> SortState {
        self.state
    }

    fn transition(&mut self, state: SortState) {
        self.logger.debug(&format!("状态: {:?} -> {:?}", self.state, state));
        self.state = state;
    }

    /// 执行完整的整理流程
    ///
    /// 没有写入权限时记录警告并返回 `SkippedNoPermission`，不视为错误。
    pub fn sort(&mut self) -> Result<SortOutcome, SortError> {
        self.logger.info(&format!("开始整理: {}", self.root.display()));

        if let Err(err) = self.check_write_permission() {
            if err.is_permission_denied() {
                self.logger.warn(&format!("需要更多权限才能整理 {} 文件夹", self.root.display()));
                self.transition(SortState::Done);
                return Ok(SortOutcome::skipped());
            }
            return Err(err);
        }
        self.transition(SortState::PermissionChecked);

        let extensions = self.collect_extensions();
        self.transition(SortState::ExtensionsCollected);

        let folders_created = self.create_folders(&extensions)?;
        self.transition(SortState::FoldersCreated);

        self.transition(SortState::Relocating);
        let relocation = self.relocate()?;

        self.transition(SortState::CleaningUp);
        let cleanup = self.remove_empty_dirs();

        let hidden_files = self.warn_hidden_files();
        self.transition(SortState::Done);
        self.logger.info("整理完成");

        Ok(self.outcome(extensions, folders_created, relocation, cleanup, hidden_files))
    }

    fn outcome(
        &self,
        extensions: BTreeSet<String>,
        folders_created: u64,
        relocation: RelocationStats,
        cleanup: CleanupStats,
        hidden_files: u64,
    ) -> SortOutcome {
        SortOutcome {
            status: SortStatus::Completed,
            extensions,
            folders_created,
            files_moved: relocation.files_moved,
            already_sorted: relocation.already_sorted,
            bytes_moved: relocation.bytes_moved,
            dirs_removed: cleanup.dirs_removed,
            removal_failures: cleanup.removal_failures,
            hidden_files,
        }
    }

    /// 检查目标目录存在且可写
    pub fn check_write_permission(&self) -> Result<(), SortError> {
        let metadata = std::fs::metadata(&self.root).map_err(|err| SortError::InvalidRoot {
            path: self.root.clone(),
            reason: err.to_string(),
        })?;
        if !metadata.is_dir() {
            return Err(SortError::InvalidRoot {
                path: self.root.clone(),
                reason: "不是目录".to_string(),
            });
        }

        match is_writable(&self.root) {
            Ok(true) => Ok(()),
            Ok(false) => Err(SortError::PermissionDenied { path: self.root.clone() }),
            Err(err) => Err(SortError::InvalidRoot {
                path: self.root.clone(),
                reason: err.to_string(),
            }),
        }
    }

    /// 收集树中所有可整理文件的扩展名
    pub fn collect_extensions(&self) -> BTreeSet<String> {
        let extensions = Mutex::new(BTreeSet::new());
        let total = scan_directory(
            &self.root,
            &self.filter,
            self.options.worker_count(),
            Arc::clone(&self.logger),
            |record| {
                extensions
                    .lock()
                    .unwrap_or_else(|p| p.into_inner())
                    .insert(record.extension);
            },
        );

        let extensions = extensions.into_inner().unwrap_or_else(|p| p.into_inner());
        self.logger.debug(&format!("发现 {} 个文件, {} 种扩展名", total, extensions.len()));
        extensions
    }

    /// 为每个扩展名创建目标文件夹，返回新建的数量
    pub fn create_folders(&self, extensions: &BTreeSet<String>) -> Result<u64, SortError> {
        let folder_names: BTreeSet<String> = extensions
            .iter()
            .map(|ext| destination_folder_name(ext, &self.options.folder_suffix))
            .collect();

        let mut created = 0;
        for name in folder_names {
            let folder = self.root.join(&name);
            let existed = folder.is_dir();
            ensure_dir(&folder).map_err(|source| SortError::FolderCreationFailure {
                path: folder.clone(),
                source,
            })?;
            if !existed {
                created += 1;
                self.logger.debug(&format!("已创建文件夹: {}", name));
            }
        }

        Ok(created)
    }

    /// 并发移动所有文件
    pub fn relocate(&self) -> Result<RelocationStats, SortError> {
        let options = RelocationOptions {
            folder_suffix: self.options.folder_suffix.clone(),
            workers: self.options.worker_count(),
            queue_capacity: self.options.queue_capacity,
            show_progress: self.options.show_progress,
        };

        relocate_all(
            &self.root,
            &self.filter,
            &options,
            &DestinationNamer::new(),
            Arc::clone(&self.logger),
        )
    }

    /// 删除空目录
    pub fn remove_empty_dirs(&self) -> CleanupStats {
        remove_empty_dirs(&self.root, &self.filter, self.logger.as_ref())
    }

    /// 检查是否还有隐藏文件，有则记录警告
    pub fn warn_hidden_files(&self) -> u64 {
        let hidden = count_hidden_files(&self.root, &self.filter, self.logger.as_ref());
        if hidden > 0 {
            self.logger.warn(&format!("文件夹中有 {} 个隐藏文件，未整理", hidden));
        }
        hidden
    }
}
