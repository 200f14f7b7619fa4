use std::collections::{HashMap, HashSet};
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::domain::error::SortError;
use crate::domain::extension::numbered_name;
use crate::infrastructure::filesystem::{ensure_dir, is_occupied};

/// 单个目标文件夹的状态：正在移动中、尚未落盘的文件名
#[derive(Default)]
struct FolderSlot {
    ready: bool,
    claimed: HashSet<OsString>,
}

/// 目标文件名分配器
///
/// 同一文件夹内的"检查是否存在 + 占用名称"在文件夹锁内完成，
/// 实际的重命名在锁外进行。不同文件夹之间互不阻塞。
#[derive(Default)]
pub struct DestinationNamer {
    folders: Mutex<HashMap<PathBuf, Arc<Mutex<FolderSlot>>>>,
}

/// 已占用的目标路径，释放时从占用集合中移除
pub struct Claim {
    slot: Arc<Mutex<FolderSlot>>,
    name: OsString,
    path: PathBuf,
}

impl Claim {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for Claim {
    fn drop(&mut self) {
        // 重命名完成后文件已在磁盘上，失败时名称需要归还
        lock(&self.slot).claimed.remove(&self.name);
    }
}

fn lock(slot: &Mutex<FolderSlot>) -> MutexGuard<'_, FolderSlot> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl DestinationNamer {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, folder: &Path) -> Arc<Mutex<FolderSlot>> {
        let mut folders = self.folders.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(folders.entry(folder.to_path_buf()).or_default())
    }

    /// 为文件在目标文件夹中分配一个未被占用的名称
    ///
    /// 文件夹不存在时会先创建（整理开始后才出现的新扩展名）。
    pub fn claim(&self, folder: &Path, file_name: &OsStr) -> Result<Claim, SortError> {
        let slot = self.slot(folder);
        let mut state = lock(&slot);

        if !state.ready {
            ensure_dir(folder).map_err(|source| SortError::FolderCreationFailure {
                path: folder.to_path_buf(),
                source,
            })?;
            state.ready = true;
        }

        let mut candidate = file_name.to_os_string();
        let mut suffix = 1;
        while state.claimed.contains(&candidate) || is_occupied(&folder.join(&candidate)) {
            candidate = numbered_name(file_name, suffix);
            suffix += 1;
        }

        state.claimed.insert(candidate.clone());
        drop(state);

        Ok(Claim {
            path: folder.join(&candidate),
            name: candidate,
            slot,
        })
    }
}
