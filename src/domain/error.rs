use std::io;
use std::path::PathBuf;

/// 整理过程中的错误类型
#[derive(Debug, thiserror::Error)]
pub enum SortError {
    /// 目标目录不可写，由整理器自行处理，不会返回给调用者
    #[error("没有写入权限: {}", path.display())]
    PermissionDenied { path: PathBuf },

    #[error("无效的目标目录 {}: {reason}", path.display())]
    InvalidRoot { path: PathBuf, reason: String },

    #[error("移动文件失败 {} -> {}: {source}", from.display(), to.display())]
    MoveFailure {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("创建文件夹失败 {}: {source}", path.display())]
    FolderCreationFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// 非致命错误，清理阶段记录后跳过
    #[error("删除目录失败 {}: {source}", path.display())]
    DirectoryRemovalFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl SortError {
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, SortError::PermissionDenied { .. })
    }
}
