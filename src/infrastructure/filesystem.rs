use std::fs;
use std::io;
use std::path::Path;

/// 检查当前进程能否在目录中创建条目
///
/// 在目录中创建一个匿名临时文件并立即丢弃。权限不足或只读文件系统返回 `Ok(false)`，
/// 其他I/O错误原样返回。
pub fn is_writable(path: &Path) -> io::Result<bool> {
    match tempfile::tempfile_in(path) {
        Ok(_) => Ok(true),
        Err(err) if is_access_denied(&err) => Ok(false),
        Err(err) => Err(err),
    }
}

fn is_access_denied(err: &io::Error) -> bool {
    // EROFS
    err.kind() == io::ErrorKind::PermissionDenied || (cfg!(unix) && err.raw_os_error() == Some(30))
}

/// 确保目录存在；已存在时不报错，被普通文件占用时报错
pub fn ensure_dir(path: &Path) -> io::Result<()> {
    match fs::create_dir(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
            if fs::metadata(path)?.is_dir() {
                Ok(())
            } else {
                Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("路径已被非目录占用: {}", path.display()),
                ))
            }
        }
        Err(err) => Err(err),
    }
}

/// 路径上是否已有任何条目（包括失效的符号链接）
pub fn is_occupied(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// 目录当前是否为空
pub fn is_dir_empty(path: &Path) -> io::Result<bool> {
    Ok(fs::read_dir(path)?.next().is_none())
}

/// 移动文件，返回移动的字节数
///
/// 同一卷内使用原子重命名；跨卷时复制、校验大小后删除源文件。
pub fn move_file(from: &Path, to: &Path) -> io::Result<u64> {
    let size = fs::symlink_metadata(from)?.len();

    match fs::rename(from, to) {
        Ok(()) => Ok(size),
        Err(err) if is_cross_device(&err) => copy_then_remove(from, to, size),
        Err(err) => Err(err),
    }
}

/// 复制到目标、校验大小后删除源文件；任何一步失败都会删掉目标上的副本
fn copy_then_remove(from: &Path, to: &Path, size: u64) -> io::Result<u64> {
    let copied = fs::copy(from, to).and_then(|copied| verify_copy(to, size, copied));
    if let Err(err) = copied {
        return Err(discard_copy(to, err));
    }

    if let Err(err) = fs::remove_file(from) {
        return Err(discard_copy(to, err));
    }
    Ok(size)
}

fn verify_copy(to: &Path, expected: u64, copied: u64) -> io::Result<()> {
    let written = fs::metadata(to)?.len();
    if copied != expected || written != expected {
        return Err(io::Error::new(
            io::ErrorKind::Other,
            format!("跨卷复制校验失败: 期望 {} 字节, 实际 {} 字节", expected, written),
        ));
    }
    Ok(())
}

/// 删除不完整的副本；删除也失败时把两个错误合并
fn discard_copy(to: &Path, err: io::Error) -> io::Error {
    match fs::remove_file(to) {
        Ok(()) => err,
        Err(cleanup) if cleanup.kind() == io::ErrorKind::NotFound => err,
        Err(cleanup) => io::Error::new(
            err.kind(),
            format!("{}; 无法删除副本 {}: {}", err, to.display(), cleanup),
        ),
    }
}

#[cfg(unix)]
fn is_cross_device(err: &io::Error) -> bool {
    // EXDEV
    err.raw_os_error() == Some(18)
}

#[cfg(windows)]
fn is_cross_device(err: &io::Error) -> bool {
    // ERROR_NOT_SAME_DEVICE
    err.raw_os_error() == Some(17)
}

#[cfg(not(any(unix, windows)))]
fn is_cross_device(_err: &io::Error) -> bool {
    false
}
