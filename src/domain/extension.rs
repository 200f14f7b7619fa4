use std::ffi::{OsStr, OsString};
use std::path::Path;

/// 默认的隐藏文件前缀
pub const DEFAULT_HIDDEN_MARKER: &str = ".";

/// 默认的目标文件夹后缀
pub const DEFAULT_FOLDER_SUFFIX: &str = "_Files";

/// 提取文件扩展名（最后一个 '.' 之后的部分，保留大小写）
///
/// 没有扩展名、扩展名为空或不是有效UTF-8时返回 `None`，这类文件不归类。
pub fn extension_of(path: &Path) -> Option<String> {
    let ext = path.extension()?.to_str()?;
    if ext.is_empty() {
        None
    } else {
        Some(ext.to_string())
    }
}

/// 检查文件名是否以隐藏标记开头
pub fn is_hidden(file_name: &OsStr, marker: &str) -> bool {
    !marker.is_empty() && file_name.to_string_lossy().starts_with(marker)
}

/// 扩展名对应的目标文件夹名，例如 `txt` -> `TXT_Files`
pub fn destination_folder_name(extension: &str, suffix: &str) -> String {
    format!("{}{}", extension.to_uppercase(), suffix)
}

/// 生成带编号的文件名: `report.txt` + 1 -> `report_1.txt`
pub fn numbered_name(file_name: &OsStr, n: u32) -> OsString {
    let path = Path::new(file_name);
    let mut name = OsString::from(path.file_stem().unwrap_or(file_name));
    name.push(format!("_{}", n));
    if let Some(ext) = path.extension() {
        name.push(".");
        name.push(ext);
    }
    name
}
