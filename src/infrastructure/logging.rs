use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;
use tracing_subscriber::EnvFilter;

use crate::domain::SortOutcome;

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "debug" | "trace" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            other => anyhow::bail!("未知的日志级别: {}", other),
        }
    }
}

/// 日志记录器trait
///
/// 整理器通过构造参数接收此trait对象，库内部不使用全局日志状态。
/// `debug`/`info`/`warn` 会吞掉写入错误，日志失败不会中断整理。
pub trait LoggerTrait: Send + Sync {
    fn is_enabled(&self, level: LogLevel) -> bool;
    fn log(&self, level: LogLevel, message: &str) -> Result<()>;

    fn debug(&self, message: &str) {
        if self.is_enabled(LogLevel::Debug) {
            let _ = self.log(LogLevel::Debug, message);
        }
    }

    fn info(&self, message: &str) {
        if self.is_enabled(LogLevel::Info) {
            let _ = self.log(LogLevel::Info, message);
        }
    }

    fn warn(&self, message: &str) {
        if self.is_enabled(LogLevel::Warn) {
            let _ = self.log(LogLevel::Warn, message);
        }
    }
}

/// 文件日志记录器
pub struct Logger {
    log_file: Arc<Mutex<Option<File>>>,
    log_path: PathBuf,
    level: LogLevel,
}

impl Logger {
    /// 创建新的日志记录器，日志文件保存在当前目录
    pub fn new(enabled: bool, level: LogLevel) -> Result<Self> {
        if !enabled {
            return Ok(Self {
                log_file: Arc::new(Mutex::new(None)),
                log_path: PathBuf::new(),
                level,
            });
        }

        // 获取当前时间作为文件名的一部分
        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let log_path = PathBuf::from(format!("file_sorter_{}.log", timestamp));

        Self::with_path(&log_path, level)
    }

    /// 使用指定路径创建日志记录器
    pub fn with_path(log_path: &Path, level: LogLevel) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)
            .with_context(|| format!("无法创建日志文件: {}", log_path.display()))?;

        // 写入UTF-8 BOM以确保文件被正确识别为UTF-8
        let mut header = file.try_clone()?;
        header.write_all(&[0xEF, 0xBB, 0xBF])?;

        writeln!(header, "# FileSorter 日志")?;
        writeln!(header, "# 开始时间: {}", Local::now().format("%Y-%m-%d %H:%M:%S"))?;
        writeln!(header, "# --------------------------------------------")?;

        Ok(Self {
            log_file: Arc::new(Mutex::new(Some(file))),
            log_path: log_path.to_path_buf(),
            level,
        })
    }

    /// 获取日志文件路径
    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// 写入整理摘要并结束日志
    pub fn finalize(&self, outcome: &SortOutcome, duration: Duration) -> Result<()> {
        if let Ok(mut file_guard) = self.log_file.lock() {
            if let Some(ref mut file) = *file_guard {
                writeln!(file, "# --------------------------------------------")?;
                writeln!(file, "# 结束时间: {}", Local::now().format("%Y-%m-%d %H:%M:%S"))?;
                writeln!(file, "# 总用时: {:.3}秒", duration.as_secs_f64())?;
                writeln!(file, "# 扩展名数量: {}", outcome.extensions.len())?;
                writeln!(file, "# 移动文件数: {}", outcome.files_moved)?;
                writeln!(file, "# 已在目标位置: {}", outcome.already_sorted)?;
                writeln!(file, "# 删除空目录数: {}", outcome.dirs_removed)?;
                writeln!(file, "# ============================================")?;
                file.flush()?;
            }
        }

        Ok(())
    }
}

impl LoggerTrait for Logger {
    fn is_enabled(&self, level: LogLevel) -> bool {
        level >= self.level && !self.log_path.as_os_str().is_empty()
    }

    fn log(&self, level: LogLevel, message: &str) -> Result<()> {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");

        if let Ok(mut file_guard) = self.log_file.lock() {
            if let Some(ref mut file) = *file_guard {
                writeln!(file, "[{}] {:<5} {}", timestamp, level, message)?;
                file.flush()?;
            }
        }

        Ok(())
    }
}

/// 转发到 `tracing` 的日志记录器，过滤交给订阅者
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl LoggerTrait for TracingLogger {
    fn is_enabled(&self, _level: LogLevel) -> bool {
        true
    }

    fn log(&self, level: LogLevel, message: &str) -> Result<()> {
        match level {
            LogLevel::Debug => tracing::debug!("{}", message),
            LogLevel::Info => tracing::info!("{}", message),
            LogLevel::Warn => tracing::warn!("{}", message),
        }
        Ok(())
    }
}

/// 同时写入多个日志目标
#[derive(Default)]
pub struct MultiLogger {
    sinks: Vec<Arc<dyn LoggerTrait>>,
}

impl MultiLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn LoggerTrait>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl LoggerTrait for MultiLogger {
    fn is_enabled(&self, level: LogLevel) -> bool {
        self.sinks.iter().any(|sink| sink.is_enabled(level))
    }

    fn log(&self, level: LogLevel, message: &str) -> Result<()> {
        for sink in &self.sinks {
            if sink.is_enabled(level) {
                sink.log(level, message)?;
            }
        }
        Ok(())
    }
}

/// 初始化控制台结构化日志
pub fn init_tracing(level: LogLevel) -> Result<()> {
    let directive = match level {
        LogLevel::Debug => "debug",
        LogLevel::Info => "info",
        LogLevel::Warn => "warn",
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(directive.parse()?)
        .add_directive("ignore=warn".parse()?);

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init()
        .map_err(|err| anyhow::anyhow!("无法初始化日志: {}", err))?;

    Ok(())
}


#[cfg(test)]
mod tests {
    use super::testing::MemoryLogger;
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_log_level_parsing() {
        assert_eq!("debug".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert_eq!("INFO".parse::<LogLevel>().unwrap(), LogLevel::Info);
        assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert!("verbose".parse::<LogLevel>().is_err());
        assert!(LogLevel::Debug < LogLevel::Warn);
    }

    #[test]
    fn test_disabled_logger() {
        let logger = Logger::new(false, LogLevel::Debug).unwrap();
        assert!(!logger.is_enabled(LogLevel::Warn));
        assert!(logger.log(LogLevel::Info, "ignored").is_ok());
    }

    #[test]
    fn test_file_logger_respects_level() {
        let temp_dir = tempdir().unwrap();
        let log_path = temp_dir.path().join("sort.log");
        let logger = Logger::with_path(&log_path, LogLevel::Info).unwrap();

        logger.debug("debug line");
        logger.info("info line");
        logger.warn("warn line");

        let content = std::fs::read_to_string(&log_path).unwrap();
        assert!(!content.contains("debug line"));
        assert!(content.contains("INFO  info line"));
        assert!(content.contains("WARN  warn line"));
    }

    #[test]
    fn test_multi_logger_fans_out() {
        let first = MemoryLogger::new();
        let second = MemoryLogger::new();
        let logger = MultiLogger::new()
            .with(first.clone())
            .with(second.clone());

        logger.warn("hidden files");

        assert_eq!(first.messages(LogLevel::Warn), vec!["hidden files".to_string()]);
        assert_eq!(second.messages(LogLevel::Warn), vec!["hidden files".to_string()]);
    }
}
