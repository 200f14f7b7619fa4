use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::extension::{DEFAULT_FOLDER_SUFFIX, DEFAULT_HIDDEN_MARKER};
use crate::domain::SortOptions;
use crate::infrastructure::LogLevel;

/// 应用程序配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// 整理规则配置
    pub sort: SortConfig,
    /// 性能相关配置
    pub performance: PerformanceConfig,
    /// 日志配置
    pub logging: LoggingConfig,
    /// 显示相关配置
    pub display: DisplayConfig,
}

/// 整理规则配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SortConfig {
    /// 隐藏文件前缀，这类文件不会被移动
    pub hidden_marker: String,
    /// 目标文件夹后缀，例如 TXT_Files
    pub folder_suffix: String,
    /// 不进入的目录名
    #[serde(default)]
    pub excluded_dirs: Vec<String>,
}

/// 性能配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceConfig {
    /// 工作线程数，0 表示每个CPU一个
    pub workers: usize,
    /// 待移动文件队列容量
    pub queue_capacity: usize,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// debug / info / warn
    pub level: String,
    /// 是否同时写入日志文件
    pub log_to_file: bool,
}

/// 显示配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// 是否显示进度
    pub show_progress: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sort: SortConfig {
                hidden_marker: DEFAULT_HIDDEN_MARKER.to_string(),
                folder_suffix: DEFAULT_FOLDER_SUFFIX.to_string(),
                excluded_dirs: vec![],
            },
            performance: PerformanceConfig {
                workers: 0,
                queue_capacity: 100,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                log_to_file: false,
            },
            display: DisplayConfig {
                show_progress: true,
            },
        }
    }
}

impl Config {
    /// 从配置文件加载配置，如果文件不存在则创建默认配置文件
    pub fn load_or_create(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            Self::load_from_file(config_path)
        } else {
            let config = Self::default();
            config.save_to_file(config_path)?;
            println!("已创建默认配置文件: {}", config_path.display());
            Ok(config)
        }
    }

    /// 从文件加载配置
    pub fn load_from_file(config_path: &Path) -> Result<Self> {
        let content = fs::read_to_string(config_path)
            .with_context(|| format!("无法读取配置文件: {}", config_path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("无法解析配置文件: {}", config_path.display()))?;

        Ok(config)
    }

    /// 保存配置到文件
    pub fn save_to_file(&self, config_path: &Path) -> Result<()> {
        // 确保目录存在
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("无法创建配置目录: {}", parent.display()))?;
        }

        let content = toml::to_string_pretty(self).context("无法序列化配置")?;

        fs::write(config_path, content)
            .with_context(|| format!("无法写入配置文件: {}", config_path.display()))?;

        Ok(())
    }

    /// 获取配置文件的默认路径（程序所在目录）
    pub fn default_config_path() -> Result<PathBuf> {
        let exe_path = std::env::current_exe().context("无法获取程序路径")?;

        let exe_dir = exe_path.parent().context("无法获取程序目录")?;

        Ok(exe_dir.join("file_sorter.toml"))
    }

    /// 验证配置的有效性
    pub fn validate(&self) -> Result<()> {
        if self.sort.hidden_marker.is_empty() {
            anyhow::bail!("hidden_marker 不能为空");
        }

        if self.sort.folder_suffix.is_empty() {
            anyhow::bail!("folder_suffix 不能为空");
        }

        if self.sort.folder_suffix.contains(|c: char| c == '/' || c == '\\') {
            anyhow::bail!("folder_suffix 不能包含路径分隔符");
        }

        if self.performance.workers > 256 {
            anyhow::bail!("workers 不能超过 256");
        }

        if self.performance.queue_capacity == 0 || self.performance.queue_capacity > 100_000 {
            anyhow::bail!("queue_capacity 必须在 1-100000 之间");
        }

        self.log_level()?;

        Ok(())
    }

    /// 解析日志级别
    pub fn log_level(&self) -> Result<LogLevel> {
        self.logging.level.parse()
    }

    /// 转换为整理参数
    pub fn sort_options(&self) -> SortOptions {
        SortOptions {
            hidden_marker: self.sort.hidden_marker.clone(),
            folder_suffix: self.sort.folder_suffix.clone(),
            excluded_dirs: self.sort.excluded_dirs.clone(),
            workers: self.performance.workers,
            queue_capacity: self.performance.queue_capacity,
            show_progress: self.display.show_progress,
        }
    }
}
