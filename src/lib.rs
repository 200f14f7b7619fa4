// 三层架构模块
pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod presentation;

// 重新导出主要类型
pub use domain::{FileFilter, SortError, SortOptions, SortOutcome, SortState, SortStatus, Sorter};
pub use application::Config;
pub use infrastructure::{LogLevel, Logger, LoggerTrait, MultiLogger, TracingLogger};
pub use presentation::SortSummary;
