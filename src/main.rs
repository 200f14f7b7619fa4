use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use file_sorter::infrastructure::init_tracing;
use file_sorter::{Config, Logger, LoggerTrait, MultiLogger, SortSummary, Sorter, TracingLogger};

/// 按扩展名整理文件夹的命令行工具
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// 要整理的目录路径，不提供时交互输入
    path: Option<PathBuf>,

    /// 配置文件路径 (默认使用程序同级目录下的 file_sorter.toml)
    #[clap(short, long)]
    config: Option<PathBuf>,

    /// 工作线程数 (默认每个CPU一个)
    #[clap(short, long)]
    workers: Option<usize>,

    /// 日志级别 (debug, info, warn)
    #[clap(long)]
    log_level: Option<String>,

    /// 同时把日志写入当前目录下的日志文件
    #[clap(long)]
    log: bool,

    /// 不显示进度
    #[clap(long)]
    no_progress: bool,
}

/// 交互式输入目录路径
fn prompt_for_path() -> Result<PathBuf> {
    print!(">>> 输入文件夹路径: ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line).context("无法读取输入")?;

    let path = line.trim();
    if path.is_empty() {
        anyhow::bail!("没有输入文件夹路径");
    }
    Ok(PathBuf::from(path))
}

/// 加载配置并应用命令行参数
fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load_from_file(path)?,
        None => match Config::default_config_path().and_then(|path| Config::load_or_create(&path)) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("无法加载默认配置，使用内置配置: {:#}", err);
                Config::default()
            }
        },
    };

    if let Some(workers) = args.workers {
        config.performance.workers = workers;
    }
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }
    if args.log {
        config.logging.log_to_file = true;
    }
    if args.no_progress {
        config.display.show_progress = false;
    }

    config.validate().context("配置无效")?;
    Ok(config)
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;

    // 初始化日志
    let level = config.log_level()?;
    init_tracing(level)?;

    let file_logger = Arc::new(Logger::new(config.logging.log_to_file, level)?);
    let logger: Arc<dyn LoggerTrait> = Arc::new(
        MultiLogger::new()
            .with(Arc::new(TracingLogger))
            .with(file_logger.clone()),
    );

    let root = match args.path {
        Some(path) => path,
        None => prompt_for_path()?,
    };

    let summary = SortSummary::new();
    let mut sorter = Sorter::new(root.clone(), config.sort_options(), logger);
    let outcome = sorter
        .sort()
        .with_context(|| format!("整理 {} 失败", root.display()))?;

    summary.print(&root, &outcome)?;

    if config.logging.log_to_file {
        file_logger.finalize(&outcome, summary.start_time.elapsed())?;
        println!("完整日志已保存到: {}", file_logger.log_path().display());
    }

    Ok(())
}
