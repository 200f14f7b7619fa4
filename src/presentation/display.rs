use std::io::{self, Write};
use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::Result;
use humansize::{format_size, BINARY};

use crate::domain::{SortOutcome, SortStatus};

/// 格式化持续时间
pub fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let hours = total_secs / 3600;
    let mins = (total_secs % 3600) / 60;
    let secs = total_secs % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, mins, secs)
    } else if mins > 0 {
        format!("{}m {}s", mins, secs)
    } else {
        format!("{}.{:03}s", secs, duration.subsec_millis())
    }
}

/// 整理摘要
pub struct SortSummary {
    pub start_time: Instant,
}

impl SortSummary {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
        }
    }

    /// 把摘要写入任意输出
    pub fn write_to<W: Write>(&self, out: &mut W, root: &Path, outcome: &SortOutcome) -> Result<()> {
        if outcome.status == SortStatus::SkippedNoPermission {
            writeln!(out, "\n需要更多权限才能整理 {} 文件夹，未做任何改动。", root.display())?;
            return Ok(());
        }

        let extensions: Vec<&str> = outcome.extensions.iter().map(String::as_str).collect();

        writeln!(out, "\n整理摘要:")?;
        writeln!(out, "----------------------------")?;
        writeln!(out, "总用时: {}", format_duration(self.start_time.elapsed()))?;
        writeln!(out, "扩展名: {}", extensions.join(", "))?;
        writeln!(out, "新建文件夹: {}", outcome.folders_created)?;
        writeln!(out, "移动文件: {} ({})", outcome.files_moved, format_size(outcome.bytes_moved, BINARY))?;
        writeln!(out, "已在目标位置: {}", outcome.already_sorted)?;
        writeln!(out, "删除空目录: {}", outcome.dirs_removed)?;
        if outcome.removal_failures > 0 {
            writeln!(out, "删除失败: {}", outcome.removal_failures)?;
        }
        if outcome.hidden_files > 0 {
            writeln!(out, "隐藏文件(未整理): {}", outcome.hidden_files)?;
        }

        Ok(())
    }

    pub fn print(&self, root: &Path, outcome: &SortOutcome) -> Result<()> {
        let mut stdout = io::stdout().lock();
        self.write_to(&mut stdout, root, outcome)
    }
}

impl Default for SortSummary {
    fn default() -> Self {
        Self::new()
    }
}
