// src/downloader/mod.rs

mod engine;
mod structured;

pub use engine::{SyncEngine, SyncState};
pub use structured::StructuredDownloader;

use crate::{models::DownloadStatus, symbols, ui};
use colored::*;
use log::{error, info, warn};
use std::collections::HashMap;

/// 一次同步的统计与明细
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    pub downloaded: usize,
    pub skipped: usize,
    pub unavailable: usize,
    pub failed: usize,
    downloaded_files: Vec<String>,
    unavailable_items: Vec<(String, String)>,
    failed_items: Vec<(String, String)>,
}

impl SyncStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total(&self) -> usize {
        self.downloaded + self.skipped + self.unavailable + self.failed
    }

    pub fn record(&mut self, name: &str, status: DownloadStatus) {
        match status {
            DownloadStatus::Downloaded => {
                self.downloaded += 1;
                self.downloaded_files.push(name.to_string());
            }
            DownloadStatus::Skipped => self.skipped += 1,
            DownloadStatus::Unavailable => {
                let (_, _, msg) = status.get_display_info();
                self.record_unavailable(name, msg);
            }
        }
    }

    pub fn record_unavailable(&mut self, name: &str, reason: &str) {
        warn!("'{}' 不可用，原因: {}", name, reason);
        self.unavailable += 1;
        self.unavailable_items
            .push((name.to_string(), reason.to_string()));
    }

    pub fn record_failure(&mut self, name: &str, reason: &str) {
        error!("'{}' 处理失败，原因: {}", name, reason);
        self.failed += 1;
        self.failed_items.push((name.to_string(), reason.to_string()));
    }

    pub fn print_report(&self) {
        info!(
            "同步报告: Total={}, Downloaded={}, Skipped={}, Unavailable={}, Failed={}",
            self.total(),
            self.downloaded,
            self.skipped,
            self.unavailable,
            self.failed
        );

        if !self.downloaded_files.is_empty() {
            ui::print_sub_header("新下载的文件");
            for name in &self.downloaded_files {
                println!("  {} {}", *symbols::OK, name);
            }
        }
        if !self.unavailable_items.is_empty() || !self.failed_items.is_empty() {
            ui::print_sub_header("同步详情报告");
            if !self.unavailable_items.is_empty() {
                println!("\n{} 不可用的资源 ({}个):", *symbols::WARN, self.unavailable);
                print_grouped_report(&self.unavailable_items, |s| s.yellow());
            }
            if !self.failed_items.is_empty() {
                println!("\n{} 失败的资源 ({}个):", *symbols::ERROR, self.failed);
                print_grouped_report(&self.failed_items, |s| s.red());
            }
        }

        ui::print_sub_header("同步总结");
        if self.downloaded == 0 && self.unavailable == 0 && self.failed == 0 {
            println!("{} 所有文件均已是最新 ({} 个已存在)。", *symbols::OK, self.skipped);
        } else {
            let summary = format!(
                "{} | {} | {} | {}",
                format!("新文件: {}", self.downloaded).green(),
                format!("已存在: {}", self.skipped).dimmed(),
                format!("不可用: {}", self.unavailable).yellow(),
                format!("失败: {}", self.failed).red()
            );
            println!("{}", summary);
        }
    }
}

fn print_grouped_report(
    items: &[(String, String)],
    color_fn: fn(ColoredString) -> ColoredString,
) {
    let mut grouped: HashMap<&str, Vec<&str>> = HashMap::new();
    for (name, reason) in items {
        grouped.entry(reason.as_str()).or_default().push(name.as_str());
    }
    let mut sorted_reasons: Vec<_> = grouped.keys().copied().collect();
    sorted_reasons.sort_unstable();
    for reason in sorted_reasons {
        println!("  - {}", color_fn(format!("原因: {}", reason).into()));
        if let Some(names) = grouped.get(reason) {
            for name in names {
                println!("    - {}", name);
            }
        }
    }
}
