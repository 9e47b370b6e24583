// src/models/mod.rs

pub mod api;

use crate::symbols;
use colored::{ColoredString, Colorize};

/// 单个文件的同步结果
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum DownloadStatus {
    /// 新下载 (或强制重新下载) 成功
    Downloaded,
    /// 本地已存在，未发起网络请求
    Skipped,
    /// 远端文件已删除或无权访问
    Unavailable,
}

impl DownloadStatus {
    /// 是否产生了新文件
    pub fn is_new(self) -> bool {
        self == DownloadStatus::Downloaded
    }

    pub fn get_display_info(
        &self,
    ) -> (
        &'static ColoredString,
        fn(ColoredString) -> ColoredString,
        &'static str,
    ) {
        match self {
            DownloadStatus::Downloaded => (&symbols::OK, |s| s.green(), "下载成功"),
            DownloadStatus::Skipped => (&symbols::SKIP, |s| s.dimmed(), "文件已存在，跳过"),
            DownloadStatus::Unavailable => {
                (&symbols::WARN, |s| s.yellow(), "文件不存在或无权访问")
            }
        }
    }
}

/// 账号可见课程的简要信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseInfo {
    pub name: String,
    pub id: u64,
}
