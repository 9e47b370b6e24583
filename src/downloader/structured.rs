// src/downloader/structured.rs

use crate::{
    constants,
    error::AppResult,
    models::{DownloadStatus, api::File},
    remote::CanvasApi,
    utils,
};
use log::{debug, info, warn};
use std::{path::PathBuf, sync::Arc};

/// 按 "课程/模块/页面" 的目录结构把文件保存到存储根目录下
#[derive(Clone)]
pub struct StructuredDownloader {
    root: PathBuf,
    api: Arc<dyn CanvasApi>,
}

impl StructuredDownloader {
    pub fn new(root: PathBuf, api: Arc<dyn CanvasApi>) -> Self {
        Self { root, api }
    }

    /// 清理上次被强制中断时留在存储目录中的临时文件
    pub fn remove_partial_downloads(&self) -> AppResult<usize> {
        let removed = utils::remove_partial_downloads(&self.root)?;
        if removed > 0 {
            warn!("已清理上次中断残留的 {} 个临时文件", removed);
        }
        Ok(removed)
    }

    /// 文件最终的本地路径。每个目录名和文件名都会先清理非法字符。
    pub fn destination(&self, file: &File, segments: &[&str]) -> AppResult<PathBuf> {
        let relative: PathBuf = segments
            .iter()
            .map(|segment| utils::sanitize_filename(segment))
            .chain(std::iter::once(utils::sanitize_filename(&file.filename)))
            .collect();
        utils::create_dir(&self.root)?;
        utils::secure_join_path(&self.root, &relative)
    }

    /// 本地已存在且未强制时直接跳过，不发起任何网络请求。
    /// 下载先写入同目录下的临时文件，完成后再改名，失败时不会留下半截文件。
    pub async fn download_structured(
        &self,
        file: &File,
        segments: &[&str],
        force: bool,
    ) -> AppResult<DownloadStatus> {
        let dest = self.destination(file, segments)?;
        if dest.exists() && !force {
            debug!("文件已存在，跳过: {}", dest.display());
            return Ok(DownloadStatus::Skipped);
        }

        // destination 的结果至少包含文件名，父目录一定存在
        let dir = dest.parent().unwrap_or(&self.root);
        utils::create_dir(dir)?;

        let mut temp = tempfile::Builder::new()
            .prefix(constants::TEMP_FILE_PREFIX)
            .suffix(constants::TEMP_FILE_SUFFIX)
            .tempfile_in(dir)?;

        match self.api.download(file, temp.as_file_mut()).await {
            Ok(bytes) => {
                temp.persist(&dest)?;
                info!("已下载 '{}' ({} 字节) -> {}", file.filename, bytes, dest.display());
                Ok(DownloadStatus::Downloaded)
            }
            Err(e) if e.is_missing_resource() => {
                warn!("文件 '{}' ({}) 已不存在或无权访问: {}", file.filename, file.id, e);
                Ok(DownloadStatus::Unavailable)
            }
            Err(e) => Err(e),
        }
    }
}
