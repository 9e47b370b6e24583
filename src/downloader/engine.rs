// src/downloader/engine.rs

use super::{StructuredDownloader, SyncStats};
use crate::{
    error::{AppError, AppResult},
    models::{DownloadStatus, api::File},
    remote::RemoteSession,
    scanner::{CourseScan, ModuleScan, Scanner},
};
use futures::stream::{BoxStream, StreamExt};
use indicatif::ProgressBar;
use log::{debug, info, warn};
use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

/// 同步过程所处的阶段
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Scanning { course: String, module: String },
    DownloadingAttachment { path: String },
    ReadingPage { path: String },
    DownloadingFile { path: String },
    Done,
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncState::Idle => write!(f, "准备中"),
            SyncState::Scanning { course, module } => write!(f, "扫描 {} / {}", course, module),
            SyncState::DownloadingAttachment { path } => write!(f, "下载附件 {}", path),
            SyncState::ReadingPage { path } => write!(f, "读取页面 {}", path),
            SyncState::DownloadingFile { path } => write!(f, "下载页面文件 {}", path),
            SyncState::Done => write!(f, "完成"),
        }
    }
}

/// 按 课程 -> 模块 -> 附件/页面 -> 页面文件 的顺序深度优先地同步。
///
/// 资源不存在或无权访问只影响当前节点，其余错误会中止整次同步。
/// 每次请求和下载之前都会检查取消标志。
pub struct SyncEngine<'a> {
    session: &'a RemoteSession,
    downloader: StructuredDownloader,
    force: bool,
    cancellation_token: Arc<AtomicBool>,
    progress: ProgressBar,
    state: SyncState,
    stats: SyncStats,
}

impl<'a> SyncEngine<'a> {
    pub fn new(session: &'a RemoteSession, cancellation_token: Arc<AtomicBool>) -> AppResult<Self> {
        Ok(Self {
            session,
            downloader: session.downloader()?,
            force: false,
            cancellation_token,
            progress: ProgressBar::hidden(),
            state: SyncState::Idle,
            stats: SyncStats::new(),
        })
    }

    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    pub fn state(&self) -> &SyncState {
        &self.state
    }

    pub fn stats(&self) -> &SyncStats {
        &self.stats
    }

    pub fn into_stats(self) -> SyncStats {
        self.stats
    }

    /// 执行一次完整同步，返回新下载的文件数
    pub async fn run(&mut self) -> AppResult<usize> {
        info!("开始同步，强制重新下载: {}", self.force);
        self.downloader.remove_partial_downloads()?;
        let result = self.sync_all().await;
        self.progress.finish_and_clear();
        result?;
        self.transition(SyncState::Done);
        info!("同步完成，新文件 {} 个", self.stats.downloaded);
        Ok(self.stats.downloaded)
    }

    async fn sync_all(&mut self) -> AppResult<()> {
        let mut courses = self.session.get_courses();
        while let Some(course) = self.next_node(&mut courses, "课程").await? {
            self.sync_course(&course).await?;
        }
        Ok(())
    }

    async fn sync_course(&mut self, course: &Arc<CourseScan>) -> AppResult<()> {
        debug!("同步课程 '{}' ({})", course.name(), course.id());
        let mut modules = course.get_modules();
        let context = format!("课程 '{}' 的模块", course.name());
        while let Some(module) = self.next_node(&mut modules, &context).await? {
            self.sync_module(course, &module).await?;
        }
        Ok(())
    }

    async fn sync_module(&mut self, course: &CourseScan, module: &ModuleScan) -> AppResult<()> {
        let scanning = SyncState::Scanning {
            course: course.name().to_string(),
            module: module.name().to_string(),
        };
        self.transition(scanning.clone());
        let context = format!("{}/{}", course.name(), module.name());

        let mut attachments = module.get_attachments();
        while let Some(file) = self.next_node(&mut attachments, &context).await? {
            self.transition(SyncState::DownloadingAttachment {
                path: format!("{}/{}", context, file.filename),
            });
            self.download(&file, &[course.name(), module.name()]).await?;
            self.transition(scanning.clone());
        }

        let mut pages = module.get_pages();
        while let Some(page) = self.next_node(&mut pages, &context).await? {
            let page_context = format!("{}/{}", context, page.name());
            let reading = SyncState::ReadingPage {
                path: page_context.clone(),
            };
            self.transition(reading.clone());
            let mut files = page.get_files();
            while let Some(file) = self.next_node(&mut files, &page_context).await? {
                self.transition(SyncState::DownloadingFile {
                    path: format!("{}/{}", page_context, file.filename),
                });
                self.download(&file, &[course.name(), module.name(), page.name()])
                    .await?;
                self.transition(reading.clone());
            }
            self.transition(scanning.clone());
        }
        Ok(())
    }

    async fn download(&mut self, file: &File, segments: &[&str]) -> AppResult<()> {
        self.check_cancelled()?;
        let name = format!("{}/{}", segments.join("/"), file.filename);
        match self
            .downloader
            .download_structured(file, segments, self.force)
            .await
        {
            Ok(status) => {
                if status != DownloadStatus::Skipped {
                    let (symbol, color, msg) = status.get_display_info();
                    self.progress
                        .println(format!("{} {} {}", symbol, color(name.as_str().into()), msg));
                }
                self.stats.record(&name, status);
                Ok(())
            }
            Err(e) if e.is_missing_resource() => {
                self.stats.record_unavailable(&name, &e.to_string());
                Ok(())
            }
            Err(e) => {
                self.stats.record_failure(&name, &e.to_string());
                Err(e)
            }
        }
    }

    /// 拉取下一个节点。缺失的资源记为不可用并跳过，其余错误原样返回。
    async fn next_node<T>(
        &mut self,
        stream: &mut BoxStream<'_, AppResult<T>>,
        context: &str,
    ) -> AppResult<Option<T>> {
        loop {
            self.check_cancelled()?;
            match stream.next().await {
                None => return Ok(None),
                Some(Ok(node)) => return Ok(Some(node)),
                Some(Err(e)) if e.is_missing_resource() => {
                    self.stats.record_unavailable(context, &e.to_string());
                }
                Some(Err(e)) => return Err(e),
            }
        }
    }

    fn check_cancelled(&self) -> AppResult<()> {
        if self.cancellation_token.load(Ordering::Relaxed) {
            warn!("同步被用户中断");
            return Err(AppError::UserInterrupt);
        }
        Ok(())
    }

    fn transition(&mut self, state: SyncState) {
        debug!("{}", state);
        self.progress.set_message(state.to_string());
        self.progress.tick();
        self.state = state;
    }
}
