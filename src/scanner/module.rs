// src/scanner/module.rs

use super::{CourseScan, PageScan, Scanner};
use crate::{
    constants::api::item_types,
    error::{AppError, AppResult},
    models::api::{File, Module, ModuleItem, Quiz},
};
use futures::{
    TryStreamExt, future,
    stream::{self, BoxStream, StreamExt},
};
use log::{debug, warn};
use std::{fmt, str::FromStr, sync::Arc};
use tokio::sync::OnceCell;

/// 模块条目的种类。只有 Page、Quiz、Attachment 会继续向下遍历。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleItemType {
    Header,
    Page,
    Quiz,
    ExternalTool,
    ExternalUrl,
    Attachment,
    Discussion,
    Assignment,
}

impl ModuleItemType {
    pub const ALL: [ModuleItemType; 8] = [
        ModuleItemType::Header,
        ModuleItemType::Page,
        ModuleItemType::Quiz,
        ModuleItemType::ExternalTool,
        ModuleItemType::ExternalUrl,
        ModuleItemType::Attachment,
        ModuleItemType::Discussion,
        ModuleItemType::Assignment,
    ];

    /// Canvas 接口中 `type` 字段的取值
    pub fn tag(self) -> &'static str {
        match self {
            ModuleItemType::Header => item_types::HEADER,
            ModuleItemType::Page => item_types::PAGE,
            ModuleItemType::Quiz => item_types::QUIZ,
            ModuleItemType::ExternalTool => item_types::EXTERNAL_TOOL,
            ModuleItemType::ExternalUrl => item_types::EXTERNAL_URL,
            ModuleItemType::Attachment => item_types::ATTACHMENT,
            ModuleItemType::Discussion => item_types::DISCUSSION,
            ModuleItemType::Assignment => item_types::ASSIGNMENT,
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }
}

impl FromStr for ModuleItemType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_tag(s).ok_or_else(|| AppError::UserInputError(format!("未知的条目类型: {}", s)))
    }
}

impl fmt::Display for ModuleItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl ModuleItem {
    /// 未收录的类型返回 None，遍历时直接忽略
    pub fn kind(&self) -> Option<ModuleItemType> {
        ModuleItemType::from_tag(&self.item_type)
    }
}

pub struct ModuleScan {
    module: Module,
    course: Arc<CourseScan>,
    items: OnceCell<Vec<ModuleItem>>,
}

impl ModuleScan {
    pub(crate) fn new(module: Module, course: Arc<CourseScan>) -> Self {
        Self {
            module,
            course,
            items: OnceCell::new(),
        }
    }

    pub fn module(&self) -> &Module {
        &self.module
    }

    pub fn course(&self) -> &Arc<CourseScan> {
        &self.course
    }

    /// 模块的全部条目。只在第一次调用时请求，之后返回同一份快照。
    pub async fn items(&self) -> AppResult<&[ModuleItem]> {
        let items = self
            .items
            .get_or_try_init(|| async {
                let course_id = self.course.id();
                let items = self
                    .course
                    .connection()
                    .api
                    .get_module_items(course_id, self.module.id)
                    .await?;
                debug!("模块 '{}' 共有 {} 个条目", self.module.name, items.len());
                for item in items.iter().filter(|item| item.kind().is_none()) {
                    debug!("未知的条目类型 '{}' ({})，忽略", item.item_type, item.title);
                }
                Ok::<_, AppError>(items)
            })
            .await?;
        Ok(items.as_slice())
    }

    /// 保持原有顺序，只保留指定种类的条目
    pub fn items_by_type(&self, kind: ModuleItemType) -> BoxStream<'_, AppResult<&ModuleItem>> {
        stream::once(self.items())
            .map_ok(move |items| {
                stream::iter(
                    items
                        .iter()
                        .filter(move |item| item.kind() == Some(kind))
                        .map(Ok::<_, AppError>),
                )
            })
            .try_flatten()
            .boxed()
    }

    pub fn get_pages(&self) -> BoxStream<'_, AppResult<PageScan>> {
        self.items_by_type(ModuleItemType::Page)
            .try_filter_map(move |item| async move {
                let Some(url) = item.page_url.as_deref() else {
                    warn!("页面条目 '{}' 缺少 page_url，跳过", item.title);
                    return Ok(None);
                };
                self.course.get_page(url).await.map(Some)
            })
            .boxed()
    }

    pub fn get_attachments(&self) -> BoxStream<'_, AppResult<File>> {
        let api = &self.course.connection().api;
        self.items_by_type(ModuleItemType::Attachment)
            .try_filter_map(move |item| match item.content_id {
                Some(id) => future::Either::Left(async move { api.get_file(id).await.map(Some) }),
                None => {
                    warn!("附件条目 '{}' 缺少 content_id，跳过", item.title);
                    future::Either::Right(future::ok(None))
                }
            })
            .boxed()
    }

    pub fn get_quizzes(&self) -> BoxStream<'_, AppResult<Quiz>> {
        let api = &self.course.connection().api;
        let course_id = self.course.id();
        self.items_by_type(ModuleItemType::Quiz)
            .try_filter_map(move |item| match item.content_id {
                Some(id) => {
                    future::Either::Left(async move { api.get_quiz(course_id, id).await.map(Some) })
                }
                None => {
                    warn!("测验条目 '{}' 缺少 content_id，跳过", item.title);
                    future::Either::Right(future::ok(None))
                }
            })
            .boxed()
    }
}

impl Scanner for ModuleScan {
    fn name(&self) -> &str {
        &self.module.name
    }

    fn id(&self) -> u64 {
        self.module.id
    }
}
