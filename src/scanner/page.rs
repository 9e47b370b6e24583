// src/scanner/page.rs

use super::{CourseScan, ResourceKind, Scanner};
use crate::{
    error::AppResult,
    models::api::{File, Page, Quiz},
};
use futures::{
    future,
    stream::{self, BoxStream, StreamExt},
};
use log::{debug, trace};
use std::{future::Future, sync::Arc};

pub struct PageScan {
    page: Page,
    course: Arc<CourseScan>,
}

impl PageScan {
    pub(crate) fn new(page: Page, course: Arc<CourseScan>) -> Self {
        Self { page, course }
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn course(&self) -> &Arc<CourseScan> {
        &self.course
    }

    /// 页面没有正文 (字段缺失或为 null)
    pub fn is_empty(&self) -> bool {
        self.page.body.is_none()
    }

    /// 正文中引用的某类资源 ID，按出现顺序，不去重。
    /// 空页面直接返回，不会构建匹配器。
    pub fn resource_ids(&self, kind: ResourceKind) -> AppResult<Vec<u64>> {
        let Some(body) = self.page.body.as_deref() else {
            trace!("页面 '{}' 没有正文", self.page.title);
            return Ok(Vec::new());
        };
        let matcher = self.course.resource_matcher(kind)?;
        let ids: Vec<u64> = matcher.find_ids(body).collect();
        debug!("页面 '{}' 中找到 {} 个 {}: {:?}", self.page.title, ids.len(), kind, ids);
        Ok(ids)
    }

    /// 对正文中的每个引用调用一次 `getter`，在被拉取时才发起请求
    fn scan_body<'a, T, F, Fut>(&'a self, kind: ResourceKind, getter: F) -> BoxStream<'a, AppResult<T>>
    where
        T: Send + 'a,
        F: FnMut(u64) -> Fut + Send + 'a,
        Fut: Future<Output = AppResult<T>> + Send + 'a,
    {
        match self.resource_ids(kind) {
            Ok(ids) => stream::iter(ids).then(getter).boxed(),
            Err(e) => stream::once(future::ready(Err(e))).boxed(),
        }
    }

    pub fn get_files(&self) -> BoxStream<'_, AppResult<File>> {
        let api = &self.course.connection().api;
        self.scan_body(ResourceKind::Files, move |id| api.get_file(id))
    }

    pub fn get_quizzes(&self) -> BoxStream<'_, AppResult<Quiz>> {
        let api = &self.course.connection().api;
        let course_id = self.course.id();
        self.scan_body(ResourceKind::Quizzes, move |id| api.get_quiz(course_id, id))
    }
}

impl Scanner for PageScan {
    fn name(&self) -> &str {
        &self.page.title
    }

    fn id(&self) -> u64 {
        self.page.page_id
    }
}
