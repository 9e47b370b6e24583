// src/scanner/course.rs

use super::{ModuleScan, PageScan, ResourceKind, ResourceMatcher, Scanner};
use crate::{
    error::{AppError, AppResult},
    models::api::Course,
    remote::Connection,
    utils,
};
use futures::{
    TryStreamExt,
    stream::{self, BoxStream, StreamExt},
};
use log::debug;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

pub struct CourseScan {
    course: Course,
    name: String,
    conn: Arc<Connection>,
    matchers: Mutex<HashMap<ResourceKind, Arc<ResourceMatcher>>>,
}

impl CourseScan {
    pub async fn fetch(conn: Arc<Connection>, course_id: u64) -> AppResult<Arc<Self>> {
        debug!("获取课程 {}", course_id);
        let course = conn.api.get_course(course_id).await?;
        Ok(Arc::new(Self::new(conn, course)))
    }

    pub(crate) fn new(conn: Arc<Connection>, course: Course) -> Self {
        Self {
            name: utils::better_course_name(&course.name),
            course,
            conn,
            matchers: Mutex::new(HashMap::new()),
        }
    }

    pub fn course(&self) -> &Course {
        &self.course
    }

    pub fn code(&self) -> Option<&str> {
        self.course.course_code.as_deref()
    }

    pub(crate) fn connection(&self) -> &Arc<Connection> {
        &self.conn
    }

    /// 第一次请求某类资源时才构建匹配器，之后复用
    pub fn resource_matcher(&self, kind: ResourceKind) -> AppResult<Arc<ResourceMatcher>> {
        let mut matchers = self.lock_matchers();
        if let Some(matcher) = matchers.get(&kind) {
            return Ok(Arc::clone(matcher));
        }
        let matcher = Arc::new(ResourceMatcher::new(
            &self.conn.config.base_url,
            self.course.id,
            kind,
        )?);
        debug!("课程 {} 的 {} 匹配规则: {}", self.course.id, kind, matcher.as_str());
        matchers.insert(kind, Arc::clone(&matcher));
        Ok(matcher)
    }

    /// 是否已经为该资源种类构建过匹配器
    pub fn has_resource_matcher(&self, kind: ResourceKind) -> bool {
        self.lock_matchers().contains_key(&kind)
    }

    // 匹配器构建后不会被修改，锁中毒时内容仍然可用
    fn lock_matchers(&self) -> MutexGuard<'_, HashMap<ResourceKind, Arc<ResourceMatcher>>> {
        self.matchers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 按平台返回的顺序逐个产出模块
    pub fn get_modules(self: &Arc<Self>) -> BoxStream<'static, AppResult<ModuleScan>> {
        let course = Arc::clone(self);
        stream::once(async move {
            let modules = course.conn.api.get_modules(course.course.id).await?;
            debug!("课程 '{}' 共有 {} 个模块", course.name, modules.len());
            Ok::<_, AppError>(stream::iter(modules.into_iter().map(move |module| {
                Ok::<_, AppError>(ModuleScan::new(module, Arc::clone(&course)))
            })))
        })
        .try_flatten()
        .boxed()
    }

    pub async fn get_page(self: &Arc<Self>, url: &str) -> AppResult<PageScan> {
        let page = self.conn.api.get_page(self.course.id, url).await?;
        Ok(PageScan::new(page, Arc::clone(self)))
    }
}

impl Scanner for CourseScan {
    fn name(&self) -> &str {
        &self.name
    }

    fn id(&self) -> u64 {
        self.course.id
    }
}
