// src/remote/mod.rs

mod canvas;

pub use canvas::CanvasClient;

use crate::{
    config::{AppConfig, ConfigStore},
    downloader::StructuredDownloader,
    error::{AppError, AppResult},
    models::{
        CourseInfo,
        api::{Course, CourseSummary, File, Module, ModuleItem, Page, Quiz, User},
    },
    scanner::{CourseScan, Scanner},
};
use async_trait::async_trait;
use futures::{
    TryStreamExt, future,
    stream::{self, BoxStream, StreamExt},
};
use log::{debug, info, warn};
use std::sync::Arc;

/// 核心逻辑所依赖的 Canvas 能力
#[async_trait]
pub trait CanvasApi: Send + Sync {
    async fn current_user(&self) -> AppResult<User>;
    async fn get_course(&self, course_id: u64) -> AppResult<Course>;
    async fn list_courses(&self) -> AppResult<Vec<CourseSummary>>;
    async fn get_modules(&self, course_id: u64) -> AppResult<Vec<Module>>;
    async fn get_module_items(&self, course_id: u64, module_id: u64) -> AppResult<Vec<ModuleItem>>;
    async fn get_page(&self, course_id: u64, url: &str) -> AppResult<Page>;
    async fn get_file(&self, file_id: u64) -> AppResult<File>;
    async fn get_quiz(&self, course_id: u64, quiz_id: u64) -> AppResult<Quiz>;
    async fn download(&self, file: &File, out: &mut std::fs::File) -> AppResult<u64>;
}

/// 一次成功连接的状态，所有扫描节点共享
pub struct Connection {
    pub(crate) api: Arc<dyn CanvasApi>,
    pub(crate) config: AppConfig,
    pub(crate) identity: User,
}

impl Connection {
    pub fn identity(&self) -> &User {
        &self.identity
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

/// Canvas 会话。创建时不会联网，需要显式调用 `connect`。
pub struct RemoteSession {
    store: ConfigStore,
    config: AppConfig,
    connection: Option<Arc<Connection>>,
}

impl RemoteSession {
    /// 读取配置；配置不完整或无效时返回 `InvalidConfig`
    pub fn new(store: ConfigStore) -> AppResult<Self> {
        let config = AppConfig::from_config(&store.get_valid()?);
        Ok(Self {
            store,
            config,
            connection: None,
        })
    }

    /// 重新读取配置，建立客户端并用一次轻量请求验证连通性。
    /// 任何失败都只记录日志并返回 false。
    pub async fn connect(&mut self) -> bool {
        info!("正在连接 Canvas");
        let config = match self.store.get_valid() {
            Ok(config) => AppConfig::from_config(&config),
            Err(e) => {
                warn!("{}", e);
                self.connection = None;
                return false;
            }
        };
        let api: Arc<dyn CanvasApi> = match CanvasClient::new(&config) {
            Ok(client) => Arc::new(client),
            Err(e) => {
                warn!("创建 Canvas 客户端失败: {}", e);
                self.connection = None;
                return false;
            }
        };
        self.config = config;
        self.connect_with(api).await
    }

    /// 使用给定的 API 实现连接
    pub async fn connect_with(&mut self, api: Arc<dyn CanvasApi>) -> bool {
        match api.current_user().await {
            Ok(identity) => {
                info!(
                    "已连接 {}，当前用户: {} ({})",
                    self.config.base_url,
                    identity.name.as_deref().unwrap_or("未知"),
                    identity.id
                );
                self.connection = Some(Arc::new(Connection {
                    api,
                    config: self.config.clone(),
                    identity,
                }));
                true
            }
            Err(e) => {
                warn!("连接 {} 失败: {}", self.config.base_url, e);
                self.connection = None;
                false
            }
        }
    }

    pub fn connected(&self) -> bool {
        self.connection.is_some()
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn connection(&self) -> AppResult<&Arc<Connection>> {
        self.connection.as_ref().ok_or(AppError::NotConnected)
    }

    pub async fn get_file(&self, file_id: u64) -> AppResult<File> {
        self.connection()?.api.get_file(file_id).await
    }

    pub async fn get_quiz(&self, course_id: u64, quiz_id: u64) -> AppResult<Quiz> {
        self.connection()?.api.get_quiz(course_id, quiz_id).await
    }

    pub async fn get_course(&self, course_id: u64) -> AppResult<Arc<CourseScan>> {
        CourseScan::fetch(Arc::clone(self.connection()?), course_id).await
    }

    /// 按配置顺序逐个获取课程。每次调用都从头开始。
    pub fn get_courses(&self) -> BoxStream<'static, AppResult<Arc<CourseScan>>> {
        let conn = match self.connection() {
            Ok(conn) => Arc::clone(conn),
            Err(e) => return stream::once(future::ready(Err(e))).boxed(),
        };
        let ids = conn.config.course_ids.clone();
        stream::iter(ids)
            .then(move |id| CourseScan::fetch(Arc::clone(&conn), id))
            .boxed()
    }

    /// 账号可见的全部课程，跳过没有名称的条目
    pub fn get_courses_info(&self) -> BoxStream<'static, AppResult<CourseInfo>> {
        let conn = match self.connection() {
            Ok(conn) => Arc::clone(conn),
            Err(e) => return stream::once(future::ready(Err(e))).boxed(),
        };
        stream::once(async move {
            let courses = conn.api.list_courses().await?;
            Ok::<_, AppError>(stream::iter(courses.into_iter().filter_map(|course| {
                match course.name {
                    Some(name) => Some(Ok::<_, AppError>(CourseInfo {
                        name,
                        id: course.id,
                    })),
                    None => {
                        debug!("课程 {} 没有名称，跳过", course.id);
                        None
                    }
                }
            })))
        })
        .try_flatten()
        .boxed()
    }

    pub fn downloader(&self) -> AppResult<StructuredDownloader> {
        let conn = self.connection()?;
        Ok(StructuredDownloader::new(
            conn.config.storage_path.clone(),
            Arc::clone(&conn.api),
        ))
    }
}

impl Scanner for RemoteSession {
    fn name(&self) -> &str {
        &self.config.base_url
    }

    /// 当前用户的 ID，未连接时为 0
    fn id(&self) -> u64 {
        self.connection.as_ref().map_or(0, |c| c.identity.id)
    }
}
