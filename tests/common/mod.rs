// tests/common/mod.rs
#![allow(dead_code)]

use async_trait::async_trait;
use cansync::{
    config::ConfigStore,
    error::{AppError, AppResult},
    models::api::{Course, CourseSummary, File, Module, ModuleItem, Page, Quiz, User},
    remote::{CanvasApi, RemoteSession},
};
use std::{
    collections::{HashMap, HashSet},
    io::Write,
    path::{Path, PathBuf},
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
};

pub const BASE_URL: &str = "https://x.test";

pub fn api_key() -> String {
    format!("1234~{}", "Ab9".repeat(21) + "Z")
}

/// 内存中的 Canvas，记录每一次调用
#[derive(Default)]
pub struct FakeCanvas {
    courses: HashMap<u64, Course>,
    modules: HashMap<u64, Vec<Module>>,
    items: HashMap<u64, Vec<ModuleItem>>,
    pages: HashMap<(u64, String), Page>,
    files: HashMap<u64, File>,
    quizzes: HashMap<u64, Quiz>,
    contents: HashMap<u64, Vec<u8>>,
    gone_on_download: HashSet<u64>,
    broken_downloads: HashSet<u64>,
    cancel_on_download: Option<Arc<AtomicBool>>,
    calls: Mutex<Vec<String>>,
}

impl FakeCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn course(mut self, id: u64, name: &str) -> Self {
        self.courses.insert(
            id,
            Course {
                id,
                name: name.to_string(),
                course_code: Some(format!("C{}", id)),
            },
        );
        self
    }

    pub fn module(mut self, course_id: u64, id: u64, name: &str) -> Self {
        self.modules.entry(course_id).or_default().push(Module {
            id,
            name: name.to_string(),
            position: None,
        });
        self
    }

    pub fn item(
        mut self,
        module_id: u64,
        item_type: &str,
        content_id: Option<u64>,
        page_url: Option<&str>,
    ) -> Self {
        let items = self.items.entry(module_id).or_default();
        let id = 1000 + items.len() as u64;
        items.push(ModuleItem {
            id,
            title: format!("{} {}", item_type, id),
            item_type: item_type.to_string(),
            content_id,
            page_url: page_url.map(str::to_string),
        });
        self
    }

    pub fn page(mut self, course_id: u64, url: &str, title: &str, body: Option<&str>) -> Self {
        let page_id = 500 + self.pages.len() as u64;
        self.pages.insert(
            (course_id, url.to_string()),
            Page {
                page_id,
                url: url.to_string(),
                title: title.to_string(),
                body: body.map(str::to_string),
                updated_at: None,
            },
        );
        self
    }

    pub fn file(mut self, id: u64, filename: &str, content: &[u8]) -> Self {
        self.files.insert(
            id,
            File {
                id,
                filename: filename.to_string(),
                display_name: None,
                url: format!("{}/files/{}/download", BASE_URL, id),
                size: Some(content.len() as u64),
                updated_at: None,
            },
        );
        self.contents.insert(id, content.to_vec());
        self
    }

    pub fn quiz(mut self, id: u64, title: &str) -> Self {
        self.quizzes.insert(
            id,
            Quiz {
                id,
                title: title.to_string(),
                html_url: None,
            },
        );
        self
    }

    /// 元数据存在，但下载时返回 404
    pub fn gone_on_download(mut self, id: u64) -> Self {
        self.gone_on_download.insert(id);
        self
    }

    /// 写入部分内容后失败
    pub fn broken_download(mut self, id: u64) -> Self {
        self.broken_downloads.insert(id);
        self
    }

    /// 第一次下载后置位取消标志
    pub fn cancel_on_download(mut self, token: Arc<AtomicBool>) -> Self {
        self.cancel_on_download = Some(token);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_starting_with(&self, prefix: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.starts_with(prefix))
            .collect()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

fn not_found(what: String) -> AppError {
    AppError::NotFound(format!("{}/{}", BASE_URL, what))
}

#[async_trait]
impl CanvasApi for FakeCanvas {
    async fn current_user(&self) -> AppResult<User> {
        self.record("current_user".into());
        Ok(User {
            id: 7,
            name: Some("Test Student".into()),
        })
    }

    async fn get_course(&self, course_id: u64) -> AppResult<Course> {
        self.record(format!("get_course:{}", course_id));
        self.courses
            .get(&course_id)
            .cloned()
            .ok_or_else(|| not_found(format!("courses/{}", course_id)))
    }

    async fn list_courses(&self) -> AppResult<Vec<CourseSummary>> {
        self.record("list_courses".into());
        let mut courses: Vec<CourseSummary> = self
            .courses
            .values()
            .map(|c| CourseSummary {
                id: c.id,
                name: Some(c.name.clone()),
            })
            .collect();
        courses.sort_by_key(|c| c.id);
        Ok(courses)
    }

    async fn get_modules(&self, course_id: u64) -> AppResult<Vec<Module>> {
        self.record(format!("get_modules:{}", course_id));
        Ok(self.modules.get(&course_id).cloned().unwrap_or_default())
    }

    async fn get_module_items(&self, course_id: u64, module_id: u64) -> AppResult<Vec<ModuleItem>> {
        self.record(format!("get_module_items:{}:{}", course_id, module_id));
        Ok(self.items.get(&module_id).cloned().unwrap_or_default())
    }

    async fn get_page(&self, course_id: u64, url: &str) -> AppResult<Page> {
        self.record(format!("get_page:{}:{}", course_id, url));
        self.pages
            .get(&(course_id, url.to_string()))
            .cloned()
            .ok_or_else(|| not_found(format!("courses/{}/pages/{}", course_id, url)))
    }

    async fn get_file(&self, file_id: u64) -> AppResult<File> {
        self.record(format!("get_file:{}", file_id));
        self.files
            .get(&file_id)
            .cloned()
            .ok_or_else(|| not_found(format!("files/{}", file_id)))
    }

    async fn get_quiz(&self, course_id: u64, quiz_id: u64) -> AppResult<Quiz> {
        self.record(format!("get_quiz:{}:{}", course_id, quiz_id));
        self.quizzes
            .get(&quiz_id)
            .cloned()
            .ok_or_else(|| not_found(format!("courses/{}/quizzes/{}", course_id, quiz_id)))
    }

    async fn download(&self, file: &File, out: &mut std::fs::File) -> AppResult<u64> {
        self.record(format!("download:{}", file.id));
        if let Some(token) = &self.cancel_on_download {
            token.store(true, Ordering::Relaxed);
        }
        if self.gone_on_download.contains(&file.id) {
            return Err(not_found(format!("files/{}/download", file.id)));
        }
        let content = self.contents.get(&file.id).cloned().unwrap_or_default();
        if self.broken_downloads.contains(&file.id) {
            out.write_all(&content[..content.len() / 2])?;
            return Err(AppError::Other(anyhow::anyhow!("连接被重置")));
        }
        out.write_all(&content)?;
        Ok(content.len() as u64)
    }
}

/// 临时目录中的配置与存储根目录
pub struct TestEnv {
    pub dir: tempfile::TempDir,
    pub store: ConfigStore,
}

impl TestEnv {
    pub fn new(course_ids: &[u64]) -> Self {
        Self::with_url(BASE_URL, course_ids)
    }

    pub fn with_url(url: &str, course_ids: &[u64]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let storage = dir.path().join("storage");
        let config_path = dir.path().join("config.json");
        let config = serde_json::json!({
            "url": url,
            "api_key": api_key(),
            "storage_path": storage,
            "course_ids": course_ids,
        });
        std::fs::write(&config_path, serde_json::to_string_pretty(&config).unwrap()).unwrap();
        Self {
            store: ConfigStore::new(&config_path),
            dir,
        }
    }

    pub fn storage(&self) -> PathBuf {
        self.dir.path().join("storage")
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.path().join("config.json")
    }

    pub async fn session(&self, canvas: Arc<FakeCanvas>) -> RemoteSession {
        let mut session = RemoteSession::new(self.store.clone()).unwrap();
        assert!(session.connect_with(canvas).await);
        session
    }
}

pub fn read(path: &Path) -> Vec<u8> {
    std::fs::read(path).unwrap()
}

/// 目录下所有文件 (相对路径，已排序)
pub fn list_files(root: &Path) -> Vec<String> {
    fn walk(dir: &Path, root: &Path, out: &mut Vec<String>) {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                walk(&path, root, out);
            } else {
                let rel = path.strip_prefix(root).unwrap();
                out.push(rel.to_string_lossy().replace('\\', "/"));
            }
        }
    }
    let mut out = Vec::new();
    walk(root, root, &mut out);
    out.sort();
    out
}
