// src/remote/canvas.rs

use super::CanvasApi;
use crate::{
    client::RobustClient,
    config::AppConfig,
    constants::api,
    error::AppResult,
    models::api::{Course, CourseSummary, File, Module, ModuleItem, Page, Quiz, User},
};
use async_trait::async_trait;
use log::debug;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

// 页面 slug 中保留 RFC 3986 的非保留字符
const SLUG: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// 通过 REST API 访问 Canvas
#[derive(Clone)]
pub struct CanvasClient {
    http_client: RobustClient,
}

impl CanvasClient {
    pub fn new(config: &AppConfig) -> AppResult<Self> {
        Ok(Self {
            http_client: RobustClient::new(config)?,
        })
    }

    fn course_path(course_id: u64, rest: &str) -> String {
        format!("{}/{}/{}", api::COURSES, course_id, rest)
    }
}

#[async_trait]
impl CanvasApi for CanvasClient {
    async fn current_user(&self) -> AppResult<User> {
        self.http_client.get_json(api::CURRENT_USER).await
    }

    async fn get_course(&self, course_id: u64) -> AppResult<Course> {
        self.http_client
            .get_json(&format!("{}/{}", api::COURSES, course_id))
            .await
    }

    async fn list_courses(&self) -> AppResult<Vec<CourseSummary>> {
        self.http_client.get_paginated(api::COURSES).await
    }

    async fn get_modules(&self, course_id: u64) -> AppResult<Vec<Module>> {
        self.http_client
            .get_paginated(&Self::course_path(course_id, "modules"))
            .await
    }

    async fn get_module_items(&self, course_id: u64, module_id: u64) -> AppResult<Vec<ModuleItem>> {
        self.http_client
            .get_paginated(&Self::course_path(
                course_id,
                &format!("modules/{}/items", module_id),
            ))
            .await
    }

    async fn get_page(&self, course_id: u64, url: &str) -> AppResult<Page> {
        let slug = utf8_percent_encode(url, SLUG).to_string();
        self.http_client
            .get_json(&Self::course_path(course_id, &format!("pages/{}", slug)))
            .await
    }

    async fn get_file(&self, file_id: u64) -> AppResult<File> {
        self.http_client
            .get_json(&format!("{}/{}", api::FILES, file_id))
            .await
    }

    async fn get_quiz(&self, course_id: u64, quiz_id: u64) -> AppResult<Quiz> {
        self.http_client
            .get_json(&Self::course_path(course_id, &format!("quizzes/{}", quiz_id)))
            .await
    }

    async fn download(&self, file: &File, out: &mut std::fs::File) -> AppResult<u64> {
        debug!("下载文件 {} ({})", file.filename, file.id);
        self.http_client.download_to(&file.url, out).await
    }
}
