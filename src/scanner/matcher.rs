// src/scanner/matcher.rs

use crate::{constants::api::resource_kinds, error::AppResult};
use regex::Regex;
use std::fmt;

/// 页面正文中可以引用的资源种类，两者共用同一种 URL 形状
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Files,
    Quizzes,
}

impl ResourceKind {
    /// 在 URL 路径中出现的那一段
    pub fn path_segment(self) -> &'static str {
        match self {
            ResourceKind::Files => resource_kinds::FILES,
            ResourceKind::Quizzes => resource_kinds::QUIZZES,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path_segment())
    }
}

/// 在 HTML 正文中查找某门课程的某类资源链接。
///
/// 同时识别浏览器地址 `BASE/courses/42/files/7` 与 API 地址
/// `BASE/api/v1/courses/42/files/7`，也识别省略了 `BASE` 的站内相对链接。
/// 相对链接必须紧跟在引号、括号、空白、`=` 之后或位于正文开头，
/// 其他主机上的同形路径不算。
#[derive(Debug)]
pub struct ResourceMatcher {
    kind: ResourceKind,
    regex: Regex,
}

impl ResourceMatcher {
    pub fn new(base_url: &str, course_id: u64, kind: ResourceKind) -> AppResult<Self> {
        let base = regex::escape(base_url.trim_end_matches('/'));
        let pattern = format!(
            r#"(?:{}|(?:^|["'(\s=]))/(?:api/v1/)?courses/{}/{}/([0-9]+)"#,
            base,
            course_id,
            kind.path_segment()
        );
        Ok(Self {
            kind,
            regex: Regex::new(&pattern)?,
        })
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// 按出现顺序返回所有匹配到的 ID，重复的链接会重复出现
    pub fn find_ids<'a>(&'a self, body: &'a str) -> impl Iterator<Item = u64> + 'a {
        self.regex
            .captures_iter(body)
            .filter_map(|caps| caps.get(1))
            .filter_map(|m| m.as_str().parse().ok())
    }
}
