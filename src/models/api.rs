// src/models/api.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// --- 用户 ---

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
}

// --- 课程 ---

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Course {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub course_code: Option<String>,
}

/// 课程列表中的条目。受访问限制的课程只返回 id，没有 name。
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct CourseSummary {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
}

// --- 模块 ---

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Module {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub position: Option<u32>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ModuleItem {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    /// "File", "Page", "Quiz", "SubHeader" ...
    #[serde(rename = "type")]
    pub item_type: String,
    #[serde(default)]
    pub content_id: Option<u64>,
    #[serde(default)]
    pub page_url: Option<String>,
}

// --- 页面 ---

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Page {
    #[serde(alias = "id")]
    pub page_id: u64,
    pub url: String,
    pub title: String,
    /// 字段缺失与 null 都表示页面没有内容
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

// --- 文件与测验 ---

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct File {
    pub id: u64,
    pub filename: String,
    #[serde(default)]
    pub display_name: Option<String>,
    /// 带签名的下载地址
    pub url: String,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Quiz {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub html_url: Option<String>,
}

// --- 分页 ---

/// `Link` 响应头中的分页地址
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaginationLinks {
    pub current: Option<String>,
    pub next: Option<String>,
    pub prev: Option<String>,
    pub first: Option<String>,
    pub last: Option<String>,
}

impl PaginationLinks {
    /// 解析形如 `<https://...>; rel="next", <https://...>; rel="last"` 的头部
    pub fn parse(header: &str) -> Self {
        let mut links = Self::default();
        for part in header.split(',') {
            let mut segments = part.split(';');
            let Some(target) = segments
                .next()
                .map(str::trim)
                .and_then(|s| s.strip_prefix('<'))
                .and_then(|s| s.strip_suffix('>'))
            else {
                continue;
            };
            for param in segments {
                let Some((name, value)) = param.trim().split_once('=') else {
                    continue;
                };
                if !name.trim().eq_ignore_ascii_case("rel") {
                    continue;
                }
                let slot = match value.trim().trim_matches('"') {
                    "current" => &mut links.current,
                    "next" => &mut links.next,
                    "prev" => &mut links.prev,
                    "first" => &mut links.first,
                    "last" => &mut links.last,
                    _ => continue,
                };
                *slot = Some(target.to_string());
            }
        }
        links
    }
}
