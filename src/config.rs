// src/config.rs

pub mod store;

pub use self::store::{ConfigStore, resolve_api_key};

use crate::{
    constants,
    error::{AppError, AppResult},
    utils,
};
use clap::ValueEnum;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{fmt, path::PathBuf, sync::LazyLock, time::Duration};
use url::Url;

static API_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}~[A-Za-z0-9]{64}$").unwrap());

/// 配置文件中必须出现的全部键
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    Url,
    ApiKey,
    StoragePath,
    CourseIds,
}

impl ConfigKey {
    pub const ALL: [ConfigKey; 4] = [
        ConfigKey::Url,
        ConfigKey::ApiKey,
        ConfigKey::StoragePath,
        ConfigKey::CourseIds,
    ];

    /// 在 JSON 文件中使用的键名
    pub fn as_str(self) -> &'static str {
        match self {
            ConfigKey::Url => "url",
            ConfigKey::ApiKey => "api_key",
            ConfigKey::StoragePath => "storage_path",
            ConfigKey::CourseIds => "course_ids",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ConfigKey::Url => "Canvas URL",
            ConfigKey::ApiKey => "API key",
            ConfigKey::StoragePath => "Storage path",
            ConfigKey::CourseIds => "Course ID number(s)",
        }
    }

    /// 将用户输入规范化为要写入配置文件的值
    pub fn parse_input(self, input: &str) -> AppResult<Value> {
        let input = input.trim();
        match self {
            ConfigKey::Url => {
                let url = if input.starts_with("http") {
                    input.to_string()
                } else {
                    format!("https://{}", input)
                };
                Ok(Value::String(url.trim_end_matches('/').to_string()))
            }
            ConfigKey::ApiKey => Ok(Value::String(input.to_string())),
            ConfigKey::StoragePath => Ok(Value::String(
                utils::expand_home(input).to_string_lossy().into_owned(),
            )),
            ConfigKey::CourseIds => input
                .split([',', ' '])
                .filter(|s| !s.is_empty())
                .map(|s| {
                    s.parse::<u64>().map(Value::from).map_err(|_| {
                        AppError::UserInputError(format!("'{}' 不是有效的课程 ID", s))
                    })
                })
                .collect::<AppResult<Vec<_>>>()
                .map(Value::Array),
        }
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct NetworkConfig {
    pub connect_timeout_secs: Option<u64>,
    pub timeout_secs: Option<u64>,
    pub max_retries: Option<u32>,
}

impl NetworkConfig {
    fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub url: String,
    pub api_key: String,
    pub storage_path: PathBuf,
    pub course_ids: Vec<u64>,
    #[serde(default, skip_serializing_if = "NetworkConfig::is_default")]
    pub network: NetworkConfig,
}

impl Config {
    pub(crate) fn default_config() -> Self {
        let storage_path = constants::DEFAULT_STORAGE_DIR
            .iter()
            .fold(dirs::home_dir().unwrap_or_default(), |p, part| p.join(part));
        Self {
            url: String::new(),
            api_key: String::new(),
            storage_path,
            course_ids: Vec::new(),
            network: NetworkConfig::default(),
        }
    }
}

/// 所有键都存在
pub fn complete(raw: &Map<String, Value>) -> bool {
    ConfigKey::ALL.iter().all(|key| raw.contains_key(key.as_str()))
}

/// 单个键的取值是否合法
pub fn valid_key(key: ConfigKey, value: &Value) -> bool {
    match key {
        ConfigKey::Url => value.as_str().is_some_and(valid_url),
        ConfigKey::ApiKey => value.as_str().is_some_and(|s| API_KEY_RE.is_match(s)),
        ConfigKey::StoragePath => value.as_str().is_some_and(|s| {
            !s.trim().is_empty() && utils::verify_accessible_path(&utils::expand_home(s))
        }),
        ConfigKey::CourseIds => value
            .as_array()
            .is_some_and(|ids| ids.iter().all(|id| id.as_u64().is_some())),
    }
}

fn valid_url(s: &str) -> bool {
    Url::parse(s).is_ok_and(|url| {
        matches!(url.scheme(), "http" | "https") && url.host_str().is_some_and(|h| !h.is_empty())
    })
}

/// 完整且每个键都合法
pub fn valid(raw: &Map<String, Value>) -> bool {
    complete(raw) && first_invalid_key(raw).is_none()
}

pub fn first_invalid_key(raw: &Map<String, Value>) -> Option<ConfigKey> {
    ConfigKey::ALL
        .into_iter()
        .find(|key| raw.get(key.as_str()).is_none_or(|v| !valid_key(*key, v)))
}

/// 运行期使用的配置视图
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub base_url: String,
    pub api_key: String,
    pub storage_path: PathBuf,
    pub course_ids: Vec<u64>,
    pub user_agent: String,
    pub connect_timeout: Duration,
    pub timeout: Duration,
    pub max_retries: u32,
}

impl AppConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            storage_path: utils::expand_home(&config.storage_path.to_string_lossy()),
            course_ids: config.course_ids.clone(),
            user_agent: constants::USER_AGENT.into(),
            connect_timeout: Duration::from_secs(
                config
                    .network
                    .connect_timeout_secs
                    .unwrap_or(constants::DEFAULT_CONNECT_TIMEOUT_SECS),
            ),
            timeout: Duration::from_secs(
                config.network.timeout_secs.unwrap_or(constants::DEFAULT_TIMEOUT_SECS),
            ),
            max_retries: config
                .network
                .max_retries
                .unwrap_or(constants::DEFAULT_MAX_RETRIES),
        }
    }
}

#[cfg(feature = "testing")]
impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: "https://canvas.example.edu".to_string(),
            api_key: format!("1234~{}", "a".repeat(64)),
            storage_path: std::env::temp_dir().join("cansync-test"),
            course_ids: Vec::new(),
            user_agent: "test-agent/1.0".to_string(),
            connect_timeout: Duration::from_secs(5),
            timeout: Duration::from_secs(15),
            max_retries: 0,
        }
    }
}
