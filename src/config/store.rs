// src/config/store.rs

use super::{Config, ConfigKey, complete, first_invalid_key};
use crate::{
    constants,
    error::{AppError, AppResult},
};
use anyhow::{Context, anyhow};
use log::{debug, info};
use serde_json::{Map, Value};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// 基于 JSON 文件的配置存储
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
    api_key_override: Option<String>,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            api_key_override: None,
        }
    }

    pub fn default_location() -> AppResult<Self> {
        let path = dirs::home_dir()
            .ok_or_else(|| AppError::Other(anyhow!("无法获取用户主目录")))?
            .join(constants::CONFIG_DIR_NAME)
            .join(constants::CONFIG_FILE_NAME);
        Ok(Self::new(path))
    }

    /// 读取时用命令行或环境变量中的 API Key 覆盖文件中的值，写入时不受影响。
    pub fn with_api_key_override(mut self, api_key: Option<String>) -> Self {
        self.api_key_override = api_key.filter(|k| !k.is_empty());
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 配置文件不存在时写入默认配置
    pub fn ensure_exists(&self) -> AppResult<()> {
        if self.path.is_file() {
            return Ok(());
        }
        info!("配置文件 {:?} 不存在，将创建默认配置。", self.path);
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        self.set(&Config::default_config())
    }

    fn read_file(&self) -> AppResult<Map<String, Value>> {
        self.ensure_exists()?;
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("读取配置文件 '{}' 失败", self.path.display()))?;
        let value: Value = serde_json::from_str(&content)
            .with_context(|| format!("解析配置文件 '{}' 失败", self.path.display()))?;
        match value {
            Value::Object(map) => Ok(map),
            _ => Err(AppError::InvalidConfig(format!(
                "配置文件 '{}' 的顶层必须是对象",
                self.path.display()
            ))),
        }
    }

    fn write_file(&self, raw: &Map<String, Value>) -> AppResult<()> {
        let json_content = serde_json::to_string_pretty(raw)?;
        fs::write(&self.path, json_content)
            .with_context(|| format!("写入配置文件 '{}' 失败", self.path.display()))?;
        Ok(())
    }

    /// 原始键值，已应用 API Key 覆盖
    pub fn load_raw(&self) -> AppResult<Map<String, Value>> {
        let mut raw = self.read_file()?;
        if let Some(key) = &self.api_key_override {
            raw.insert(ConfigKey::ApiKey.as_str().into(), Value::String(key.clone()));
        }
        Ok(raw)
    }

    pub fn get(&self) -> AppResult<Config> {
        debug!("从 {} 读取配置", self.path.display());
        let raw = self.load_raw()?;
        if !complete(&raw) {
            let missing: Vec<_> = ConfigKey::ALL
                .iter()
                .filter(|k| !raw.contains_key(k.as_str()))
                .map(|k| k.label())
                .collect();
            return Err(AppError::InvalidConfig(format!(
                "缺少配置项: {}",
                missing.join(", ")
            )));
        }
        serde_json::from_value(Value::Object(raw))
            .map_err(|e| AppError::InvalidConfig(e.to_string()))
    }

    /// 与 `get` 相同，但要求每个键都通过校验
    pub fn get_valid(&self) -> AppResult<Config> {
        let config = self.get()?;
        let raw = self.load_raw()?;
        if let Some(key) = first_invalid_key(&raw) {
            return Err(AppError::InvalidConfig(format!("'{}' 的值无效", key.label())));
        }
        Ok(config)
    }

    pub fn set(&self, config: &Config) -> AppResult<()> {
        debug!("写入配置到 {}", self.path.display());
        match serde_json::to_value(config)? {
            Value::Object(raw) => self.write_file(&raw),
            _ => Err(AppError::Other(anyhow!("配置无法序列化为对象"))),
        }
    }

    /// 覆盖单个键，其余键保持原样
    pub fn overwrite(&self, key: ConfigKey, value: Value) -> AppResult<()> {
        let mut raw = self.read_file()?;
        raw.insert(key.as_str().into(), value);
        if !complete(&raw) {
            return Err(AppError::InvalidConfig("部分配置项缺失".into()));
        }
        self.write_file(&raw)?;
        info!("配置项 '{}' 已更新", key);
        Ok(())
    }
}

/// 依次从命令行参数、环境变量中查找 API Key，返回 (Key, 来源)。
/// 都没有时返回 None，调用方回退到配置文件。
pub fn resolve_api_key(cli_key: Option<&str>) -> (Option<String>, String) {
    if let Some(key) = cli_key && !key.is_empty() {
        debug!("使用来自命令行参数的 API Key");
        return (Some(key.to_string()), "命令行参数".to_string());
    }
    if let Ok(key) = std::env::var(constants::API_KEY_ENV) && !key.is_empty() {
        debug!("使用来自环境变量 {} 的 API Key", constants::API_KEY_ENV);
        return (Some(key), format!("环境变量 ({})", constants::API_KEY_ENV));
    }
    debug!("使用配置文件中的 API Key");
    (None, "配置文件".to_string())
}
