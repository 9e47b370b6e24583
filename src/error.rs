// src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("认证失败 (API Key 无效或已过期)")]
    TokenInvalid,
    #[error("无权访问该资源: {0}")]
    Forbidden(String),
    #[error("资源不存在: {0}")]
    NotFound(String),
    #[error("尚未连接到 Canvas")]
    NotConnected,
    #[error("无法连接到 Canvas，请检查网址与 API Key 是否正确 (可运行 `cansync settings` 修改)")]
    ConnectionFailed,
    #[error("配置无效: {0}。请先运行 `cansync settings` 完成配置")]
    InvalidConfig(String),
    #[error("网络请求失败: {0}")]
    Network(#[from] reqwest::Error),
    #[error("网络中间件错误: {0}")]
    NetworkMiddleware(#[from] reqwest_middleware::Error),
    #[error("I/O 错误: {0}")]
    Io(#[from] std::io::Error),
    #[error("临时文件持久化失败: {0}")]
    TempFilePersist(#[from] tempfile::PersistError),
    #[error("JSON 解析错误: {0}")]
    Json(#[from] serde_json::Error),
    #[error("无法解析来自 '{url}' 的API响应: {source}")]
    ApiParseFailed {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("URL 解析错误: {0}")]
    Url(#[from] url::ParseError),
    #[error("正则表达式错误: {0}")]
    Regex(#[from] regex::Error),
    #[error("安全错误: {0}")]
    Security(String),
    #[error("用户中断")]
    UserInterrupt,
    #[error("{0}")] // 只打印内部信息，不加任何前缀
    UserInputError(String),
    #[error("未知错误: {0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// 资源被删除或无权访问。遍历时这类错误只影响当前节点。
    pub fn is_missing_resource(&self) -> bool {
        matches!(self, AppError::NotFound(_) | AppError::Forbidden(_))
    }
}

pub type AppResult<T> = Result<T, AppError>;
