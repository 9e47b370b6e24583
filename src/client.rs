// src/client.rs

use crate::{config::AppConfig, constants, error::*, models::api::PaginationLinks};
use futures::StreamExt;
use log::{debug, trace};
use reqwest::{
    IntoUrl, Response, StatusCode,
    header::{self, HeaderMap, HeaderValue},
};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use serde::de::DeserializeOwned;
use std::io::Write;
use url::Url;

#[derive(Clone)]
pub struct RobustClient {
    pub client: ClientWithMiddleware,
    base_url: Url,
}

impl RobustClient {
    pub fn new(config: &AppConfig) -> AppResult<Self> {
        // 保证以 '/' 结尾，否则 join 会丢掉最后一段路径
        let base_url = Url::parse(&format!("{}/", config.base_url.trim_end_matches('/')))?;

        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.api_key))
            .map_err(|_| AppError::TokenInvalid)?;
        auth.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, auth);

        let retry_policy =
            ExponentialBackoff::builder().build_with_max_retries(config.max_retries);
        let client = ClientBuilder::new(
            reqwest::Client::builder()
                .user_agent(config.user_agent.clone())
                .default_headers(headers)
                .connect_timeout(config.connect_timeout)
                .timeout(config.timeout)
                .build()?,
        )
        .with(RetryTransientMiddleware::new_with_policy(retry_policy))
        .build();

        Ok(Self { client, base_url })
    }

    pub fn endpoint(&self, path: &str) -> AppResult<Url> {
        Ok(self.base_url.join(path)?)
    }

    pub async fn get<T: IntoUrl>(&self, url: T) -> AppResult<Response> {
        let res = self.client.get(url).send().await?;
        check_status(res)
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> AppResult<T> {
        let url = self.endpoint(path)?;
        debug!("GET {}", url);
        let res = self.get(url).await?;
        decode(res).await
    }

    /// 按 `Link` 头逐页获取列表，直到没有 next 为止
    pub async fn get_paginated<T: DeserializeOwned>(&self, path: &str) -> AppResult<Vec<T>> {
        let mut first = self.endpoint(path)?;
        first
            .query_pairs_mut()
            .append_pair("per_page", &constants::PER_PAGE.to_string());

        let mut items = Vec::new();
        let mut next = Some(first);
        while let Some(url) = next.take() {
            debug!("GET {}", url);
            let res = self.get(url).await?;
            next = res
                .headers()
                .get(header::LINK)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| PaginationLinks::parse(v).next)
                .map(|n| Url::parse(&n))
                .transpose()?;
            let page: Vec<T> = decode(res).await?;
            trace!("本页 {} 条，是否还有下一页: {}", page.len(), next.is_some());
            items.extend(page);
        }
        Ok(items)
    }

    /// 将响应体流式写入 `out`，返回写入的字节数
    pub async fn download_to(&self, url: &str, out: &mut std::fs::File) -> AppResult<u64> {
        let res = self.get(url).await?;
        let mut written = 0u64;
        let mut stream = res.bytes_stream();
        while let Some(chunk_result) = stream.next().await {
            let chunk = chunk_result?;
            out.write_all(&chunk)?;
            written += chunk.len() as u64;
        }
        out.flush()?;
        Ok(written)
    }
}

fn check_status(res: Response) -> AppResult<Response> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    let url = res.url().to_string();
    match status {
        // 只有带 WWW-Authenticate 的 401 才是 Token 问题，其余是权限不足
        StatusCode::UNAUTHORIZED if res.headers().contains_key(header::WWW_AUTHENTICATE) => {
            Err(AppError::TokenInvalid)
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(AppError::Forbidden(url)),
        StatusCode::NOT_FOUND => Err(AppError::NotFound(url)),
        _ => Ok(res.error_for_status()?),
    }
}

async fn decode<T: DeserializeOwned>(res: Response) -> AppResult<T> {
    let url = res.url().to_string();
    let text = res.text().await?;
    serde_json::from_str(&text).map_err(|source| AppError::ApiParseFailed { url, source })
}
