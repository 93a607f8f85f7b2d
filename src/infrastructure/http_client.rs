//! HTTP 客户端 - 基础设施层
//!
//! 唯一持有 `reqwest::Client` 的地方，只暴露"取一个页面的文本"的能力

use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use crate::error::{AppError, AppResult, SearchError};

/// HTTP 客户端
///
/// `reqwest::Client` 内部使用 Arc，clone 开销很小
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// 创建带统一 User-Agent 和超时的客户端
    pub fn new(user_agent: &str, timeout: Duration) -> AppResult<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;

        Ok(Self { client })
    }

    /// GET 并返回响应文本
    pub async fn get_text(&self, url: &str) -> AppResult<String> {
        self.get_text_with_query(url, &[]).await
    }

    /// 带查询参数的 GET
    pub async fn get_text_with_query(&self, url: &str, query: &[(&str, &str)]) -> AppResult<String> {
        debug!("GET {} {:?}", url, query);

        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| AppError::request_failed(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Search(SearchError::BadStatus {
                url: url.to_string(),
                status: status.as_u16(),
            }));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AppError::request_failed(url, e))?;

        debug!("GET {} 完成, {} 字节", url, body.len());
        Ok(body)
    }
}
