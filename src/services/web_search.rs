//! 网页搜索服务 - 业务能力层
//!
//! 只负责"搜索"和"抓取页面文本"两种能力：
//! - 搜索：题干 → 最多 N 个结果 URL（带过期缓存）
//! - 抓取：URL → 纯文本
//! - 不判断答案，不关心流程顺序

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::error::{AppResult, SearchError};
use crate::infrastructure::html_text::html_to_text;
use crate::infrastructure::HttpClient;

/// 搜索结果链接（DuckDuckGo HTML 页面的 `result__a`）
static RESULT_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<a[^>]*class="[^"]*\bresult__a\b[^"]*"[^>]*href="([^"]+)"|<a[^>]*href="([^"]+)"[^>]*class="[^"]*\bresult__a\b"#)
        .expect("搜索结果正则无效")
});

#[derive(Debug, Clone)]
struct CachedResults {
    urls: Vec<String>,
    fetched_at: Instant,
}

/// 网页搜索服务
pub struct WebSearch {
    http: HttpClient,
    base_url: String,
    max_results: usize,
    quote_query: bool,
    cache_ttl: Duration,
    cache: Mutex<HashMap<String, CachedResults>>,
}

impl WebSearch {
    pub fn new(
        http: HttpClient,
        base_url: impl Into<String>,
        max_results: usize,
        quote_query: bool,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            max_results,
            quote_query,
            cache_ttl,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// 由题干构建查询语句
    pub fn build_query(&self, stem: &str) -> String {
        let stem = stem.trim();
        if self.quote_query && !stem.is_empty() {
            format!("\"{}\"", stem)
        } else {
            stem.to_string()
        }
    }

    /// 搜索题干，返回最多 `max_results` 个 URL
    pub async fn search(&self, stem: &str) -> AppResult<Vec<String>> {
        let query = self.build_query(stem);
        if query.is_empty() {
            return Err(SearchError::EmptyQuery.into());
        }

        if let Some(urls) = self.cached(&query) {
            debug!("命中搜索缓存: {}", query);
            return Ok(urls);
        }

        info!("🔍 正在搜索: {}", query);
        let html = self
            .http
            .get_text_with_query(&self.base_url, &[("q", query.as_str())])
            .await?;

        let urls = extract_result_urls(&html, self.max_results);
        info!("✓ 搜索完成，找到 {} 个结果", urls.len());

        self.store(query, urls.clone());
        Ok(urls)
    }

    fn cached(&self, query: &str) -> Option<Vec<String>> {
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        match cache.get(query) {
            Some(entry) if entry.fetched_at.elapsed() < self.cache_ttl => Some(entry.urls.clone()),
            Some(_) => {
                cache.remove(query);
                None
            }
            None => None,
        }
    }

    fn store(&self, query: String, urls: Vec<String>) {
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        cache.retain(|_, entry| entry.fetched_at.elapsed() < self.cache_ttl);
        cache.insert(
            query,
            CachedResults {
                urls,
                fetched_at: Instant::now(),
            },
        );
    }
}

/// 从搜索结果页中提取目标 URL
///
/// DuckDuckGo 的链接是 `//duckduckgo.com/l/?uddg=<编码后的目标>` 形式的跳转，需要还原。
pub fn extract_result_urls(html: &str, max_results: usize) -> Vec<String> {
    let mut urls: Vec<String> = Vec::new();

    for caps in RESULT_LINK.captures_iter(html) {
        let Some(href) = caps.get(1).or_else(|| caps.get(2)) else {
            continue;
        };
        let Some(url) = resolve_result_href(href.as_str()) else {
            continue;
        };
        if !urls.contains(&url) {
            urls.push(url);
        }
        if urls.len() >= max_results {
            break;
        }
    }

    urls
}

fn resolve_result_href(href: &str) -> Option<String> {
    let href = href.replace("&amp;", "&");
    let absolute = if href.starts_with("//") {
        format!("https:{}", href)
    } else {
        href
    };

    let parsed = Url::parse(&absolute).ok()?;
    let target = parsed
        .query_pairs()
        .find(|(key, _)| key == "uddg")
        .map(|(_, value)| value.into_owned())
        .unwrap_or_else(|| parsed.to_string());

    if target.starts_with("http://") || target.starts_with("https://") {
        Some(target)
    } else {
        None
    }
}

/// 页面抓取器
///
/// 超时由 `HttpClient` 控制，超时错误由调用方当作单个来源失败处理
#[derive(Debug, Clone)]
pub struct PageFetcher {
    http: HttpClient,
}

impl PageFetcher {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    /// 抓取页面并转换为纯文本
    pub async fn fetch_text(&self, url: &str) -> AppResult<String> {
        let html = self.http.get_text(url).await?;
        let text = html_to_text(&html);
        debug!("页面 {} 提取文本 {} 字符", url, text.chars().count());
        Ok(text)
    }
}
