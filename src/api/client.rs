use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::api::auth::TokenManager;
use crate::api::paginator::{FetchOutcome, PageFetch, PageSource, Paginator};
use crate::config::Config;
use crate::error::Result;

/// How a list endpoint takes its pagination parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListMethod {
    /// JSON body carrying the filter plus `page`/`limit`.
    Post,
    /// `page`/`limit` as query parameters.
    Get,
}

#[derive(Deserialize)]
struct ListResponse {
    #[serde(default)]
    data: Vec<Value>,
    #[serde(default)]
    meta: Option<ListMeta>,
}

#[derive(Deserialize)]
struct ListMeta {
    total: Option<u64>,
}

/// HTTP client bound to one Indecab API host.
pub struct ApiClient {
    http: Client,
    base_url: String,
    tokens: TokenManager,
}

impl ApiClient {
    pub fn new(config: &Config) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_static("indecab-export/0.1"),
        );

        let http = Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
            .build()?;

        let tokens = TokenManager::new(
            http.clone(),
            &config.base_url,
            &config.email,
            &config.password,
        );

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            tokens,
        })
    }

    /// Drains one paged list endpoint with the given filter.
    pub async fn fetch_list(
        &self,
        endpoint: &str,
        method: ListMethod,
        filter: Map<String, Value>,
        paginator: &Paginator,
    ) -> Result<FetchOutcome> {
        let source = HttpPageSource {
            http: &self.http,
            tokens: &self.tokens,
            url: format!("{}/{}", self.base_url, endpoint),
            method,
            filter,
        };
        paginator.collect(&source).await
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }
}

struct HttpPageSource<'a> {
    http: &'a Client,
    tokens: &'a TokenManager,
    url: String,
    method: ListMethod,
    filter: Map<String, Value>,
}

#[async_trait]
impl PageSource for HttpPageSource<'_> {
    async fn fetch_page(&self, page: u32, limit: u32) -> PageFetch {
        let credential = match self.tokens.get_valid().await {
            Ok(credential) => credential,
            // Let the paginator route this through refresh_auth, where a
            // second failure becomes fatal.
            Err(_) => return PageFetch::Unauthorized,
        };

        tracing::debug!("Requesting {} page {} (limit {})", self.url, page, limit);

        let request = match self.method {
            ListMethod::Post => {
                let mut body = self.filter.clone();
                body.insert("page".to_string(), Value::from(page));
                body.insert("limit".to_string(), Value::from(limit));
                self.http.post(&self.url).json(&body)
            }
            ListMethod::Get => self.http.get(&self.url).query(&[
                ("page", page.to_string()),
                ("limit", limit.to_string()),
            ]),
        };

        let response = match request
            .header("X-User-Id", &credential.user_id)
            .header("X-Auth-Token", &credential.auth_token)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) if e.is_timeout() => return PageFetch::TimedOut,
            Err(e) => return PageFetch::Failed(e.to_string()),
        };

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return PageFetch::Unauthorized;
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if body.to_lowercase().contains("rate limit") {
                return PageFetch::RateLimited;
            }
            let snippet: String = body.chars().take(500).collect();
            return PageFetch::Failed(format!("{}: {}", status, snippet));
        }

        match response.json::<ListResponse>().await {
            Ok(list) => PageFetch::Page {
                records: list.data,
                total: list.meta.and_then(|m| m.total),
            },
            Err(e) => PageFetch::Malformed(e.to_string()),
        }
    }

    async fn refresh_auth(&self) -> Result<()> {
        self.tokens.refresh().await.map(|_| ())
    }
}
