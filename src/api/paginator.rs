use async_trait::async_trait;
use serde_json::Value;
use tokio::time::{sleep, Duration};

use crate::error::{Error, Result};

/// Outcome of a single page attempt, classified by the transport layer.
#[derive(Debug)]
pub enum PageFetch {
    /// Successful page: the decoded record array plus `meta.total` if the
    /// endpoint reports one.
    Page {
        records: Vec<Value>,
        total: Option<u64>,
    },
    Unauthorized,
    RateLimited,
    TimedOut,
    /// Response body was not valid JSON of the expected shape.
    Malformed(String),
    /// Terminal non-success status.
    Failed(String),
}

/// One paged list endpoint, already bound to its filter.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(&self, page: u32, limit: u32) -> PageFetch;

    /// Replaces the credential after a 401. Failure here is fatal.
    async fn refresh_auth(&self) -> Result<()>;
}

/// Result of draining one endpoint.
///
/// `complete == false` means the fetch ended early (timeout exhaustion,
/// terminal API error, undecodable body) and the records are possibly a
/// prefix of the full result set. Callers must not treat a short result
/// as confirmed success.
#[derive(Debug)]
pub struct FetchOutcome {
    pub records: Vec<Value>,
    pub complete: bool,
}

/// Sequential page-by-page fetch loop with retry, refresh and backoff.
///
/// Pagination is strictly sequential: each page's request depends on
/// whether the previous page was the last, and a 401 needs a blocking
/// credential refresh before the same page is retried.
pub struct Paginator {
    page_size: u32,
    max_timeout_attempts: u32,
    timeout_backoff: Duration,
    rate_limit_delay: Duration,
    page_delay: Duration,
}

impl Paginator {
    pub fn new(page_size: u32) -> Self {
        Self {
            page_size,
            max_timeout_attempts: 3,
            timeout_backoff: Duration::from_secs(5),
            rate_limit_delay: Duration::from_secs(10),
            page_delay: Duration::from_millis(200),
        }
    }

    /// Overrides the fixed delays. Tests use zero delays.
    pub fn with_delays(
        mut self,
        timeout_backoff: Duration,
        rate_limit_delay: Duration,
        page_delay: Duration,
    ) -> Self {
        self.timeout_backoff = timeout_backoff;
        self.rate_limit_delay = rate_limit_delay;
        self.page_delay = page_delay;
        self
    }

    /// Drains `source` starting at page 1 and returns the concatenation of
    /// all record arrays seen.
    ///
    /// The only error surfaced once paging has begun is authentication
    /// failure; every other condition degrades to a partial result.
    pub async fn collect<S: PageSource + ?Sized>(&self, source: &S) -> Result<FetchOutcome> {
        let mut records: Vec<Value> = Vec::new();
        let mut page: u32 = 1;
        let mut previous_page: Option<Vec<Value>> = None;
        let mut total: Option<u64> = None;
        let mut timeout_attempts: u32 = 0;
        let mut refreshed_this_page = false;

        loop {
            match source.fetch_page(page, self.page_size).await {
                PageFetch::TimedOut => {
                    timeout_attempts += 1;
                    if timeout_attempts >= self.max_timeout_attempts {
                        tracing::warn!(
                            "Page {} timed out {} times, keeping {} records",
                            page,
                            timeout_attempts,
                            records.len()
                        );
                        return Ok(FetchOutcome {
                            records,
                            complete: false,
                        });
                    }
                    tracing::debug!(
                        "Page {} timed out (attempt {}), retrying",
                        page,
                        timeout_attempts
                    );
                    sleep(self.timeout_backoff).await;
                }
                PageFetch::Unauthorized => {
                    if refreshed_this_page {
                        return Err(Error::Auth(format!(
                            "Still unauthorized after token refresh on page {}",
                            page
                        )));
                    }
                    tracing::info!("Token rejected on page {}, refreshing", page);
                    source.refresh_auth().await?;
                    refreshed_this_page = true;
                }
                PageFetch::RateLimited => {
                    tracing::info!(
                        "Rate limited on page {}, waiting {:?}",
                        page,
                        self.rate_limit_delay
                    );
                    sleep(self.rate_limit_delay).await;
                }
                PageFetch::Malformed(reason) => {
                    tracing::warn!(
                        "Undecodable body on page {} ({}), keeping {} records",
                        page,
                        reason,
                        records.len()
                    );
                    return Ok(FetchOutcome {
                        records,
                        complete: false,
                    });
                }
                PageFetch::Failed(reason) => {
                    tracing::warn!(
                        "Page {} failed ({}), keeping {} records",
                        page,
                        reason,
                        records.len()
                    );
                    return Ok(FetchOutcome {
                        records,
                        complete: false,
                    });
                }
                PageFetch::Page {
                    records: page_records,
                    total: page_total,
                } => {
                    timeout_attempts = 0;
                    refreshed_this_page = false;

                    if total.is_none() {
                        total = page_total;
                    }

                    // Some endpoints repeat the last page instead of
                    // returning empty. An identical consecutive page is a
                    // terminal condition, not new data.
                    if previous_page.as_ref() == Some(&page_records) {
                        tracing::debug!("Page {} repeats page {}, stopping", page, page - 1);
                        break;
                    }

                    if page_records.is_empty() {
                        break;
                    }

                    let count = page_records.len();
                    tracing::debug!("Received {} records on page {}", count, page);

                    previous_page = Some(page_records.clone());
                    records.extend(page_records);

                    if let Some(expected) = total {
                        if records.len() as u64 >= expected {
                            tracing::debug!("Reached meta.total ({}), stopping", expected);
                            break;
                        }
                    }

                    if count < self.page_size as usize {
                        break;
                    }

                    page += 1;
                    sleep(self.page_delay).await;
                }
            }
        }

        Ok(FetchOutcome {
            records,
            complete: true,
        })
    }
}
