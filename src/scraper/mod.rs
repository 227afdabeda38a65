use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{COOKIE, HeaderMap, HeaderName, HeaderValue};
use tracing::debug;

use crate::error::{CrawlError, Result};
use crate::scrapers::metro;
use crate::traits::PageFetcher;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Per-crawl request settings shared read-only by every fetch of that crawl.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    store_id: u32,
    in_stock: bool,
    user_agent: String,
    headers: Vec<(String, String)>,
    cookies: Vec<(String, String)>,
}

impl RequestContext {
    /// Metro browser headers and cookies, with `store_id` injected into the
    /// store cookie.
    #[must_use]
    pub fn metro(store_id: u32, in_stock: bool) -> Self {
        let mut cookies: Vec<(String, String)> = metro::BASE_COOKIES
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        cookies.insert(1, (metro::STORE_COOKIE.to_string(), store_id.to_string()));

        Self {
            store_id,
            in_stock,
            user_agent: metro::USER_AGENT.to_string(),
            headers: metro::BROWSER_HEADERS
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
            cookies,
        }
    }

    #[must_use]
    pub fn store_id(&self) -> u32 {
        self.store_id
    }

    #[must_use]
    pub fn in_stock(&self) -> bool {
        self.in_stock
    }

    #[must_use]
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Value of the `Cookie` request header.
    #[must_use]
    pub fn cookie_header(&self) -> String {
        self.cookies
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("; ")
    }

    fn header_map(&self) -> Result<HeaderMap> {
        let mut map = HeaderMap::with_capacity(self.headers.len() + 1);
        for (name, value) in &self.headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                CrawlError::ClientBuild {
                    reason: format!("header name {name:?}: {e}"),
                }
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| CrawlError::ClientBuild {
                reason: format!("header {}: {e}", name.as_str()),
            })?;
            map.insert(name, value);
        }

        let cookie =
            HeaderValue::from_str(&self.cookie_header()).map_err(|e| CrawlError::ClientBuild {
                reason: format!("cookie header: {e}"),
            })?;
        map.insert(COOKIE, cookie);
        Ok(map)
    }
}

/// Connection-reusing HTTP fetcher bound to one [`RequestContext`].
///
/// Dropping it releases the pooled connections.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Creates a client that sends the context's headers and cookies on
    /// every request and gives up on a request after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError::ClientBuild`] if a header is not a valid HTTP
    /// header or the client cannot be constructed.
    pub fn new(context: &RequestContext, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(context.user_agent())
            .default_headers(context.header_map()?)
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(10)))
            .build()
            .map_err(|e| CrawlError::ClientBuild {
                reason: e.to_string(),
            })?;

        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch_html(&self, url: &str) -> Result<String> {
        debug!(url, "GET");

        let transport = |source: reqwest::Error| CrawlError::Transport {
            url: url.to_string(),
            source,
        };

        let response = self.client.get(url).send().await.map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(CrawlError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        response.text().await.map_err(transport)
    }
}
