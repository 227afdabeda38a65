use thiserror::Error;

#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("invalid URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("missing field: {field}")]
    MissingField { field: &'static str },

    #[error("attribute \"{attribute}\" not found on {url}")]
    AttributeNotFound { attribute: String, url: String },

    #[error("HTTP error for {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("failed to build HTTP client: {reason}")]
    ClientBuild { reason: String },

    #[error("invalid selector \"{selector}\": {reason}")]
    InvalidSelector { selector: String, reason: String },
}

impl CrawlError {
    /// Network failures and non-2xx responses. These abort the listing stage
    /// but only cost a single record during enrichment.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::UnexpectedStatus { .. })
    }
}

pub type Result<T> = std::result::Result<T, CrawlError>;
