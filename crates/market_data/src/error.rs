use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("rate limited, gave up after {0} retries")]
    RateLimited(u32),

    #[error("chart API error: {code} - {description}")]
    Api { code: String, description: String },

    #[error("no price data returned for {0}")]
    NoData(String),

    #[error("malformed response: {0}")]
    Malformed(String),
}
