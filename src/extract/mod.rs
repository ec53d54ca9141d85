//! Page text extraction.
//!
//! [`PageFetcher`] downloads a page the way a browser would and hands the
//! markup to [`html::extract_text`]. Every failure is classified into a
//! [`FetchError`] that carries its own user-facing message and HTTP status.

pub mod html;

use std::error::Error as _;
use std::time::Duration;

use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{StatusCode, Url, redirect};
use serde::Serialize;
use tracing::{instrument, warn};

use crate::telemetry;
pub use html::{MIN_TEXT_CHARS, extract_text};

/// Default page download timeout.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(15);

/// Redirects followed before giving up.
pub const MAX_REDIRECTS: usize = 5;

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
(KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Why a page could not be turned into text.
///
/// The `Display` text is safe to show to end users.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("URL is required")]
    MissingUrl,

    #[error("Invalid URL format")]
    InvalidUrl,

    #[error("Site not found. Check that the URL is correct.")]
    DnsFailure,

    #[error("The site took too long to respond.")]
    Timeout,

    #[error("Access denied. The site blocks automated requests.")]
    Forbidden,

    #[error("Page not found (404). Check the link.")]
    PageNotFound,

    #[error("The site's server returned an error. Try again later.")]
    UpstreamServer(u16),

    #[error("Failed to load the page (status {0})")]
    Status(u16),

    #[error("Could not connect to the site.")]
    ConnectionRefused,

    #[error("Could not extract meaningful text from URL")]
    NoMeaningfulText,

    /// Anything else; the detail is for logs only.
    #[error("Could not load the URL content. Try another link.")]
    Other(String),
}

impl FetchError {
    /// HTTP status reported to the client for this failure.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::MissingUrl | Self::InvalidUrl | Self::NoMeaningfulText => 400,
            Self::DnsFailure | Self::PageNotFound => 404,
            Self::Timeout => 408,
            Self::Forbidden => 403,
            Self::UpstreamServer(_) => 502,
            Self::Status(status) => *status,
            Self::ConnectionRefused => 503,
            Self::Other(_) => 500,
        }
    }

    /// Short label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingUrl => "missing_url",
            Self::InvalidUrl => "invalid_url",
            Self::DnsFailure => "dns",
            Self::Timeout => "timeout",
            Self::Forbidden => "forbidden",
            Self::PageNotFound => "not_found",
            Self::UpstreamServer(_) => "upstream_server",
            Self::Status(_) => "status",
            Self::ConnectionRefused => "connection_refused",
            Self::NoMeaningfulText => "no_text",
            Self::Other(_) => "other",
        }
    }

    fn from_status(status: StatusCode) -> Self {
        match status.as_u16() {
            403 => Self::Forbidden,
            404 => Self::PageNotFound,
            s if s >= 500 => Self::UpstreamServer(s),
            s => Self::Status(s),
        }
    }

    fn from_transport(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::Timeout;
        }

        let mut source = err.source();
        while let Some(cause) = source {
            if let Some(io) = cause.downcast_ref::<std::io::Error>() {
                match io.kind() {
                    std::io::ErrorKind::ConnectionRefused => return Self::ConnectionRefused,
                    std::io::ErrorKind::TimedOut => return Self::Timeout,
                    _ => {}
                }
            }
            let text = cause.to_string().to_ascii_lowercase();
            if text.contains("dns error")
                || text.contains("failed to lookup address")
                || text.contains("name or service not known")
            {
                return Self::DnsFailure;
            }
            if text.contains("connection refused") {
                return Self::ConnectionRefused;
            }
            source = cause.source();
        }

        Self::Other(err.to_string())
    }
}

/// Cleaned text of a fetched page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchedPage {
    pub text: String,
    /// The normalized URL that was requested.
    pub url: String,
}

/// Normalize user input into an absolute URL.
///
/// Input that does not start with `http` gets `https://` prepended.
pub fn normalize_url(input: &str) -> Result<Url, FetchError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(FetchError::MissingUrl);
    }
    let candidate = if input.starts_with("http") {
        input.to_string()
    } else {
        format!("https://{input}")
    };
    let url = Url::parse(&candidate).map_err(|_| FetchError::InvalidUrl)?;
    if url.host_str().is_none() {
        return Err(FetchError::InvalidUrl);
    }
    Ok(url)
}

/// Downloads pages and extracts their readable text.
#[derive(Debug, Clone)]
pub struct PageFetcher {
    http: reqwest::Client,
}

impl PageFetcher {
    pub fn new(timeout: Duration) -> crate::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(browser_headers())
            .timeout(timeout)
            .redirect(redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(|e| crate::HuginnError::Configuration(e.to_string()))?;
        Ok(Self { http })
    }

    /// Fetch `url` and return its readable text.
    #[instrument(name = "extract.fetch", skip(self))]
    pub async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let result = self.fetch_inner(url).await;
        let outcome = match &result {
            Ok(_) => "ok",
            Err(e) => {
                warn!(kind = e.kind(), error = %e, "page fetch failed");
                e.kind()
            }
        };
        metrics::counter!(telemetry::PAGE_FETCHES_TOTAL, "outcome" => outcome).increment(1);
        result
    }

    async fn fetch_inner(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let url = normalize_url(url)?;

        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|e| FetchError::from_transport(&e))?;

        let status = response.status();
        if !(status.is_success() || status.is_redirection()) {
            return Err(FetchError::from_status(status));
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::from_transport(&e))?;

        let text = extract_text(&body);
        if text.chars().count() < MIN_TEXT_CHARS {
            return Err(FetchError::NoMeaningfulText);
        }

        Ok(FetchedPage {
            text,
            url: url.to_string(),
        })
    }
}

fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("en-US,en;q=0.9"),
    );
    headers.insert(
        header::UPGRADE_INSECURE_REQUESTS,
        HeaderValue::from_static("1"),
    );
    headers.insert("sec-fetch-dest", HeaderValue::from_static("document"));
    headers.insert("sec-fetch-mode", HeaderValue::from_static("navigate"));
    headers.insert("sec-fetch-site", HeaderValue::from_static("none"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("max-age=0"));
    headers
}
