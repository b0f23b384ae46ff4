use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use rand::seq::SliceRandom;
use reqwest::{header::CONTENT_TYPE, redirect, Client, ClientBuilder, Response};
use url::Url;

use crate::{
    configuration::ScraperSettings,
    domain::{ensure_public_url, FetchedPage},
};

const DEFAULT_USER_AGENT: &str = concat!("siteprobe/", env!("CARGO_PKG_VERSION"));
const MAX_REDIRECTS: usize = 10;

#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} responded with HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("{url} body exceeds the limit of {limit} bytes")]
    BodyTooLarge { url: String, limit: usize },
    #[error("{url} returned unsupported content type '{content_type}'")]
    UnsupportedContentType { url: String, content_type: String },
    #[error("refused to fetch {url}: {reason}")]
    Blocked { url: String, reason: String },
}

#[derive(thiserror::Error, Debug)]
#[error("{0}")]
struct BlockedRedirect(String);

impl FetchError {
    fn is_retryable(&self) -> bool {
        match self {
            FetchError::Request { .. } => true,
            FetchError::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

pub struct Fetcher {
    client: Client,
    user_agents: Vec<String>,
    retries: u32,
    retry_backoff: Duration,
    max_body_bytes: usize,
    allow_private_hosts: bool,
}

impl Fetcher {
    pub fn new(settings: &ScraperSettings) -> Result<Self, reqwest::Error> {
        Self::with_client_builder(settings, Client::builder())
    }

    fn with_client_builder(
        settings: &ScraperSettings,
        builder: ClientBuilder,
    ) -> Result<Self, reqwest::Error> {
        let client = builder
            .timeout(settings.timeout())
            .redirect(redirect_policy(settings.allow_private_hosts))
            .cookie_store(true)
            .build()?;

        Ok(Fetcher {
            client,
            user_agents: settings.user_agents.clone(),
            retries: settings.retries,
            retry_backoff: Duration::from_millis(settings.retry_backoff_ms),
            max_body_bytes: settings.max_body_bytes,
            allow_private_hosts: settings.allow_private_hosts,
        })
    }

    fn guard(&self, url: &str) -> Result<(), FetchError> {
        if self.allow_private_hosts {
            return Ok(());
        }
        let parsed = Url::parse(url).map_err(|e| FetchError::Blocked {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        check_host(&parsed, self.allow_private_hosts).map_err(|reason| FetchError::Blocked {
            url: url.to_string(),
            reason,
        })
    }

    fn user_agent(&self) -> &str {
        self.user_agents
            .choose(&mut rand::thread_rng())
            .map(String::as_str)
            .unwrap_or(DEFAULT_USER_AGENT)
    }

    /// Fetches an HTML page, retrying transport errors and 5xx responses.
    pub async fn fetch_page(&self, url: &str) -> Result<FetchedPage, FetchError> {
        self.guard(url)?;
        let mut attempt = 0;

        loop {
            match self.fetch_once(url).await {
                Ok(page) => return Ok(page),
                Err(e) if e.is_retryable() && attempt < self.retries => {
                    attempt += 1;
                    log::warn!(
                        "Fetch attempt {} for {} failed, retrying: {}",
                        attempt,
                        url,
                        e
                    );
                    tokio::time::sleep(self.retry_backoff * attempt).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn fetch_once(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let started = Instant::now();
        let response = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, self.user_agent())
            .send()
            .await
            .map_err(|source| request_error(url, source))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        if let Some(content_type) = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
        {
            if !is_textual(content_type) {
                return Err(FetchError::UnsupportedContentType {
                    url: url.to_string(),
                    content_type: content_type.to_string(),
                });
            }
        }

        let final_url = response.url().clone();
        let headers = collect_headers(&response);
        let body = self.read_body(url, response).await?;

        Ok(FetchedPage {
            requested_url: url.to_string(),
            final_url,
            status: status.as_u16(),
            headers,
            body: String::from_utf8_lossy(&body).into_owned(),
            elapsed: started.elapsed(),
        })
    }

    /// Downloads a single asset without content-type checks or retries.
    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.guard(url)?;
        let response = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, self.user_agent())
            .send()
            .await
            .map_err(|source| request_error(url, source))?;

        if !response.status().is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        self.read_body(url, response).await
    }

    async fn read_body(&self, url: &str, mut response: Response) -> Result<Vec<u8>, FetchError> {
        let too_large = || FetchError::BodyTooLarge {
            url: url.to_string(),
            limit: self.max_body_bytes,
        };

        if response
            .content_length()
            .is_some_and(|len| len as usize > self.max_body_bytes)
        {
            return Err(too_large());
        }

        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|source| FetchError::Request {
                url: url.to_string(),
                source,
            })?
        {
            if body.len() + chunk.len() > self.max_body_bytes {
                return Err(too_large());
            }
            body.extend_from_slice(&chunk);
        }

        Ok(body)
    }
}

fn check_host(url: &Url, allow_private_hosts: bool) -> Result<(), String> {
    if allow_private_hosts {
        return Ok(());
    }
    ensure_public_url(url)
}

/// Every redirect hop passes the same host check as the first request.
fn redirect_policy(allow_private_hosts: bool) -> redirect::Policy {
    redirect::Policy::custom(move |attempt| {
        if attempt.previous().len() >= MAX_REDIRECTS {
            return attempt.error("too many redirects");
        }
        match check_host(attempt.url(), allow_private_hosts) {
            Ok(()) => attempt.follow(),
            Err(reason) => {
                let refused = format!("redirect to {} refused. {}", attempt.url(), reason);
                attempt.error(BlockedRedirect(refused))
            }
        }
    })
}

fn request_error(url: &str, source: reqwest::Error) -> FetchError {
    let mut cause = std::error::Error::source(&source);
    while let Some(e) = cause {
        if let Some(blocked) = e.downcast_ref::<BlockedRedirect>() {
            return FetchError::Blocked {
                url: url.to_string(),
                reason: blocked.0.clone(),
            };
        }
        cause = e.source();
    }

    FetchError::Request {
        url: url.to_string(),
        source,
    }
}

fn is_textual(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    mime.is_empty() || mime.starts_with("text/") || mime == "application/xhtml+xml"
}

fn collect_headers(response: &Response) -> HashMap<String, Vec<String>> {
    let mut headers: HashMap<String, Vec<String>> = HashMap::new();
    for (name, value) in response.headers() {
        if let Ok(value) = value.to_str() {
            headers
                .entry(name.as_str().to_ascii_lowercase())
                .or_default()
                .push(value.to_string());
        }
    }
    headers
}
