//! Blocking REST client for the book/log service.

use std::collections::HashSet;

use booklog_application::LogBackend;
use booklog_core::{Book, LogId, LogPayload, ReadingLog, Settings};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::{Method, StatusCode, header};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

pub const BOOKS_PATH: &str = "/api/v1/books/";
pub const LOGS_PATH: &str = "/logs/";

const USER_AGENT: &str = concat!("booklog/", env!("CARGO_PKG_VERSION"));

pub fn log_path(id: &LogId) -> String {
    format!("{LOGS_PATH}{id}/")
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("API base URL must start with http:// or https://, got {0:?}")]
    BaseUrl(String),
    #[error("build http client")]
    Client(#[source] reqwest::Error),
    #[error("{method} {url} failed")]
    Transport {
        method: Method,
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{method} {url} returned {status}: {body}")]
    Status {
        method: Method,
        url: String,
        status: StatusCode,
        body: String,
    },
    #[error("decode response from {url}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// List endpoints answer either with a bare array or a page envelope.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Collection<T> {
    Plain(Vec<T>),
    Page {
        results: Vec<T>,
        #[serde(default)]
        next: Option<String>,
    },
}

impl<T> Collection<T> {
    pub fn into_parts(self) -> (Vec<T>, Option<String>) {
        match self {
            Collection::Plain(items) => (items, None),
            Collection::Page { results, next } => (results, next),
        }
    }
}

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("has_token", &self.token.is_some())
            .finish()
    }
}

impl ApiClient {
    pub fn new(settings: &Settings) -> Result<Self, ApiError> {
        let mut settings = settings.clone();
        settings.normalize();
        let base_url = settings.api_base_url;
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ApiError::BaseUrl(base_url));
        }

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(ApiError::Client)?;

        info!(base_url = %base_url, has_token = settings.access_token.is_some(), "api client ready");
        Ok(Self {
            client,
            base_url,
            token: settings.access_token,
        })
    }

    /// Joins `path` onto the base URL; absolute URLs (pagination links) pass through.
    pub fn build_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, url)
            .header(header::ACCEPT, "application/json");
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn send(&self, method: Method, url: &str, builder: RequestBuilder) -> Result<Response, ApiError> {
        debug!(%method, url, "request");
        let response = builder.send().map_err(|source| ApiError::Transport {
            method: method.clone(),
            url: url.to_string(),
            source,
        })?;

        let status = response.status();
        debug!(%method, url, %status, "response");
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().unwrap_or_else(|err| {
            debug!(%method, url, error = %err, "failed to read error body");
            String::new()
        });
        Err(ApiError::Status {
            method,
            url: url.to_string(),
            status,
            body: body.trim().to_string(),
        })
    }

    fn decode<T: DeserializeOwned>(url: &str, response: Response) -> Result<T, ApiError> {
        response.json::<T>().map_err(|source| ApiError::Decode {
            url: url.to_string(),
            source,
        })
    }

    /// Fetches every page of a list endpoint.
    fn fetch_collection<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, ApiError> {
        let mut items = Vec::new();
        let mut seen = HashSet::new();
        let mut next = Some(self.build_url(path));

        while let Some(url) = next.take() {
            if !seen.insert(url.clone()) {
                break;
            }
            let response = self.send(Method::GET, &url, self.request(Method::GET, &url))?;
            let (page, link) = Self::decode::<Collection<T>>(&url, response)?.into_parts();
            items.extend(page);
            next = link.map(|link| self.build_url(&link));
        }

        Ok(items)
    }

    pub fn fetch_books(&self) -> Result<Vec<Book>, ApiError> {
        self.fetch_collection(BOOKS_PATH)
    }

    pub fn fetch_logs(&self) -> Result<Vec<ReadingLog>, ApiError> {
        self.fetch_collection(LOGS_PATH)
    }

    /// A 2xx is enough; the body (possibly empty) is not read.
    pub fn post_log(&self, payload: &LogPayload) -> Result<(), ApiError> {
        let url = self.build_url(LOGS_PATH);
        let builder = self.request(Method::POST, &url).json(payload);
        self.send(Method::POST, &url, builder)?;
        Ok(())
    }

    pub fn patch_log(&self, id: &LogId, payload: &LogPayload) -> Result<(), ApiError> {
        let url = self.build_url(&log_path(id));
        let builder = self.request(Method::PATCH, &url).json(payload);
        self.send(Method::PATCH, &url, builder)?;
        Ok(())
    }

    pub fn remove_log(&self, id: &LogId) -> Result<(), ApiError> {
        let url = self.build_url(&log_path(id));
        self.send(Method::DELETE, &url, self.request(Method::DELETE, &url))?;
        Ok(())
    }
}

impl LogBackend for ApiClient {
    fn list_books(&self) -> anyhow::Result<Vec<Book>> {
        Ok(self.fetch_books()?)
    }

    fn list_logs(&self) -> anyhow::Result<Vec<ReadingLog>> {
        Ok(self.fetch_logs()?)
    }

    fn create_log(&self, payload: &LogPayload) -> anyhow::Result<()> {
        Ok(self.post_log(payload)?)
    }

    fn update_log(&self, id: &LogId, payload: &LogPayload) -> anyhow::Result<()> {
        Ok(self.patch_log(id, payload)?)
    }

    fn delete_log(&self, id: &LogId) -> anyhow::Result<()> {
        Ok(self.remove_log(id)?)
    }
}
