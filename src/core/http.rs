// ─── Transport ───
// Minimal HTTP surface used by the pipeline: GET, HEAD with
// If-Modified-Since, POST JSON/form. Everything goes through the
// `Transport` trait so tests can count and script requests.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING, DATE};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::core::error::{LauncherError, LauncherResult};

const APP_USER_AGENT: &str = concat!("Ironlaunch/", env!("CARGO_PKG_VERSION"));

pub fn build_http_client() -> Result<Client, reqwest::Error> {
    let mut default_headers = HeaderMap::new();
    default_headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));

    Client::builder()
        .user_agent(APP_USER_AGENT)
        .default_headers(default_headers)
        .build()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Head,
    Post,
}

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct HttpResponse {
    pub status: u16,
    /// Parsed `Date` header, used to stamp cached files.
    pub date: Option<DateTime<Utc>>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// One request in, one response out. Non-2xx statuses are returned as
/// responses; only failures below HTTP become `LauncherError::Network`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> LauncherResult<HttpResponse>;
}

pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> LauncherResult<Self> {
        let client = build_http_client().map_err(|e| LauncherError::Network(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> LauncherResult<HttpResponse> {
        let method = request.method;
        let mut builder = match method {
            Method::Get => self.client.get(&request.url),
            Method::Head => self.client.head(&request.url),
            Method::Post => self.client.post(&request.url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| LauncherError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        let date = response
            .headers()
            .get(DATE)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_http_date);

        let mut body = Vec::new();
        if method != Method::Head {
            let mut stream = response.bytes_stream();
            while let Some(chunk) = stream.next().await {
                let chunk = chunk.map_err(|e| LauncherError::Network(e.to_string()))?;
                body.extend_from_slice(&chunk);
            }
        }

        debug!("{:?} {} -> {} ({} bytes)", method, request.url, status, body.len());
        Ok(HttpResponse { status, date, body })
    }
}

/// Status-aware helpers over a shared transport.
#[derive(Clone)]
pub struct Http {
    transport: Arc<dyn Transport>,
}

impl Http {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Production client backed by reqwest.
    pub fn reqwest() -> LauncherResult<Self> {
        Ok(Self::new(Arc::new(ReqwestTransport::new()?)))
    }

    /// Send without interpreting the status code.
    pub async fn send(&self, request: HttpRequest) -> LauncherResult<HttpResponse> {
        self.transport.send(request).await
    }

    async fn send_checked(&self, request: HttpRequest) -> LauncherResult<HttpResponse> {
        let url = request.url.clone();
        let response = self.transport.send(request).await?;
        if !response.is_success() {
            return Err(LauncherError::HttpStatus {
                url,
                status: response.status,
            });
        }
        Ok(response)
    }

    pub async fn get_bytes(&self, url: &str) -> LauncherResult<Vec<u8>> {
        Ok(self
            .send_checked(HttpRequest::new(Method::Get, url))
            .await?
            .body)
    }

    /// GET a text document together with the server's `Date` header.
    pub async fn get_text_with_date(
        &self,
        url: &str,
    ) -> LauncherResult<(String, Option<DateTime<Utc>>)> {
        let response = self.send_checked(HttpRequest::new(Method::Get, url)).await?;
        let text = String::from_utf8(response.body)
            .map_err(|e| LauncherError::Network(format!("{url} returned invalid UTF-8: {e}")))?;
        Ok((text, response.date))
    }

    /// Conditional HEAD. Returns the raw status so callers can tell 200 from 304.
    pub async fn head_if_modified_since(
        &self,
        url: &str,
        since: DateTime<Utc>,
    ) -> LauncherResult<u16> {
        let request = HttpRequest::new(Method::Head, url)
            .header("If-Modified-Since", format_http_date(since));
        Ok(self.transport.send(request).await?.status)
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        headers: &[(&str, &str)],
    ) -> LauncherResult<T> {
        let mut request = HttpRequest::new(Method::Get, url).header("Accept", "application/json");
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        let response = self.send_checked(request).await?;
        Ok(serde_json::from_slice(&response.body)?)
    }

    pub async fn post_json<B, T>(
        &self,
        url: &str,
        body: &B,
        headers: &[(&str, &str)],
    ) -> LauncherResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut request = HttpRequest::new(Method::Post, url)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .body(serde_json::to_vec(body)?);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        let response = self.send_checked(request).await?;
        Ok(serde_json::from_slice(&response.body)?)
    }

    /// POST an urlencoded form. The response is returned unchecked because
    /// OAuth endpoints report pending states through 4xx bodies.
    pub async fn post_form(
        &self,
        url: &str,
        fields: &[(&str, &str)],
    ) -> LauncherResult<HttpResponse> {
        let body = fields
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        let request = HttpRequest::new(Method::Post, url)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .header("Accept", "application/json")
            .body(body.into_bytes());
        self.transport.send(request).await
    }
}

pub fn parse_http_date(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(raw.trim())
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

/// RFC 1123 form required by `If-Modified-Since`.
pub fn format_http_date(date: DateTime<Utc>) -> String {
    date.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}
