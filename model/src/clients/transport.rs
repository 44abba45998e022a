use super::HttpResponse;
use crate::config::{ClientConfig, RetryConfig};
use crate::error::{self, Result};
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue, Method};
use log::debug;
use serde_json::Value;
use snafu::ResultExt;
use url::Url;

/// The body of a request.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Body {
    #[default]
    Empty,
    /// Sent as `application/json`.
    Json(Value),
    /// Sent as-is with the given content type, e.g. a pre-rendered YAML manifest.
    Raw { data: Vec<u8>, content_type: String },
}

/// A fully resolved request, ready for a `Transport`.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub query: Vec<(String, String)>,
    pub body: Body,
}

/// Sends requests. Connection pooling, authentication headers, TLS, timeouts and retries are all
/// the transport's business; nothing above it retries or times out on its own.
pub trait Transport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse>;
}

/// The production `Transport`, a blocking `reqwest` client with a retry policy.
pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
    retry: RetryConfig,
}

impl ReqwestTransport {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(token) = &config.token {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
                .context(error::InvalidHeaderSnafu { header: "Authorization" })?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }
        let mut builder = reqwest::blocking::Client::builder()
            .default_headers(headers)
            .danger_accept_invalid_certs(!config.verify_ssl);
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build().context(error::InitializationSnafu)?,
            retry: config.retry.clone(),
        })
    }

    fn send_once(&self, request: &HttpRequest) -> reqwest::Result<reqwest::blocking::Response> {
        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone());
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        builder = match &request.body {
            Body::Empty => builder,
            Body::Json(value) => builder.json(value),
            Body::Raw { data, content_type } => builder
                .header(CONTENT_TYPE, content_type.as_str())
                .body(data.clone()),
        };
        builder.send()
    }

    fn wait(&self, attempt: u32, request: &HttpRequest, reason: &str) {
        let delay = self.retry.backoff(attempt);
        debug!(
            "retry {}/{} of {} '{}' in {:?}: {}",
            attempt, self.retry.total, request.method, request.url, delay, reason
        );
        std::thread::sleep(delay);
    }
}

impl Transport for ReqwestTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let retryable = self.retry.total > 0 && self.retry.allows_method(&request.method);
        let mut attempt = 0;
        loop {
            match self.send_once(request) {
                Ok(response) => {
                    let status = response.status();
                    if retryable && self.retry.is_forced(status) {
                        if attempt < self.retry.total {
                            attempt += 1;
                            self.wait(attempt, request, status.as_str());
                            continue;
                        }
                        return error::RetriesExhaustedSnafu {
                            method: request.method.as_str(),
                            url: request.url.as_str(),
                            status,
                            retries: attempt,
                        }
                        .fail();
                    }
                    let headers = response.headers().clone();
                    let body = response.bytes().context(error::TransportSnafu {
                        method: request.method.as_str(),
                        url: request.url.as_str(),
                    })?;
                    return Ok(HttpResponse::new(status, headers, body));
                }
                Err(e) => {
                    if retryable
                        && (e.is_connect() || e.is_timeout())
                        && attempt < self.retry.total
                    {
                        attempt += 1;
                        self.wait(attempt, request, &e.to_string());
                        continue;
                    }
                    return Err(e).context(error::TransportSnafu {
                        method: request.method.as_str(),
                        url: request.url.as_str(),
                    });
                }
            }
        }
    }
}
