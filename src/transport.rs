use std::sync::Mutex;
use std::time::Duration;

use reqwest::{Method, StatusCode};
use serde_json::Value;
use tracing::{debug, error, trace};

use crate::logger::MessageLogger;
use crate::protocol::{Endpoint, control_payload, parse_body};
use crate::{Error, Result};

/// HTTP access to one device. Every failure comes back classified; nothing
/// is retried here.
pub struct Transport {
    http: reqwest::Client,
    base_url: String,
    logger: Option<Mutex<MessageLogger>>,
}

impl Transport {
    /// `base_url` is scheme plus authority, e.g. `http://192.168.1.50`.
    /// `timeout` bounds the whole exchange, connection setup included.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::client("failed to build HTTP client", e))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            logger: None,
        })
    }

    pub(crate) fn with_logger(mut self, logger: MessageLogger) -> Self {
        self.logger = Some(Mutex::new(logger));
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET `endpoint` and decode the body as JSON.
    pub async fn fetch(&self, endpoint: Endpoint) -> Result<Value> {
        self.request(Method::GET, endpoint, None).await
    }

    /// POST `{key: value}` to `endpoint`.
    pub async fn send(&self, endpoint: Endpoint, key: &str, value: i64) -> Result<Value> {
        self.with_log(|l| l.log_command(key, value));
        let body = control_payload(key, value);
        trace!(payload = %body, "sending control payload");
        self.request(Method::POST, endpoint, Some(&body)).await
    }

    async fn request(&self, method: Method, endpoint: Endpoint, body: Option<&Value>) -> Result<Value> {
        let path = endpoint.path();
        let url = format!("{}{}", self.base_url, path);
        debug!(%method, url = %url, "request");
        self.with_log(|l| l.log_request(method.as_str(), path, body));

        let mut req = self.http.request(method, &url);
        if let Some(body) = body {
            req = req.json(body);
        }

        match self.exchange(req, path).await {
            Ok((status, value)) => {
                trace!(path, status = status.as_u16(), body = %value, "response");
                self.with_log(|l| l.log_response(path, status.as_u16(), &value));
                Ok(value)
            }
            Err(e) => {
                if let Error::Client { .. } = e {
                    error!(path, error = %e, "unexpected failure talking to sauna");
                } else {
                    debug!(path, error = %e, "request failed");
                }
                self.with_log(|l| l.log_failure(path, &e.to_string()));
                Err(e)
            }
        }
    }

    async fn exchange(&self, req: reqwest::RequestBuilder, path: &str) -> Result<(StatusCode, Value)> {
        let resp = req.send().await.map_err(|e| Error::from_reqwest(path, e))?;

        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(Error::Auth {
                path: path.to_string(),
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            return Err(Error::communication(path, format!("HTTP {}", status.as_u16())));
        }

        let bytes = resp.bytes().await.map_err(|e| Error::from_reqwest(path, e))?;
        let value =
            parse_body(&bytes).map_err(|e| Error::client(format!("invalid JSON from {path}"), e))?;
        Ok((status, value))
    }

    fn with_log(&self, f: impl FnOnce(&mut MessageLogger)) {
        if let Some(ref logger) = self.logger
            && let Ok(mut logger) = logger.lock()
        {
            f(&mut logger);
        }
    }
}
