use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::{
    header::{AUTHORIZATION, CONTENT_TYPE},
    Client, StatusCode,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::{
    config::Config,
    error::TransportError,
    request::{HttpMethod, RequestDescriptor},
};

#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: &RequestDescriptor) -> Result<Value, TransportError>;
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    code: Option<Value>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BluumClient {
    http: Client,
    base_url: String,
    authorization: String,
    timeout: Duration,
}

impl BluumClient {
    pub fn new(
        base_url: &str,
        api_key: &str,
        api_secret: &str,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Network(e.to_string()))?;
        let credentials = STANDARD.encode(format!("{api_key}:{api_secret}"));

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            authorization: format!("Basic {credentials}"),
            timeout,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, TransportError> {
        Self::new(
            &config.base_url(),
            &config.api_key,
            &config.api_secret,
            config.request_timeout,
        )
    }

    fn network_error(&self, err: &reqwest::Error) -> TransportError {
        if err.is_timeout() {
            return TransportError::Network(format!(
                "timeout of {}ms exceeded",
                self.timeout.as_millis()
            ));
        }
        TransportError::Network(err.to_string())
    }
}

#[async_trait]
impl Transport for BluumClient {
    async fn execute(&self, request: &RequestDescriptor) -> Result<Value, TransportError> {
        let url = format!("{}{}", self.base_url, request.path);
        let mut builder = match request.method {
            HttpMethod::Get => self.http.get(&url),
            HttpMethod::Post => self.http.post(&url),
        }
        .header(AUTHORIZATION, &self.authorization)
        .header(CONTENT_TYPE, "application/json");

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        debug!(method = request.method.as_str(), path = %request.path, "Sending Bluum API request");
        let response = builder.send().await.map_err(|e| self.network_error(&e))?;
        let status = response.status();
        let text = response.text().await.map_err(|e| self.network_error(&e))?;

        if !status.is_success() {
            return Err(api_error(status, &text));
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| TransportError::Decode(e.to_string()))
    }
}

fn api_error(status: StatusCode, body: &str) -> TransportError {
    let parsed = serde_json::from_str::<ApiErrorBody>(body).ok();
    let (code, message) = match parsed {
        Some(err) => (err.code, err.message),
        None => (None, None),
    };

    let code = match code {
        Some(Value::String(code)) if !code.is_empty() => code,
        Some(Value::Number(code)) => code.to_string(),
        _ => status.as_u16().to_string(),
    };
    let message = message
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| format!("Request failed with status code {}", status.as_u16()));

    TransportError::Api { code, message }
}
