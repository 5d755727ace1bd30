use std::env;
use std::time::{Duration, Instant};

use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, RequestBuilder, Response, header};
use serde::Deserialize;
use url::Url;

use crate::error::{Error, Result};
use crate::observability::{CLIENT_REQUEST_ERRORS, CLIENT_REQUESTS, STREAM_DURATION};
use crate::service::{CompletionRequest, CompletionService, EventStream, ModelCatalog};
use crate::sse::process_sse;
use crate::types::{ModelInfo, ModelListParams, ModelListResponse};

const DEFAULT_API_URL: &str = "https://api.anthropic.com/v1/";
const API_VERSION: &str = "2023-06-01";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const API_KEY_VAR: &str = "COLLOQUY_API_KEY";

/// HTTP client for the completion service and its model catalog.
#[derive(Debug, Clone)]
pub struct Client {
    api_key: String,
    client: ReqwestClient,
    base_url: String,
    timeout: Duration,
}

impl Client {
    /// Create a new client.
    ///
    /// The API key can be provided directly or read from the COLLOQUY_API_KEY
    /// environment variable.
    pub fn new(api_key: Option<String>) -> Result<Self> {
        Self::with_options(api_key, None, None)
    }

    /// Create a new client with custom settings.
    ///
    /// A missing API key or an unparseable base URL is a configuration error:
    /// the chat cannot start without them.
    pub fn with_options(
        api_key: Option<String>,
        base_url: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let api_key = match api_key {
            Some(key) => key,
            None => env::var(API_KEY_VAR).map_err(|_| {
                Error::configuration(format!(
                    "API key not provided and {API_KEY_VAR} environment variable not set"
                ))
            })?,
        };
        if HeaderValue::from_str(&api_key).is_err() {
            return Err(Error::configuration(
                "API key contains characters that cannot be sent in a header",
            ));
        }

        let mut base_url = base_url.unwrap_or_else(|| DEFAULT_API_URL.to_string());
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Url::parse(&base_url)
            .map_err(|e| Error::configuration(format!("invalid base URL {base_url}: {e}")))?;

        // Streams can legitimately run longer than any one request timeout,
        // so the timeout bounds connecting rather than the whole response.
        let timeout = timeout.unwrap_or(DEFAULT_TIMEOUT);
        let client = ReqwestClient::builder()
            .connect_timeout(timeout)
            .build()
            .map_err(|e| {
                Error::http_client(
                    format!("Failed to build HTTP client: {}", e),
                    Some(Box::new(e)),
                )
            })?;

        Ok(Self {
            api_key,
            client,
            base_url,
            timeout,
        })
    }

    /// Create and return default headers for API requests.
    fn default_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        let api_key = HeaderValue::from_str(&self.api_key)
            .map_err(|_| Error::configuration("API key is not a valid header value"))?;
        headers.insert("x-api-key", api_key);
        headers.insert("anthropic-version", HeaderValue::from_static(API_VERSION));
        Ok(headers)
    }

    async fn execute(&self, request: RequestBuilder) -> Result<Response> {
        CLIENT_REQUESTS.click();
        let response = request.send().await.map_err(|e| {
            CLIENT_REQUEST_ERRORS.click();
            if e.is_timeout() {
                Error::timeout(
                    format!("Request timed out: {}", e),
                    Some(self.timeout.as_secs_f64()),
                )
            } else if e.is_connect() {
                Error::connection(format!("Connection error: {}", e), Some(Box::new(e)))
            } else {
                Error::http_client(format!("Request failed: {}", e), Some(Box::new(e)))
            }
        })?;

        if !response.status().is_success() {
            CLIENT_REQUEST_ERRORS.click();
            return Err(Self::process_error_response(response).await);
        }
        Ok(response)
    }

    /// Process API response errors and convert to our Error type
    async fn process_error_response(response: Response) -> Error {
        let status_code = response.status().as_u16();

        let request_id = response
            .headers()
            .get("x-request-id")
            .and_then(|val| val.to_str().ok())
            .map(String::from);

        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|val| val.to_str().ok())
            .and_then(|val| val.parse::<u64>().ok());

        #[derive(Deserialize)]
        struct ErrorResponse {
            error: Option<ErrorDetail>,
        }

        #[derive(Deserialize)]
        struct ErrorDetail {
            #[serde(rename = "type")]
            error_type: Option<String>,
            message: Option<String>,
            param: Option<String>,
        }

        let error_body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return Error::http_client(
                    format!("Failed to read error response: {}", e),
                    Some(Box::new(e)),
                );
            }
        };

        let detail = serde_json::from_str::<ErrorResponse>(&error_body)
            .ok()
            .and_then(|e| e.error);
        let error_type = detail.as_ref().and_then(|e| e.error_type.clone());
        let error_message = detail
            .as_ref()
            .and_then(|e| e.message.clone())
            .unwrap_or_else(|| error_body.clone());
        let error_param = detail.as_ref().and_then(|e| e.param.clone());

        match status_code {
            400 => Error::bad_request(error_message, error_param),
            401 => Error::authentication(error_message),
            403 => Error::permission(error_message),
            404 => Error::not_found(error_message, None, None),
            408 => Error::timeout(error_message, None),
            429 => Error::rate_limit(error_message, retry_after),
            500 => Error::internal_server(error_message, request_id),
            502..=504 => Error::service_unavailable(error_message, retry_after),
            _ => Error::api(status_code, error_type, error_message, request_id),
        }
    }
}

#[async_trait::async_trait]
impl CompletionService for Client {
    async fn stream(&self, request: CompletionRequest) -> Result<EventStream> {
        let url = format!("{}messages", self.base_url);
        let params = request.to_params();

        let mut headers = self.default_headers()?;
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("text/event-stream"),
        );

        tracing::debug!(model = %params.model, messages = params.messages.len(), "sending completion request");
        let started = Instant::now();
        let response = self
            .execute(self.client.post(&url).headers(headers).json(&params))
            .await?;

        let events = process_sse(response.bytes_stream())
            .map(Some)
            .chain(futures::stream::once(async move {
                STREAM_DURATION.add(started.elapsed().as_secs_f64());
                None
            }));
        Ok(Box::pin(events.filter_map(|event| async move { event })))
    }
}

#[async_trait::async_trait]
impl ModelCatalog for Client {
    async fn get_model(&self, model_id: &str) -> Result<ModelInfo> {
        let url = format!("{}models/{}", self.base_url, model_id);
        let response = self
            .execute(self.client.get(&url).headers(self.default_headers()?))
            .await?;
        response.json::<ModelInfo>().await.map_err(|e| {
            Error::serialization(
                format!("Failed to parse model info: {}", e),
                Some(Box::new(e)),
            )
        })
    }

    async fn list_models(&self, params: Option<ModelListParams>) -> Result<ModelListResponse> {
        let url = format!("{}models", self.base_url);
        let query = params.map(|p| p.query_pairs()).unwrap_or_default();
        let response = self
            .execute(
                self.client
                    .get(&url)
                    .headers(self.default_headers()?)
                    .query(&query),
            )
            .await?;
        response.json::<ModelListResponse>().await.map_err(|e| {
            Error::serialization(
                format!("Failed to parse model list: {}", e),
                Some(Box::new(e)),
            )
        })
    }
}
