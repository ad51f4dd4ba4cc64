//! Typed JSON request client.
//!
//! # Design
//! - One code path for every verb: authorize, send, classify, decode.
//! - Paths are passed as segments and percent-encoded one by one, so an id
//!   containing `/`, `?` or `#` stays a single segment.
//! - Error bodies are normalised into [`ApiError`]; 401 is reported to the
//!   gateway exactly once per call before the error is returned.
//! - No retries; retry policy belongs to callers.

use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, Method, StatusCode};
use roster_api_models::ErrorBody;
use roster_config::ClientConfig;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::error::{ApiError, ApiResult};
use crate::gateway::TokenGateway;

const JSON: &str = "application/json";

/// Authenticated JSON client bound to an API base URL.
#[derive(Clone)]
pub struct RequestClient {
    http: Client,
    base_url: Url,
    gateway: TokenGateway,
}

impl RequestClient {
    /// Build a client with JSON default headers and the configured timeout.
    ///
    /// # Errors
    /// Returns [`ApiError::Network`] when the underlying HTTP client cannot be
    /// constructed (for example, TLS backend initialisation failure).
    pub fn from_config(config: &ClientConfig, gateway: TokenGateway) -> ApiResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(JSON));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON));
        let http = Client::builder()
            .timeout(config.request_timeout)
            .default_headers(headers)
            .build()
            .map_err(|err| ApiError::Network {
                message: format!("failed to build HTTP client: {err}"),
            })?;
        Ok(Self::with_http(http, config.base_url.clone(), gateway))
    }

    /// Wrap an existing HTTP client.
    #[must_use]
    pub fn with_http(http: Client, base_url: Url, gateway: TokenGateway) -> Self {
        Self {
            http,
            base_url,
            gateway,
        }
    }

    /// Gateway used to authorize calls and publish session expiry.
    #[must_use]
    pub const fn gateway(&self) -> &TokenGateway {
        &self.gateway
    }

    /// API root every path is resolved against.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Issue `method` against the path made of `segments` with optional query
    /// pairs and JSON body.
    ///
    /// An empty success body decodes as JSON `null`.
    ///
    /// # Errors
    /// Returns the classified [`ApiError`] for missing sessions, transport
    /// failures, non-2xx responses, and undecodable bodies.
    pub async fn call<B, T>(
        &self,
        method: Method,
        segments: &[&str],
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(segments)?;
        let mut request = self.http.request(method.clone(), url.clone());
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        let request = self.gateway.authorize(request)?;

        debug!(%method, %url, "issuing request");
        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(transport_error)?;

        if status.is_success() {
            return decode_body(&bytes);
        }

        let error = classify_problem(status, &bytes);
        if let ApiError::Unauthorized { message } = &error {
            self.gateway.notify_unauthorized(message);
        }
        warn!(%method, %url, status = status.as_u16(), error = %error, "request failed");
        Err(error)
    }

    /// `GET segments?query`.
    ///
    /// # Errors
    /// See [`RequestClient::call`].
    pub async fn get<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, String)],
    ) -> ApiResult<T> {
        self.call::<(), T>(Method::GET, segments, query, None).await
    }

    /// `POST segments` with a JSON body.
    ///
    /// # Errors
    /// See [`RequestClient::call`].
    pub async fn post<B, T>(&self, segments: &[&str], body: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.call(Method::POST, segments, &[], Some(body)).await
    }

    /// `PUT segments` with a JSON body.
    ///
    /// # Errors
    /// See [`RequestClient::call`].
    pub async fn put<B, T>(&self, segments: &[&str], body: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.call(Method::PUT, segments, &[], Some(body)).await
    }

    /// `PATCH segments` with a JSON body.
    ///
    /// # Errors
    /// See [`RequestClient::call`].
    pub async fn patch<B, T>(&self, segments: &[&str], body: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.call(Method::PATCH, segments, &[], Some(body)).await
    }

    /// `DELETE segments`.
    ///
    /// # Errors
    /// See [`RequestClient::call`].
    pub async fn delete<T: DeserializeOwned>(&self, segments: &[&str]) -> ApiResult<T> {
        self.call::<(), T>(Method::DELETE, segments, &[], None).await
    }

    /// Resolve `segments` below the base URL, encoding each as one segment.
    ///
    /// # Errors
    /// Returns [`ApiError::Network`] for empty, `.` or `..` segments and for a
    /// base URL that cannot carry a path.
    pub fn endpoint(&self, segments: &[&str]) -> ApiResult<Url> {
        if let Some(bad) = segments
            .iter()
            .find(|segment| matches!(**segment, "" | "." | ".."))
        {
            return Err(ApiError::Network {
                message: format!("invalid endpoint segment '{bad}'"),
            });
        }
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::Network {
                message: format!("base URL '{}' cannot carry a path", self.base_url),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

/// Classify a non-2xx response into an [`ApiError`].
///
/// 401 maps to `Unauthorized`; other 4xx responses with a structured message
/// map to `Validation`; everything else (5xx, unparseable bodies) maps to
/// `Server` with the parsed message or `HTTP <status>`.
#[must_use]
pub fn classify_problem(status: StatusCode, body: &[u8]) -> ApiError {
    let code = status.as_u16();
    let parsed = serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .and_then(ErrorBody::into_message);

    if status == StatusCode::UNAUTHORIZED {
        return ApiError::Unauthorized {
            message: parsed.unwrap_or_else(|| format!("HTTP {code}")),
        };
    }
    match parsed {
        Some(message) if status.is_client_error() => ApiError::Validation {
            status: code,
            message,
        },
        Some(message) => ApiError::Server {
            status: code,
            message,
        },
        None => ApiError::Server {
            status: code,
            message: format!("HTTP {code}"),
        },
    }
}

fn decode_body<T: DeserializeOwned>(bytes: &[u8]) -> ApiResult<T> {
    let decoded = if bytes.iter().all(u8::is_ascii_whitespace) {
        serde_json::from_value(Value::Null)
    } else {
        serde_json::from_slice(bytes)
    };
    decoded.map_err(|err| ApiError::Decode {
        message: err.to_string(),
    })
}

fn transport_error(err: reqwest::Error) -> ApiError {
    let message = if err.is_timeout() {
        "request timed out".to_string()
    } else {
        err.to_string()
    };
    ApiError::Network { message }
}
