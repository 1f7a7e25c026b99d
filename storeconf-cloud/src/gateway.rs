//! Gateway abstraction and response interpretation.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::borrow::Cow;
use std::fmt;
use tracing::debug;

use crate::{CancelSignal, GatewayError, GatewayResult};

/// HTTP method of a gateway call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One remote call: method, tenant-relative path, optional JSON body and
/// extra headers.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
    pub headers: Vec<(String, String)>,
}

impl GatewayRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            headers: Vec::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::Post, path).with_body(body)
    }

    pub fn put(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::Put, path).with_body(body)
    }

    pub fn patch(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::Patch, path).with_body(body)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Looks up an extra header by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Status code and raw body of a completed call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Shorthand for a response carrying a JSON document.
    pub fn json(status: u16, body: &Value) -> Self {
        Self::new(status, body.to_string())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body as text, lossily decoded.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// The remote service, as seen by the sync engine.
///
/// Implementations perform exactly one network exchange per call and report
/// every HTTP status as a [`RawResponse`]; only transport failures are
/// errors. Status interpretation happens in [`send`].
#[async_trait]
pub trait RemoteResourceGateway: Send + Sync {
    async fn call(&self, request: &GatewayRequest) -> GatewayResult<RawResponse>;
}

/// Performs a call, racing it against `cancel`, and interprets the status:
/// 2xx yields the body, 404 is [`GatewayError::NotFound`], anything else is
/// [`GatewayError::RemoteRejected`] with the body attached.
pub async fn send(
    gateway: &dyn RemoteResourceGateway,
    request: &GatewayRequest,
    cancel: &CancelSignal,
) -> GatewayResult<Vec<u8>> {
    cancel.check()?;

    let response = tokio::select! {
        biased;
        err = cancel.fired() => return Err(err),
        response = gateway.call(request) => response?,
    };

    debug!(
        "{} {} -> {}",
        request.method, request.path, response.status
    );

    match response.status {
        s if (200..300).contains(&s) => Ok(response.body),
        404 => Err(GatewayError::NotFound {
            path: request.path.clone(),
        }),
        status => Err(GatewayError::RemoteRejected {
            status,
            body: response.text().into_owned(),
        }),
    }
}

/// [`send`] followed by JSON decoding of the body.
pub async fn send_json<T: DeserializeOwned>(
    gateway: &dyn RemoteResourceGateway,
    request: &GatewayRequest,
    cancel: &CancelSignal,
) -> GatewayResult<T> {
    let body = send(gateway, request, cancel).await?;
    Ok(serde_json::from_slice(&body)?)
}

/// Percent-encodes one path segment (ids and keys are user-visible strings).
pub fn encode_segment(segment: &str) -> Cow<'_, str> {
    urlencoding::encode(segment)
}
