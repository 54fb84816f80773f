//! Transport: the seam between the runtime and the network.
//!
//! The runtime only ever talks to a [`Transport`]; tests substitute a
//! scripted implementation, production wires in [`HttpTransport`].

use thiserror::Error;

use super::descriptor::Method;

/// A fully materialized request, parameters already evaluated.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub method: Method,
    pub url: String,
    /// Flattened key/value pairs; GET sends them as the query string,
    /// POST as a form body.
    pub params: Vec<(String, String)>,
}

/// A settled response. Body is text; fragments are parsed by the swap
/// executor, not here.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The request never produced a response.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connection(String),
    #[error("invalid request url '{0}'")]
    InvalidUrl(String),
}

/// Performs one request and resolves to a response or a transport error.
///
/// HTTP status codes are not errors at this layer; a 500 resolves to a
/// `FetchResponse` and the runtime decides what to do with it.
#[allow(async_fn_in_trait)]
pub trait Transport {
    async fn fetch(&mut self, request: &FetchRequest) -> Result<FetchResponse, TransportError>;
}

/// Production transport over a shared [`reqwest::Client`].
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
    /// Prefix joined onto relative request urls.
    base_url: Option<String>,
}

impl HttpTransport {
    pub fn new() -> Self {
        HttpTransport::default()
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        HttpTransport {
            client: reqwest::Client::new(),
            base_url: Some(base_url.into()),
        }
    }

    fn resolve_url(&self, url: &str) -> String {
        match (&self.base_url, url.starts_with('/')) {
            (Some(base), true) => format!("{}{}", base.trim_end_matches('/'), url),
            _ => url.to_string(),
        }
    }
}

impl Transport for HttpTransport {
    async fn fetch(&mut self, request: &FetchRequest) -> Result<FetchResponse, TransportError> {
        let url = self.resolve_url(&request.url);
        let builder = match request.method {
            Method::Get => self.client.get(&url).query(&request.params),
            Method::Post => self.client.post(&url).form(&request.params),
        };
        let response = builder.send().await.map_err(|err| {
            if err.is_builder() {
                TransportError::InvalidUrl(url.clone())
            } else {
                TransportError::Connection(err.to_string())
            }
        })?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|err| TransportError::Connection(err.to_string()))?;
        Ok(FetchResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_covers_2xx_only() {
        let ok = FetchResponse {
            status: 204,
            body: String::new(),
        };
        let err = FetchResponse {
            status: 500,
            body: String::new(),
        };
        assert!(ok.is_success());
        assert!(!err.is_success());
    }

    #[test]
    fn base_url_joins_relative_paths() {
        let transport = HttpTransport::with_base_url("http://localhost:3000/");
        assert_eq!(
            transport.resolve_url("/demo"),
            "http://localhost:3000/demo"
        );
        assert_eq!(
            transport.resolve_url("http://other/x"),
            "http://other/x"
        );
    }
}
