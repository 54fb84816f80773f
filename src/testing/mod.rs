//! Test support: a scripted transport for driving a runtime without a
//! server.

use std::collections::HashMap;

use crate::fetch::{FetchRequest, FetchResponse, Transport, TransportError};

/// A transport answering from a fixed script.
///
/// Each url can be given a response or an injected transport error;
/// anything unscripted gets the default response (404 unless replaced).
/// Every request is recorded for assertions.
#[derive(Debug, Clone)]
pub struct StaticTransport {
    routes: HashMap<String, FetchResponse>,
    failures: HashMap<String, TransportError>,
    fallback: FetchResponse,
    calls: Vec<FetchRequest>,
}

impl Default for StaticTransport {
    fn default() -> Self {
        StaticTransport {
            routes: HashMap::new(),
            failures: HashMap::new(),
            fallback: FetchResponse {
                status: 404,
                body: String::new(),
            },
            calls: Vec::new(),
        }
    }
}

impl StaticTransport {
    pub fn new() -> Self {
        StaticTransport::default()
    }

    /// Script `url` to answer with `status` and `body`.
    pub fn route(mut self, url: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        self.routes.insert(
            url.into(),
            FetchResponse {
                status,
                body: body.into(),
            },
        );
        self
    }

    /// Script `url` to fail at the transport layer.
    pub fn fail(mut self, url: impl Into<String>, error: TransportError) -> Self {
        self.failures.insert(url.into(), error);
        self
    }

    /// Replace the response for unscripted urls.
    pub fn with_fallback(mut self, status: u16, body: impl Into<String>) -> Self {
        self.fallback = FetchResponse {
            status,
            body: body.into(),
        };
        self
    }

    /// Every request seen so far, in order.
    pub fn calls(&self) -> &[FetchRequest] {
        &self.calls
    }
}

impl Transport for StaticTransport {
    async fn fetch(&mut self, request: &FetchRequest) -> Result<FetchResponse, TransportError> {
        self.calls.push(request.clone());
        if let Some(error) = self.failures.get(&request.url) {
            return Err(error.clone());
        }
        Ok(self
            .routes
            .get(&request.url)
            .cloned()
            .unwrap_or_else(|| self.fallback.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::Method;

    fn request(url: &str) -> FetchRequest {
        FetchRequest {
            method: Method::Get,
            url: url.to_string(),
            params: Vec::new(),
        }
    }

    #[tokio::test]
    async fn routes_answer_and_calls_record() {
        let mut transport = StaticTransport::new().route("/demo", 200, "<p>OK</p>");
        let response = transport.fetch(&request("/demo")).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body, "<p>OK</p>");

        let missing = transport.fetch(&request("/other")).await.unwrap();
        assert_eq!(missing.status, 404);
        assert_eq!(transport.calls().len(), 2);
    }

    #[tokio::test]
    async fn injected_failures_surface() {
        let mut transport = StaticTransport::new()
            .fail("/down", TransportError::Connection("refused".to_string()));
        let err = transport.fetch(&request("/down")).await.unwrap_err();
        assert_eq!(err, TransportError::Connection("refused".to_string()));
    }
}
