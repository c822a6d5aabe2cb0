//! Reqwest-based implementation of the `ProviderTransport` trait.
//!
//! Provides a thin adapter around `reqwest::Client` that converts between the
//! provider request representation and the concrete transport.

use std::time::Duration;

use async_trait::async_trait;
use http::{HeaderMap as HttpHeaderMap, Method as HttpMethod};
use reqwest::{Client, Method, header::HeaderMap, redirect::Policy};

use super::{ProviderRequest, ProviderResponse, ProviderTransport};
use crate::error::TransportError;

/// Reqwest-backed transport. Each instance owns its own connection pool.
pub struct ReqwestProviderTransport {
    client: Client,
}

impl ReqwestProviderTransport {
    /// Creates a client with redirects disabled so provider status codes are
    /// observed as sent.
    pub fn new(timeout: Duration, user_agent: Option<&str>) -> Result<Self, TransportError> {
        let mut builder = Client::builder().redirect(Policy::none()).timeout(timeout);
        if let Some(agent) = user_agent {
            builder = builder.user_agent(agent);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }
}

#[async_trait]
impl ProviderTransport for ReqwestProviderTransport {
    async fn send(&self, request: ProviderRequest) -> Result<ProviderResponse, TransportError> {
        let method = map_method(&request.method)?;
        let headers = convert_headers(&request.headers)?;

        let mut builder = self
            .client
            .request(method, request.url.as_str())
            .headers(headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();
        Ok(ProviderResponse { status, body })
    }
}

fn map_method(method: &HttpMethod) -> Result<Method, TransportError> {
    Method::from_bytes(method.as_str().as_bytes())
        .map_err(|err| TransportError::Other(err.to_string()))
}

fn convert_headers(headers: &HttpHeaderMap) -> Result<HeaderMap, TransportError> {
    let mut map = HeaderMap::new();
    for (name, value) in headers.iter() {
        let name = reqwest::header::HeaderName::from_bytes(name.as_str().as_bytes())
            .map_err(|err| TransportError::Other(err.to_string()))?;
        let value = reqwest::header::HeaderValue::from_bytes(value.as_bytes())
            .map_err(|err| TransportError::Other(err.to_string()))?;
        map.insert(name, value);
    }
    Ok(map)
}
