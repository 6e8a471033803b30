//! HTTP function gateway invoker

use crate::models::workflow::InvocationParams;
use crate::workflow::executor::FunctionInvoker;
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Method, StatusCode};
use url::Url;

/// Invokes functions through a function gateway's `/function` endpoints
pub struct GatewayInvoker {
    client: Client,
    insecure_client: Client,
}

impl GatewayInvoker {
    /// Create new gateway invoker
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .build()
            .context("Failed to build HTTP client")?;
        let insecure_client = Client::builder()
            .danger_accept_invalid_certs(true)
            .build()
            .context("Failed to build insecure HTTP client")?;

        Ok(Self {
            client,
            insecure_client,
        })
    }

    fn client_for(&self, params: &InvocationParams) -> &Client {
        if params.tls_insecure {
            &self.insecure_client
        } else {
            &self.client
        }
    }

    /// Build the invocation URL for a function
    ///
    /// `<gateway>/function/<name>[.<namespace>]`, or `/async-function/` when
    /// the invocation is asynchronous, followed by the query parameters.
    pub fn function_url(params: &InvocationParams, function: &str) -> Result<Url> {
        let mut url = Url::parse(&params.gateway)
            .with_context(|| format!("Invalid gateway URL '{}'", params.gateway))?;

        let endpoint = if params.is_async {
            "async-function"
        } else {
            "function"
        };
        let name = match params.namespace.as_deref() {
            Some(namespace) if !namespace.is_empty() => format!("{}.{}", function, namespace),
            _ => function.to_string(),
        };

        url.path_segments_mut()
            .map_err(|_| anyhow!("Gateway URL '{}' cannot carry a path", params.gateway))?
            .pop_if_empty()
            .push(endpoint)
            .push(&name);

        let query = parse_pairs(&params.query, "query parameter")?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }

        Ok(url)
    }

    fn build_headers(params: &InvocationParams) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_str(&params.content_type)
                .with_context(|| format!("Invalid content type '{}'", params.content_type))?,
        );

        for (key, value) in parse_pairs(&params.headers, "header")? {
            let name = HeaderName::from_bytes(key.as_bytes())
                .with_context(|| format!("Invalid header name '{}'", key))?;
            let value = HeaderValue::from_str(value)
                .with_context(|| format!("Invalid value for header '{}'", key))?;
            headers.append(name, value);
        }

        Ok(headers)
    }
}

/// Split `key=value` strings on the first `=`
fn parse_pairs<'a>(raw: &'a [String], kind: &str) -> Result<Vec<(&'a str, &'a str)>> {
    raw.iter()
        .map(|entry| {
            entry
                .split_once('=')
                .filter(|(key, _)| !key.is_empty())
                .ok_or_else(|| anyhow!("The {} '{}' is not in key=value format", kind, entry))
        })
        .collect()
}

#[async_trait]
impl FunctionInvoker for GatewayInvoker {
    async fn invoke(
        &self,
        function: &str,
        payload: Bytes,
        params: &InvocationParams,
    ) -> Result<Bytes> {
        let url = Self::function_url(params, function)?;
        let method = Method::from_bytes(params.http_method.to_uppercase().as_bytes())
            .with_context(|| format!("Invalid HTTP method '{}'", params.http_method))?;
        let headers = Self::build_headers(params)?;

        tracing::debug!(function = function, url = %url, method = %method, "Invoking function");

        let response = self
            .client_for(params)
            .request(method, url.clone())
            .headers(headers)
            .body(payload)
            .send()
            .await
            .with_context(|| format!("Failed to reach gateway at {}", url))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .context("Failed to read function response")?;

        match status {
            StatusCode::OK => Ok(body),
            StatusCode::ACCEPTED => {
                tracing::info!(function = function, "Function submitted asynchronously");
                Ok(body)
            }
            StatusCode::UNAUTHORIZED => bail!("unauthorized access to function '{}'", function),
            other => bail!(
                "server returned unexpected status code: {} - {}",
                other.as_u16(),
                String::from_utf8_lossy(&body).trim()
            ),
        }
    }
}
