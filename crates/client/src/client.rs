//! The client handle, its builder and the request plumbing shared by every
//! operation.

use crate::api::NodeInfo;
use crate::error::{Error, Result};
use crate::transport::{BackoffPolicy, HttpTransport, ReqwestTransport, RetryTransport};
use bytes::Bytes;
use irys_core::ClientConfig;
use irys_currency::Currency;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use reqwest::{Method, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::instrument::WithSubscriber;

/// Log a diagnostic only when the client was built with `debug` enabled.
macro_rules! debug_msg {
    ($client:expr, $($arg:tt)+) => {
        if $client.debug_enabled() {
            tracing::debug!($($arg)+);
        }
    };
}
pub(crate) use debug_msg;

/// Immutable state shared by every clone of a [`Client`].
struct Inner {
    config: ClientConfig,
    node_url: String,
    gateway_url: String,
    currency: Arc<dyn Currency>,
    transport: Arc<dyn HttpTransport>,
    custodial_address: String,
    dispatch: Option<tracing::Dispatch>,
    closed: AtomicBool,
}

/// Client for an Irys bundler node.
///
/// Cheap to clone; clones share the connection pool and configuration.
/// [`Client::with_cancellation`] and [`Client::with_timeout`] return scoped
/// handles whose operations fail with [`Error::Cancelled`] once the token
/// fires or the deadline passes.
#[derive(Clone)]
pub struct Client {
    inner: Arc<Inner>,
    cancel: CancellationToken,
    deadline: Option<tokio::time::Instant>,
}

/// Builds a [`Client`], resolving the node's custodial address.
pub struct ClientBuilder {
    config: ClientConfig,
    currency: Arc<dyn Currency>,
    transport: Option<Arc<dyn HttpTransport>>,
    dispatch: Option<tracing::Dispatch>,
}

impl ClientBuilder {
    pub fn new(config: ClientConfig, currency: Arc<dyn Currency>) -> Self {
        Self {
            config,
            currency,
            transport: None,
            dispatch: None,
        }
    }

    /// Use a custom transport instead of the default retrying reqwest one.
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Route the client's spans and events to `dispatch` instead of the
    /// global subscriber.
    pub fn dispatch(mut self, dispatch: tracing::Dispatch) -> Self {
        self.dispatch = Some(dispatch);
        self
    }

    pub async fn build(self) -> Result<Client> {
        self.config.validate()?;
        if self.config.currency != self.currency.name() {
            return Err(Error::Config(format!(
                "configured currency {} does not match provider {}",
                self.config.currency,
                self.currency.name()
            )));
        }

        let transport: Arc<dyn HttpTransport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(RetryTransport::new(
                ReqwestTransport::new(self.config.request_timeout())?,
                BackoffPolicy::from(&self.config.retry),
            )),
        };

        let node_url = self.config.node_url();
        let gateway_url = self.config.gateway_url();
        let dispatch = self.dispatch;

        let resolve = resolve_custodial_address(
            transport.as_ref(),
            &node_url,
            self.currency.name(),
            self.config.debug,
        );
        let custodial_address = match &dispatch {
            Some(dispatch) => resolve.with_subscriber(dispatch.clone()).await?,
            None => resolve.await?,
        };

        Ok(Client {
            inner: Arc::new(Inner {
                config: self.config,
                node_url,
                gateway_url,
                currency: self.currency,
                transport,
                custodial_address,
                dispatch,
                closed: AtomicBool::new(false),
            }),
            cancel: CancellationToken::new(),
            deadline: None,
        })
    }
}

async fn resolve_custodial_address(
    transport: &dyn HttpTransport,
    node_url: &str,
    currency: &str,
    debug: bool,
) -> Result<String> {
    let url = parse_url(node_url)?;
    let response = transport.execute(reqwest::Request::new(Method::GET, url)).await?;
    let (status, body) = read_body(node_url, response).await?;
    if !status.is_success() {
        return Err(status_error(node_url, status, body));
    }
    let info: NodeInfo =
        serde_json::from_str(&body).map_err(|e| Error::bad_response(node_url, e))?;
    let address = info
        .addresses
        .get(currency)
        .cloned()
        .ok_or_else(|| Error::InvalidCurrency(currency.to_string()))?;
    if debug {
        tracing::debug!(currency, address = %address, "Resolved custodial address");
    }
    Ok(address)
}

impl Client {
    /// Build a client with the default transport.
    pub async fn connect(config: ClientConfig, currency: Arc<dyn Currency>) -> Result<Self> {
        ClientBuilder::new(config, currency).build().await
    }

    pub fn builder(config: ClientConfig, currency: Arc<dyn Currency>) -> ClientBuilder {
        ClientBuilder::new(config, currency)
    }

    /// A handle whose operations abort when `token` is cancelled.
    pub fn with_cancellation(&self, token: CancellationToken) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            cancel: token,
            deadline: self.deadline,
        }
    }

    /// A handle whose operations abort after `timeout` from now.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let deadline = tokio::time::Instant::now() + timeout;
        Self {
            inner: Arc::clone(&self.inner),
            cancel: self.cancel.clone(),
            deadline: Some(self.deadline.map_or(deadline, |d| d.min(deadline))),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn currency(&self) -> &dyn Currency {
        self.inner.currency.as_ref()
    }

    /// The node's custodial address for the client's currency.
    pub fn custodial_address(&self) -> &str {
        &self.inner.custodial_address
    }

    pub fn node_url(&self) -> &str {
        &self.inner.node_url
    }

    pub fn gateway_url(&self) -> &str {
        &self.inner.gateway_url
    }

    /// Release pooled connections. Later requests fail with [`Error::Closed`].
    pub fn close(&self) {
        if !self.inner.closed.swap(true, Ordering::SeqCst) {
            self.inner.transport.close();
            debug_msg!(self, "Client closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    pub(crate) fn debug_enabled(&self) -> bool {
        self.inner.config.debug
    }

    /// Run a public operation under this handle's cancellation, deadline and
    /// log dispatch.
    pub(crate) async fn scoped<F, T>(&self, operation: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let deadline = self.deadline;
        let guarded = async move {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => Err(Error::Cancelled),
                result = async move {
                    match deadline {
                        Some(deadline) => tokio::time::timeout_at(deadline, operation)
                            .await
                            .unwrap_or(Err(Error::Cancelled)),
                        None => operation.await,
                    }
                } => result,
            }
        };
        match &self.inner.dispatch {
            Some(dispatch) => guarded.with_subscriber(dispatch.clone()).await,
            None => guarded.await,
        }
    }

    pub(crate) fn node_endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.inner.node_url, path.trim_start_matches('/'))
    }

    pub(crate) fn gateway_endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.inner.gateway_url, path.trim_start_matches('/'))
    }

    pub(crate) fn request(&self, method: Method, endpoint: &str) -> Result<reqwest::Request> {
        Ok(reqwest::Request::new(method, parse_url(endpoint)?))
    }

    pub(crate) fn json_request<B: Serialize>(
        &self,
        method: Method,
        endpoint: &str,
        body: &B,
    ) -> Result<reqwest::Request> {
        let payload = serde_json::to_vec(body)
            .map_err(|e| Error::Config(format!("failed to encode request body: {e}")))?;
        let mut request = self.request(method, endpoint)?;
        request
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        *request.body_mut() = Some(payload.into());
        Ok(request)
    }

    pub(crate) fn octet_request(
        &self,
        method: Method,
        endpoint: &str,
        body: Bytes,
    ) -> Result<reqwest::Request> {
        let mut request = self.request(method, endpoint)?;
        request.headers_mut().insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/octet-stream"),
        );
        *request.body_mut() = Some(body.into());
        Ok(request)
    }

    /// Send through the transport, failing fast once closed.
    pub(crate) async fn send(&self, request: reqwest::Request) -> Result<reqwest::Response> {
        if self.is_closed() {
            return Err(Error::Closed);
        }
        self.inner.transport.execute(request).await
    }

    /// Send and read the full body, returning status and text.
    pub(crate) async fn send_text(
        &self,
        request: reqwest::Request,
    ) -> Result<(StatusCode, String)> {
        let endpoint = request.url().to_string();
        let response = self.send(request).await?;
        read_body(&endpoint, response).await
    }

    /// Send, require a success status and decode a JSON body.
    pub(crate) async fn send_json<T: DeserializeOwned>(
        &self,
        request: reqwest::Request,
    ) -> Result<T> {
        let endpoint = request.url().to_string();
        let (status, body) = self.send_text(request).await?;
        if !status.is_success() {
            return Err(status_error(&endpoint, status, body));
        }
        serde_json::from_str(&body).map_err(|e| Error::bad_response(endpoint, e))
    }
}

pub(crate) fn parse_url(endpoint: &str) -> Result<Url> {
    Url::parse(endpoint).map_err(|e| Error::Config(format!("invalid URL {endpoint}: {e}")))
}

/// Read a response body to completion.
pub(crate) async fn read_body(
    endpoint: &str,
    response: reqwest::Response,
) -> Result<(StatusCode, String)> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| Error::network(endpoint, e))?;
    Ok((status, body))
}

/// Map a non-success status to the client error taxonomy.
pub(crate) fn status_error(endpoint: &str, status: StatusCode, body: String) -> Error {
    if status == StatusCode::PAYMENT_REQUIRED {
        return Error::InsufficientBalance {
            endpoint: endpoint.to_string(),
            body,
        };
    }
    Error::Status {
        endpoint: endpoint.to_string(),
        status: status.as_u16(),
        body,
    }
}
