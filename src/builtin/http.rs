//! # HTTP client shell.
//!
//! [`HttpClient`] is a [`Client`] whose options come from a JSON blob stored under the
//! `options` key of its discovery service, plus the service's endpoint set:
//!
//! ```json
//! { "scheme": "https", "host": "api.internal", "timeout": 1500, "retry_count": 2 }
//! ```
//!
//! Unknown keys are ignored, missing keys take their defaults and an undecodable blob is
//! logged and treated as empty. Endpoint selection is delegated to a [`Balancer`]; the
//! shell only builds request URLs and the `Host` header, the transport is up to the caller.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::clients::{Client, ClientOptions};
use crate::cluster::Endpoint;
use crate::error::ClientError;

/// Scheme used when the options leave it empty.
pub const DEFAULT_SCHEME: &str = "http";

/// Weighted endpoint selection used by [`HttpClient`].
pub trait Balancer: Send + Sync + 'static {
    /// Replaces the balanced endpoint set.
    fn reset(&self, endpoints: &[Endpoint]);

    /// Picks the address for the next request; `None` when the set is empty.
    fn next(&self) -> Option<String>;
}

/// Options snapshot of an [`HttpClient`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HttpClientOptions {
    /// Remote service name.
    pub service: String,
    /// Raw options blob the snapshot was decoded from.
    pub raw: String,
    pub endpoints: Vec<Endpoint>,
    pub scheme: String,
    /// Value of the `Host` header; empty leaves the header alone.
    pub host: String,
    /// Request timeout in milliseconds; `0` means none.
    pub timeout_ms: u64,
    pub retry_count: u32,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct WireOptions {
    scheme: String,
    host: String,
    timeout: u64,
    retry_count: u32,
}

impl HttpClientOptions {
    /// Static options for `service` with no endpoints.
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            ..Self::default()
        }
    }

    /// Decodes `raw` (JSON, may be empty) and attaches `endpoints`.
    pub fn decode(
        service: &str,
        raw: &[u8],
        endpoints: &[Endpoint],
    ) -> Result<Self, serde_json::Error> {
        let wire = if raw.iter().all(u8::is_ascii_whitespace) {
            WireOptions::default()
        } else {
            serde_json::from_slice::<WireOptions>(raw)?
        };
        Ok(Self {
            service: service.to_string(),
            raw: String::from_utf8_lossy(raw).into_owned(),
            endpoints: endpoints.to_vec(),
            scheme: wire.scheme,
            host: wire.host,
            timeout_ms: wire.timeout,
            retry_count: wire.retry_count,
        })
    }

    pub fn with_endpoints(mut self, endpoints: Vec<Endpoint>) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }

    /// Request timeout, `None` when unset.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }
}

impl ClientOptions for HttpClientOptions {
    fn service_name(&self) -> &str {
        &self.service
    }
}

/// Request settings currently applied by an [`HttpClient`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpSettings {
    pub scheme: String,
    pub host: String,
    pub timeout: Option<Duration>,
    pub retry_count: u32,
}

impl From<&HttpClientOptions> for HttpSettings {
    fn from(opts: &HttpClientOptions) -> Self {
        let scheme = if opts.scheme.is_empty() {
            DEFAULT_SCHEME.to_string()
        } else {
            opts.scheme.clone()
        };
        Self {
            scheme,
            host: opts.host.clone(),
            timeout: opts.timeout(),
            retry_count: opts.retry_count,
        }
    }
}

/// HTTP client shell with hot-swappable options.
///
/// ## Example
/// ```rust
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// use std::sync::Mutex;
/// use tokio_util::sync::CancellationToken;
/// use hostvisor::Client;
/// use hostvisor::Endpoint;
/// use hostvisor::builtin::http::{Balancer, HttpClient, HttpClientOptions};
///
/// #[derive(Default)]
/// struct First(Mutex<Vec<Endpoint>>);
///
/// impl Balancer for First {
///     fn reset(&self, endpoints: &[Endpoint]) {
///         *self.0.lock().unwrap() = endpoints.to_vec();
///     }
///     fn next(&self) -> Option<String> {
///         self.0.lock().unwrap().first().map(|e| e.addr.clone())
///     }
/// }
///
/// let client = HttpClient::new(First::default());
/// let opts = HttpClientOptions::new("billing")
///     .with_endpoints(vec![Endpoint::new("b1", "127.0.0.1:9000", 1)]);
/// client.init(CancellationToken::new(), opts).await.unwrap();
///
/// assert_eq!(client.build_url("invoices").unwrap(), "http://127.0.0.1:9000/invoices");
/// # }
/// ```
pub struct HttpClient<B> {
    balancer: B,
    settings: RwLock<Option<HttpSettings>>,
    ready: AtomicBool,
}

impl<B: Balancer> HttpClient<B> {
    pub fn new(balancer: B) -> Self {
        Self {
            balancer,
            settings: RwLock::new(None),
            ready: AtomicBool::new(false),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Currently applied settings (`None` before `init`).
    pub fn settings(&self) -> Option<HttpSettings> {
        self.settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Builds the absolute URL for `uri` against the next balanced endpoint.
    ///
    /// # Errors
    /// - [`ClientError::NotReady`] before `init` or after `shutdown`.
    /// - [`ClientError::Fail`] when the balancer has no endpoint.
    pub fn build_url(&self, uri: &str) -> Result<String, ClientError> {
        if !self.is_ready() {
            return Err(ClientError::NotReady);
        }
        let scheme = self
            .settings()
            .map_or_else(|| DEFAULT_SCHEME.to_string(), |s| s.scheme);
        let addr = self.balancer.next().ok_or_else(|| ClientError::Fail {
            error: "no endpoint available".into(),
        })?;

        let base = format!("{scheme}://{addr}");
        Ok(match uri {
            "/" => base,
            u if u.starts_with('/') => format!("{base}{u}"),
            u => format!("{base}/{u}"),
        })
    }

    /// Value for the `Host` header, if the options set one.
    pub fn host_header(&self) -> Option<String> {
        self.settings()
            .map(|s| s.host)
            .filter(|host| !host.is_empty())
    }

    fn apply(&self, opts: &HttpClientOptions) {
        self.balancer.reset(&opts.endpoints);
        *self
            .settings
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(HttpSettings::from(opts));
    }
}

#[async_trait]
impl<B: Balancer> Client for HttpClient<B> {
    type Options = HttpClientOptions;

    fn name(&self) -> &str {
        "httpclient"
    }

    async fn init(&self, _ctx: CancellationToken, opts: HttpClientOptions) -> Result<(), ClientError> {
        if self
            .ready
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(());
        }
        self.apply(&opts);
        tracing::debug!(
            service = %opts.service,
            endpoints = opts.endpoints.len(),
            "http client initialized"
        );
        Ok(())
    }

    async fn reinit(
        &self,
        _ctx: CancellationToken,
        opts: HttpClientOptions,
    ) -> Result<(), ClientError> {
        if !self.is_ready() {
            return Err(ClientError::NotReady);
        }
        self.apply(&opts);
        tracing::debug!(
            service = %opts.service,
            endpoints = opts.endpoints.len(),
            "http client reconfigured"
        );
        Ok(())
    }

    fn new_options(&self, service: &str, raw: &[u8], endpoints: &[Endpoint]) -> HttpClientOptions {
        HttpClientOptions::decode(service, raw, endpoints).unwrap_or_else(|e| {
            tracing::warn!(service, error = %e, "undecodable http client options, using defaults");
            HttpClientOptions {
                raw: String::from_utf8_lossy(raw).into_owned(),
                ..HttpClientOptions::new(service).with_endpoints(endpoints.to_vec())
            }
        })
    }

    async fn shutdown(&self, _ctx: CancellationToken) {
        let _ = self
            .ready
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire);
    }
}
