//! Pushes a registry's metrics to a Prometheus Pushgateway.
//!
//! Ephemeral and batch jobs may not live long enough to be scraped; they can
//! push their final state instead. The gateway groups pushed metrics by a
//! job name plus an optional grouping key, all encoded into the request
//! path: `/metrics/job/<job>[/<key>/<value>]*`. Values the path cannot carry
//! verbatim (containing `/`, or empty) are switched to the
//! `<key>@base64/<value>` form.
//!
//! ```no_run
//! use openmetrics_pushgateway::PushGateway;
//!
//! # async fn push() -> Result<(), openmetrics_pushgateway::PushError> {
//! let gateway = PushGateway::builder()
//!     .address("pushgateway.example.org:9091")
//!     .job("my_batch_job")
//!     .grouping("instance", "10.0.0.7")
//!     .build()?;
//! gateway.push().await?;
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use http_body_util::{BodyExt, Collected, Full};
use hyper::body::Bytes;
use hyper::{header::HeaderValue, Method, Request, StatusCode, Uri};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use openmetrics_client::{default_registry, Registry};
use openmetrics_exposition::PrometheusTextWriter;
use thiserror::Error;
use tracing::debug;

type HttpsClient = Client<hyper_rustls::HttpsConnector<HttpConnector>, Full<Bytes>>;

/// Errors raised while building or talking to a Pushgateway.
#[derive(Debug, Error)]
pub enum PushError {
    /// The configured address or grouping key does not form a valid URL.
    #[error("invalid push gateway target: {0}")]
    InvalidTarget(String),

    /// Loading TLS roots or rendering the payload failed.
    #[error("i/o failure while preparing the push: {0}")]
    Io(#[from] std::io::Error),

    /// The request could not be constructed.
    #[error("failed to build request: {0}")]
    Request(#[from] hyper::http::Error),

    /// The request failed in transit.
    #[error("failed to send request to push gateway: {0}")]
    Transport(#[from] hyper_util::client::legacy::Error),

    /// The gateway answered with a non-2xx status.
    #[error("push gateway responded with {status}: {body}")]
    UnexpectedStatus {
        /// The response status.
        status: StatusCode,
        /// The response body, if it could be read.
        body: String,
    },
}

/// A configured Pushgateway target bound to a registry.
pub struct PushGateway {
    url: Uri,
    authorization: Option<HeaderValue>,
    registry: Registry,
    client: HttpsClient,
}

impl PushGateway {
    /// Starts building a gateway target.
    pub fn builder() -> PushGatewayBuilder {
        PushGatewayBuilder::new()
    }

    /// Replaces all metrics for this job and grouping key (HTTP `PUT`).
    pub async fn push(&self) -> Result<(), PushError> {
        self.do_request(Method::PUT).await
    }

    /// Replaces only same-named metrics for this job and grouping key
    /// (HTTP `POST`).
    pub async fn push_add(&self) -> Result<(), PushError> {
        self.do_request(Method::POST).await
    }

    /// Deletes all metrics for this job and grouping key (HTTP `DELETE`).
    pub async fn delete(&self) -> Result<(), PushError> {
        self.do_request(Method::DELETE).await
    }

    async fn do_request(&self, method: Method) -> Result<(), PushError> {
        let mut builder = Request::builder()
            .method(method.clone())
            .uri(self.url.clone())
            .header("content-type", PrometheusTextWriter::CONTENT_TYPE);
        if let Some(authorization) = &self.authorization {
            builder = builder.header("authorization", authorization.clone());
        }
        let body = if method == Method::DELETE {
            Full::default()
        } else {
            let mut payload = Vec::new();
            PrometheusTextWriter::new().write(&mut payload, &self.registry.scrape())?;
            Full::from(Bytes::from(payload))
        };
        let request = builder.body(body)?;

        debug!(url = %self.url, method = %method, "pushing metrics");
        let response = self.client.request(request).await?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .into_body()
                .collect()
                .await
                .map(Collected::to_bytes)
                .ok()
                .and_then(|bytes| String::from_utf8(bytes.to_vec()).ok())
                .unwrap_or_else(|| String::from("<failed to read response body>"));
            return Err(PushError::UnexpectedStatus { status, body });
        }
        Ok(())
    }
}

/// URL scheme to reach the gateway under.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scheme {
    /// Plain HTTP (the default).
    Http,
    /// HTTPS with native root certificates.
    Https,
}

/// Builder for [`PushGateway`].
pub struct PushGatewayBuilder {
    address: String,
    scheme: Scheme,
    job: Option<String>,
    grouping: BTreeMap<String, String>,
    authorization: Option<HeaderValue>,
    registry: Option<Registry>,
}

impl PushGatewayBuilder {
    fn new() -> PushGatewayBuilder {
        PushGatewayBuilder {
            address: "localhost:9091".to_string(),
            scheme: Scheme::Http,
            job: None,
            grouping: BTreeMap::new(),
            authorization: None,
            registry: None,
        }
    }

    /// Sets the `host:port` of the gateway. Defaults to `localhost:9091`.
    pub fn address<S: Into<String>>(mut self, address: S) -> Self {
        self.address = address.into();
        self
    }

    /// Selects HTTP or HTTPS. Defaults to HTTP.
    pub fn scheme(mut self, scheme: Scheme) -> Self {
        self.scheme = scheme;
        self
    }

    /// Sets the job name. Required.
    pub fn job<S: Into<String>>(mut self, job: S) -> Self {
        self.job = Some(job.into());
        self
    }

    /// Adds one grouping-key pair. Pairs are encoded in key order.
    pub fn grouping<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.grouping.insert(key.into(), value.into());
        self
    }

    /// Sends `Authorization: Basic …` with every request.
    pub fn basic_auth(mut self, username: &str, password: &str) -> Self {
        self.authorization = Some(basic_auth(username, password));
        self
    }

    /// Pushes the given registry instead of the process-wide default.
    pub fn registry(mut self, registry: Registry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Builds the gateway target.
    pub fn build(self) -> Result<PushGateway, PushError> {
        let job = self
            .job
            .ok_or_else(|| PushError::InvalidTarget("job name is required".to_string()))?;
        let scheme = match self.scheme {
            Scheme::Http => "http",
            Scheme::Https => "https",
        };
        let url = build_url(scheme, &self.address, &job, &self.grouping)?;

        let https = hyper_rustls::HttpsConnectorBuilder::new()
            .with_native_roots()?
            .https_or_http()
            .enable_http1()
            .build();
        let client = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(Duration::from_secs(30))
            .build(https);

        Ok(PushGateway {
            url,
            authorization: self.authorization,
            registry: self.registry.unwrap_or_else(|| default_registry().clone()),
            client,
        })
    }
}

// A path segment the gateway decodes as-is: a value containing a slash is
// switched to the base64url form, an empty value becomes the bare padding
// character, and everything else is percent-encoded.
fn encode_segment(url: &mut String, key: &str, value: &str) {
    if value.is_empty() {
        url.push_str(key);
        url.push_str("@base64/=");
    } else if value.contains('/') {
        url.push_str(key);
        url.push_str("@base64/");
        url.push_str(&URL_SAFE.encode(value));
    } else {
        url.push_str(key);
        url.push('/');
        url.push_str(&percent_encode(value));
    }
}

fn build_url(
    scheme: &str,
    address: &str,
    job: &str,
    grouping: &BTreeMap<String, String>,
) -> Result<Uri, PushError> {
    let mut url = format!("{}://{}/metrics/", scheme, address);
    encode_segment(&mut url, "job", job);
    for (key, value) in grouping {
        url.push('/');
        encode_segment(&mut url, key, value);
    }
    url.parse::<Uri>().map_err(|err| PushError::InvalidTarget(format!("{}: {}", url, err)))
}

fn percent_encode(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char)
            }
            byte => {
                encoded.push('%');
                encoded.push_str(&format!("{:02X}", byte));
            }
        }
    }
    encoded
}

fn basic_auth(username: &str, password: &str) -> HeaderValue {
    let credentials = format!("{}:{}", username, password);
    let encoded = base64::engine::general_purpose::STANDARD.encode(credentials.as_bytes());
    let mut header = HeaderValue::from_bytes(format!("Basic {}", encoded).as_bytes())
        .expect("base64 is always a valid header value");
    header.set_sensitive(true);
    header
}
