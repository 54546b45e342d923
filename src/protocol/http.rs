// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! HTTP transport for 2N devices.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{AUTHORIZATION, HeaderValue, WWW_AUTHENTICATE};
use reqwest::{Client, Response, StatusCode};
use serde_json::Value;

use crate::auth::{AuthMethod, Credentials, DigestAuthenticator};
use crate::error::{ApiError, ChallengeError, Error, Result, duration_ms};
use crate::protocol::{ApiRequest, ByteStream};
use crate::response::unwrap_envelope;

// ============================================================================
// HttpConfig - Connection parameters
// ============================================================================

/// Configuration for an HTTP connection to a 2N device.
///
/// Defaults follow the device's factory settings: HTTPS with certificate
/// verification, Digest authentication and a 10 second timeout.
///
/// # Examples
///
/// ```
/// use twonr_lib::protocol::HttpConfig;
/// use std::time::Duration;
///
/// // Simple configuration
/// let config = HttpConfig::new("192.168.1.50");
///
/// // With all options
/// let config = HttpConfig::new("192.168.1.50")
///     .with_http()
///     .with_port(8080)
///     .with_basic_auth("admin", "2n")
///     .with_timeout(Duration::from_secs(5));
/// assert_eq!(config.base_url(), "http://192.168.1.50:8080");
/// ```
#[derive(Debug, Clone)]
pub struct HttpConfig {
    host: String,
    port: u16,
    use_https: bool,
    verify_tls: bool,
    credentials: Option<Credentials>,
    timeout: Duration,
}

impl HttpConfig {
    /// Default HTTP port.
    pub const DEFAULT_PORT: u16 = 80;
    /// Default HTTPS port.
    pub const DEFAULT_HTTPS_PORT: u16 = 443;
    /// Default request timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Creates a configuration for the specified host.
    ///
    /// `host` may also be a full base URL such as `http://10.0.0.2:8080`, in
    /// which case scheme and port settings are ignored.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: Self::DEFAULT_HTTPS_PORT,
            use_https: true,
            verify_tls: true,
            credentials: None,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Sets a custom port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Enables HTTPS (the default).
    ///
    /// If the port is still the HTTP default, it is changed to 443.
    #[must_use]
    pub fn with_https(mut self) -> Self {
        self.use_https = true;
        if self.port == Self::DEFAULT_PORT {
            self.port = Self::DEFAULT_HTTPS_PORT;
        }
        self
    }

    /// Switches to plain HTTP.
    ///
    /// If the port is still the HTTPS default, it is changed to 80.
    #[must_use]
    pub fn with_http(mut self) -> Self {
        self.use_https = false;
        if self.port == Self::DEFAULT_HTTPS_PORT {
            self.port = Self::DEFAULT_PORT;
        }
        self
    }

    /// Accepts self-signed or otherwise invalid certificates.
    #[must_use]
    pub fn with_insecure_tls(mut self) -> Self {
        self.verify_tls = false;
        self
    }

    /// Sets credentials with an explicit scheme.
    #[must_use]
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Sets Digest credentials.
    #[must_use]
    pub fn with_digest_auth(self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.with_credentials(Credentials::digest(username, password))
    }

    /// Sets Basic credentials.
    #[must_use]
    pub fn with_basic_auth(self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.with_credentials(Credentials::basic(username, password))
    }

    /// Sets the default request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the host as configured.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the bare host name, without scheme, port or path.
    #[must_use]
    pub fn host_name(&self) -> &str {
        let rest = self
            .host
            .split_once("://")
            .map_or(self.host.as_str(), |(_, rest)| rest);
        let rest = rest.split('/').next().unwrap_or(rest);
        if rest.starts_with('[') {
            // IPv6 literal
            return rest.split_inclusive(']').next().unwrap_or(rest);
        }
        rest.split(':').next().unwrap_or(rest)
    }

    /// Returns the port.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Returns whether HTTPS is enabled.
    #[must_use]
    pub fn use_https(&self) -> bool {
        self.use_https
    }

    /// Returns whether certificates are verified.
    #[must_use]
    pub fn verify_tls(&self) -> bool {
        self.verify_tls
    }

    /// Returns the credentials if set.
    #[must_use]
    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    /// Returns the default timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Builds the base URL from this configuration.
    #[must_use]
    pub fn base_url(&self) -> String {
        if self.host.starts_with("http://") || self.host.starts_with("https://") {
            return self.host.trim_end_matches('/').to_string();
        }

        let scheme = if self.use_https { "https" } else { "http" };
        let port_suffix =
            if (self.use_https && self.port == 443) || (!self.use_https && self.port == 80) {
                String::new()
            } else {
                format!(":{}", self.port)
            };
        format!("{scheme}://{}{port_suffix}", self.host)
    }

    /// Creates an `HttpClient` from this configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the host is empty or the HTTP client
    /// cannot be created.
    pub fn into_client(self) -> Result<HttpClient> {
        if self.host.trim().is_empty() {
            return Err(Error::Config("host is required".to_string()));
        }

        let base_url = self.base_url();

        // Total timeouts are set per request so open streams are not cut off
        let client = Client::builder()
            .connect_timeout(self.timeout)
            .danger_accept_invalid_certs(!self.verify_tls)
            .build()
            .map_err(|e| Error::Config(format!("cannot create HTTP client: {e}")))?;

        let digest = self
            .credentials
            .as_ref()
            .filter(|c| c.method() == AuthMethod::Digest)
            .map(|c| Arc::new(DigestAuthenticator::new(c.username(), c.password())));

        Ok(HttpClient {
            base_url,
            client,
            credentials: self.credentials,
            digest,
            timeout: self.timeout,
        })
    }
}

// ============================================================================
// HttpClient - Authenticated transport
// ============================================================================

/// How the body of a successful response is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    /// Parse the JSON envelope and return its `result`.
    Json,
    /// Read the whole body as bytes.
    Bytes,
    /// Return the open response for incremental reads.
    Stream,
}

/// Result of [`HttpClient::request`], shaped by the requested [`ResponseMode`].
#[derive(Debug)]
pub enum ApiResponse {
    /// The `result` payload of a JSON envelope.
    Json(Value),
    /// A complete binary body.
    Bytes(Bytes),
    /// An open body.
    Stream(ByteStream),
}

/// HTTP client for the 2N API.
///
/// Requests are first sent without credentials when Digest authentication
/// is configured; a `401` challenge is answered once and a second `401` is
/// reported as [`Error::Unauthorized`]. With Basic authentication the
/// credentials accompany every request.
///
/// The client is cheap to clone and can issue concurrent requests.
///
/// # Examples
///
/// ```no_run
/// use twonr_lib::protocol::{ApiRequest, HttpConfig};
///
/// # async fn example() -> twonr_lib::Result<()> {
/// let client = HttpConfig::new("192.168.1.50")
///     .with_digest_auth("admin", "2n")
///     .into_client()?;
/// let info = client.get_json(&ApiRequest::get("/api/system/info")).await?;
/// println!("{info}");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpClient {
    base_url: String,
    client: Client,
    credentials: Option<Credentials>,
    digest: Option<Arc<DigestAuthenticator>>,
    timeout: Duration,
}

impl HttpClient {
    /// Returns the base URL of the device.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the default request timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Sends a request and returns the body in the requested form.
    ///
    /// # Errors
    ///
    /// - [`Error::Unauthorized`] if the credentials are rejected
    /// - [`Error::Challenge`] if the digest challenge cannot be answered
    /// - [`Error::Api`] for HTTP errors, malformed envelopes and network
    ///   failures
    pub async fn request(&self, request: &ApiRequest, mode: ResponseMode) -> Result<ApiResponse> {
        match mode {
            ResponseMode::Json => self.get_json(request).await.map(ApiResponse::Json),
            ResponseMode::Bytes => self.get_bytes(request).await.map(ApiResponse::Bytes),
            ResponseMode::Stream => self.open_stream(request).await.map(ApiResponse::Stream),
        }
    }

    /// Sends a request and returns the `result` of its JSON envelope.
    ///
    /// # Errors
    ///
    /// See [`request`](Self::request).
    pub async fn get_json(&self, request: &ApiRequest) -> Result<Value> {
        let timeout = self.effective_timeout(request);
        let response = self.send(request, Some(timeout)).await?;
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::from_transport(&e, timeout))?;

        tracing::trace!(path = %request.path(), body = %body, "Received HTTP response");

        Ok(unwrap_envelope(&body)?)
    }

    /// Sends a request and returns the raw body.
    ///
    /// # Errors
    ///
    /// See [`request`](Self::request).
    pub async fn get_bytes(&self, request: &ApiRequest) -> Result<Bytes> {
        let timeout = self.effective_timeout(request);
        let response = self.send(request, Some(timeout)).await?;
        Ok(response
            .bytes()
            .await
            .map_err(|e| ApiError::from_transport(&e, timeout))?)
    }

    /// Sends a request and returns the open response.
    ///
    /// The timeout bounds the wait for the response headers only.
    ///
    /// # Errors
    ///
    /// See [`request`](Self::request).
    pub async fn open_stream(&self, request: &ApiRequest) -> Result<ByteStream> {
        let timeout = self.effective_timeout(request);
        let response = tokio::time::timeout(timeout, self.send(request, None))
            .await
            .map_err(|_| ApiError::Timeout(duration_ms(timeout)))??;
        Ok(ByteStream::new(response))
    }

    fn effective_timeout(&self, request: &ApiRequest) -> Duration {
        request.timeout_override().unwrap_or(self.timeout)
    }

    /// Sends the request, answering at most one digest challenge.
    async fn send(&self, request: &ApiRequest, timeout: Option<Duration>) -> Result<Response> {
        let target = request.target();
        let url = format!("{}{target}", self.base_url);

        tracing::debug!(method = %request.method(), path = %request.path(), "Sending HTTP request");

        let response = self.dispatch(request, &url, timeout, None).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return check_status(response).await;
        }

        let Some(digest) = &self.digest else {
            tracing::warn!(path = %request.path(), "Device rejected the request as unauthorized");
            return Err(Error::Unauthorized);
        };

        let challenge = response
            .headers()
            .get_all(WWW_AUTHENTICATE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find(|v| {
                v.trim_start()
                    .get(..6)
                    .is_some_and(|scheme| scheme.eq_ignore_ascii_case("digest"))
            })
            .map(str::to_owned)
            .ok_or(ChallengeError::Missing)?;

        // Release the first connection before retrying
        let _ = response.bytes().await;

        let authorization =
            digest.build_authorization(request.method().as_str(), &target, &challenge)?;

        tracing::debug!(path = %request.path(), "Retrying with digest authorization");

        let response = self
            .dispatch(request, &url, timeout, Some(&authorization))
            .await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            tracing::warn!(path = %request.path(), "Device rejected digest credentials");
            return Err(Error::Unauthorized);
        }

        check_status(response).await
    }

    async fn dispatch(
        &self,
        request: &ApiRequest,
        url: &str,
        timeout: Option<Duration>,
        authorization: Option<&str>,
    ) -> Result<Response> {
        let mut builder = self.client.request(request.method().clone(), url);

        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        if let Some(creds) = &self.credentials
            && creds.method() == AuthMethod::Basic
        {
            builder = builder.basic_auth(creds.username(), Some(creds.password()));
        }

        if let Some(authorization) = authorization {
            let value = HeaderValue::from_str(authorization)
                .map_err(|e| ApiError::UnexpectedResponse(format!("invalid authorization: {e}")))?;
            builder = builder.header(AUTHORIZATION, value);
        }

        builder.send().await.map_err(|e| {
            ApiError::from_transport(&e, timeout.unwrap_or(self.timeout)).into()
        })
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    tracing::debug!(status = status.as_u16(), "Device returned an error status");

    Err(ApiError::Status {
        status: status.as_u16(),
        body,
    }
    .into())
}
