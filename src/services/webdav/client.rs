//! Low-level WebDAV protocol client.
//!
//! Issues WebDAV verbs with precomputed Basic auth. Every HTTP response,
//! including 4xx/5xx, is handed back untouched; interpreting status codes is
//! the caller's job. Network failures surface as a single
//! [`StorageError::Transport`] and are never retried here.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::{Body, Client, Method, Response};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::{Credentials, WebDAVConfig};
use crate::errors::{StorageError, StorageResult};
use crate::utils::path;

use super::common::{build_user_agent, strip_origin};
use super::xml_parser::build_propfind_request_body;

/// WebDAV `Depth` header values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Depth {
    Zero,
    One,
    Infinity,
}

impl Depth {
    pub fn as_str(&self) -> &'static str {
        match self {
            Depth::Zero => "0",
            Depth::One => "1",
            Depth::Infinity => "infinity",
        }
    }
}

/// Extra headers and body for a raw request. Caller headers win over defaults.
#[derive(Debug, Default)]
pub struct RequestOptions {
    pub headers: HeaderMap,
    pub body: Option<Body>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(mut self, name: &'static str, value: &str) -> StorageResult<Self> {
        let value = HeaderValue::from_str(value)
            .map_err(|e| StorageError::internal(format!("Invalid value for header {}: {}", name, e)))?;
        self.headers.insert(HeaderName::from_static(name), value);
        Ok(self)
    }

    pub fn body(mut self, body: impl Into<Body>) -> Self {
        self.body = Some(body.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct WebDAVClient {
    http: Client,
    credentials: Credentials,
    /// `Basic <base64(username:password)>`, absent when either part is missing
    auth_header: Option<HeaderValue>,
    user_agent: String,
    /// Decoded path component of the DAV root, without trailing slash
    base_path: String,
}

impl WebDAVClient {
    pub fn new(credentials: Credentials, connect_timeout: Duration, timeout: Duration) -> StorageResult<Self> {
        let http = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(timeout)
            .build()
            .map_err(|e| StorageError::internal(format!("Failed to build HTTP client: {}", e)))?;

        let auth_header = Self::basic_auth_header(credentials.username(), credentials.password());

        let base_path = match url::Url::parse(credentials.server_base_url()) {
            Ok(url) => path::decode(url.path().trim_end_matches('/')),
            Err(e) => {
                return Err(StorageError::internal(format!(
                    "Invalid server URL '{}': {}",
                    credentials.server_base_url(),
                    e
                )))
            }
        };

        Ok(Self {
            http,
            credentials,
            auth_header,
            user_agent: build_user_agent(),
            base_path,
        })
    }

    pub fn from_config(config: &WebDAVConfig) -> StorageResult<Self> {
        Self::new(config.credentials(), config.connect_timeout(), config.read_timeout())
    }

    fn basic_auth_header(username: &str, password: &str) -> Option<HeaderValue> {
        if username.is_empty() || password.is_empty() {
            return None;
        }
        let token = BASE64.encode(format!("{}:{}", username, password));
        match HeaderValue::from_str(&format!("Basic {}", token)) {
            Ok(mut value) => {
                value.set_sensitive(true);
                Some(value)
            }
            Err(e) => {
                warn!("Could not build Authorization header: {}", e);
                None
            }
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn has_auth(&self) -> bool {
        self.auth_header.is_some()
    }

    /// Absolute URL for an already-encoded driver path
    pub fn url_for(&self, encoded_path: &str) -> String {
        if encoded_path.starts_with('/') {
            format!("{}{}", self.credentials.server_base_url(), encoded_path)
        } else {
            format!("{}/{}", self.credentials.server_base_url(), encoded_path)
        }
    }

    /// Absolute URL used as the `Destination` header of MOVE/COPY
    pub fn destination_url(&self, encoded_path: &str) -> String {
        self.url_for(encoded_path)
    }

    /// Convert a decoded server href into a normalized driver path
    ///
    /// Input:  "/remote.php/dav/files/alice/Photos/image.jpg"
    /// Output: "/Photos/image.jpg"
    pub fn relative_path(&self, href: &str, is_collection: bool) -> String {
        let href_path = strip_origin(href);

        let relative = match href_path.strip_prefix(self.base_path.as_str()) {
            Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
            _ => href_path,
        };

        path::normalize(relative, is_collection)
    }

    fn dav_method(name: &'static str) -> StorageResult<Method> {
        Method::from_bytes(name.as_bytes())
            .map_err(|e| StorageError::internal(format!("Invalid HTTP method {}: {}", name, e)))
    }

    /// Send one request. Only network failures become errors.
    pub async fn request(&self, method: Method, encoded_path: &str, options: RequestOptions) -> StorageResult<Response> {
        let url = self.url_for(encoded_path);

        let mut headers = HeaderMap::new();
        if let Some(ref auth) = self.auth_header {
            headers.insert(AUTHORIZATION, auth.clone());
        }
        if let Ok(user_agent) = HeaderValue::from_str(&self.user_agent) {
            headers.insert(USER_AGENT, user_agent);
        }
        for (name, value) in options.headers.iter() {
            headers.insert(name.clone(), value.clone());
        }

        debug!("🌐 HTTP Request Details:");
        debug!("   Method: {}", method);
        debug!("   URL: {}", url);
        debug!("   Username: {}", self.credentials.username());
        debug!(
            "   Headers: {:?}",
            headers
                .keys()
                .filter(|name| **name != AUTHORIZATION)
                .map(|name| name.as_str())
                .collect::<Vec<_>>()
        );

        let mut request = self.http.request(method.clone(), &url).headers(headers);
        if let Some(body) = options.body {
            if let Some(bytes) = body.as_bytes() {
                debug!("   Body length: {} bytes", bytes.len());
            }
            request = request.body(body);
        }

        match request.send().await {
            Ok(response) => {
                let status = response.status();
                debug!(
                    "📥 HTTP Response: {} {} for {} {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or(""),
                    method,
                    url
                );
                Ok(response)
            }
            Err(e) => {
                warn!("❌ {} {} failed before a response arrived: {}", method, url, e);
                Err(StorageError::from(e))
            }
        }
    }

    /// PROPFIND with the given depth; `body` defaults to an `allprop` request
    pub async fn propfind(&self, encoded_path: &str, depth: Depth, body: Option<String>) -> StorageResult<Response> {
        let body = body.unwrap_or_else(|| build_propfind_request_body(&[]));
        let options = RequestOptions::new()
            .header("depth", depth.as_str())?
            .header("content-type", "application/xml; charset=utf-8")?
            .body(body);
        self.request(Self::dav_method("PROPFIND")?, encoded_path, options).await
    }

    pub async fn get(&self, encoded_path: &str) -> StorageResult<Response> {
        self.request(Method::GET, encoded_path, RequestOptions::new()).await
    }

    pub async fn head(&self, encoded_path: &str) -> StorageResult<Response> {
        self.request(Method::HEAD, encoded_path, RequestOptions::new()).await
    }

    pub async fn delete(&self, encoded_path: &str) -> StorageResult<Response> {
        self.request(Method::DELETE, encoded_path, RequestOptions::new()).await
    }

    pub async fn options(&self, encoded_path: &str) -> StorageResult<Response> {
        self.request(Method::OPTIONS, encoded_path, RequestOptions::new()).await
    }

    /// PUT a body; the caller supplies Content-Type and Content-Length in `headers`
    pub async fn put(&self, encoded_path: &str, body: impl Into<Body>, headers: HeaderMap) -> StorageResult<Response> {
        let options = RequestOptions {
            headers,
            body: Some(body.into()),
        };
        self.request(Method::PUT, encoded_path, options).await
    }

    pub async fn mkcol(&self, encoded_path: &str) -> StorageResult<Response> {
        self.request(Self::dav_method("MKCOL")?, encoded_path, RequestOptions::new()).await
    }

    pub async fn move_resource(&self, encoded_source: &str, encoded_destination: &str, overwrite: bool) -> StorageResult<Response> {
        let options = RequestOptions::new()
            .header("destination", &self.destination_url(encoded_destination))?
            .header("overwrite", if overwrite { "T" } else { "F" })?;
        self.request(Self::dav_method("MOVE")?, encoded_source, options).await
    }

    pub async fn copy_resource(
        &self,
        encoded_source: &str,
        encoded_destination: &str,
        overwrite: bool,
        depth: Depth,
    ) -> StorageResult<Response> {
        let options = RequestOptions::new()
            .header("destination", &self.destination_url(encoded_destination))?
            .header("overwrite", if overwrite { "T" } else { "F" })?
            .header("depth", depth.as_str())?;
        self.request(Self::dav_method("COPY")?, encoded_source, options).await
    }
}

/// Content-Type header helper shared by upload paths
pub(crate) fn content_headers(content_type: &str, content_length: u64) -> StorageResult<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_str(content_type)
            .map_err(|e| StorageError::internal(format!("Invalid content type '{}': {}", content_type, e)))?,
    );
    headers.insert(reqwest::header::CONTENT_LENGTH, HeaderValue::from(content_length));
    Ok(headers)
}
