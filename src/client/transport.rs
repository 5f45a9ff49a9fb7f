//! REST transport shared by the service clients.
//!
//! Builds requests against a service endpoint, signs them, applies the
//! request's retry policy and turns error responses into [`ServiceError`]s.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand::distributions::Alphanumeric;
use rand::Rng;
use reqwest::header::{
    HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, DATE, HOST,
};
use reqwest::Method;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs1v15::SigningKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::signature::{SignatureEncoding, Signer};
use rsa::RsaPrivateKey;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::debug;

use super::RequestMetadata;
use crate::config::ProviderConfig;
use crate::error::{ProviderError, ServiceError};
use crate::retry::{call_with_retry, RetryPolicy};

const OPC_REQUEST_ID: &str = "opc-request-id";
const OPC_NEXT_PAGE: &str = "opc-next-page";
const OPC_RETRY_TOKEN: &str = "opc-retry-token";
const X_CONTENT_SHA256: &str = "x-content-sha256";

/// Adds authentication to an outgoing request.
pub trait RequestSigner: Send + Sync {
    /// Add authentication headers to `request`.
    fn sign(&self, request: &mut reqwest::Request) -> Result<(), ProviderError>;
}

fn date_header() -> Result<HeaderValue, ProviderError> {
    let now = chrono::Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string();
    HeaderValue::from_str(&now).map_err(|e| ProviderError::Sdk(e.to_string()))
}

fn header_value(value: &str) -> Result<HeaderValue, ProviderError> {
    HeaderValue::from_str(value).map_err(|e| ProviderError::Sdk(e.to_string()))
}

fn read_file(path: &str, what: &str) -> Result<String, ProviderError> {
    std::fs::read_to_string(path).map_err(|e| {
        ProviderError::Configuration(format!("can not read {} {}: {}", what, path, e))
    })
}

/// Parse an RSA private key in PKCS#8 or PKCS#1 PEM form.
pub fn parse_private_key(pem: &str) -> Result<RsaPrivateKey, ProviderError> {
    RsaPrivateKey::from_pkcs8_pem(pem)
        .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
        .map_err(|e| ProviderError::Configuration(format!("invalid private key: {}", e)))
}

/// The `(request-target)` pseudo header: lowercased method, path and query.
fn request_target(method: &Method, url: &reqwest::Url) -> String {
    match url.query() {
        Some(query) => format!("{} {}?{}", method.as_str().to_lowercase(), url.path(), query),
        None => format!("{} {}", method.as_str().to_lowercase(), url.path()),
    }
}

/// Build the string covered by the signature, one `name: value` line per
/// signed header.
fn signing_string(names: &[&str], target: &str, headers: &HeaderMap) -> Result<String, ProviderError> {
    let mut lines = Vec::with_capacity(names.len());
    for name in names {
        if *name == "(request-target)" {
            lines.push(format!("(request-target): {}", target));
            continue;
        }
        let value = headers
            .get(*name)
            .ok_or_else(|| ProviderError::Sdk(format!("missing header {} for signing", name)))?
            .to_str()
            .map_err(|e| ProviderError::Sdk(e.to_string()))?;
        lines.push(format!("{}: {}", name, value));
    }
    Ok(lines.join("\n"))
}

/// Signs requests with the OCI HTTP signature scheme (`rsa-sha256`).
///
/// `GET` and `DELETE` sign `date (request-target) host`; requests with a
/// body also sign `content-length content-type x-content-sha256`.
pub struct HttpSigner {
    key_id: String,
    signing_key: SigningKey<Sha256>,
}

impl HttpSigner {
    /// Signer for `key_id` using `key`.
    pub fn new(key_id: impl Into<String>, key: RsaPrivateKey) -> Self {
        Self {
            key_id: key_id.into(),
            signing_key: SigningKey::<Sha256>::new(key),
        }
    }

    /// API key signer; the key id is `tenancy/user/fingerprint`.
    pub fn api_key(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let required = |value: &Option<String>, name: &str| {
            value.clone().filter(|v| !v.is_empty()).ok_or_else(|| {
                ProviderError::Configuration(format!("{} is required when auth is ApiKey", name))
            })
        };
        let key_id = format!(
            "{}/{}/{}",
            required(&config.tenancy_ocid, "tenancy_ocid")?,
            required(&config.user_ocid, "user_ocid")?,
            required(&config.fingerprint, "fingerprint")?
        );
        let path = required(&config.private_key_path, "private_key_path")?;
        let key = parse_private_key(&read_file(&path, "private key")?)?;
        Ok(Self::new(key_id, key))
    }

    /// Session token signer for tokens from `oci session authenticate`. The
    /// token is the key id and the session's own key signs.
    pub fn session_token(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let required = |value: &Option<String>, name: &str| {
            value.clone().filter(|v| !v.is_empty()).ok_or_else(|| {
                ProviderError::Configuration(format!(
                    "{} is required when auth is SecurityToken",
                    name
                ))
            })
        };
        let token_path = required(&config.security_token_file, "security_token_file")?;
        let token = read_file(&token_path, "security token file")?;
        let key_path = required(&config.private_key_path, "private_key_path")?;
        let key = parse_private_key(&read_file(&key_path, "private key")?)?;
        Ok(Self::new(format!("ST${}", token.trim()), key))
    }

    /// The key id placed in the `Authorization` header.
    pub fn key_id(&self) -> &str {
        &self.key_id
    }
}

impl RequestSigner for HttpSigner {
    fn sign(&self, request: &mut reqwest::Request) -> Result<(), ProviderError> {
        let method = request.method().clone();
        let target = request_target(&method, request.url());
        let host = match (request.url().host_str(), request.url().port()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            (None, _) => return Err(ProviderError::Sdk("request url has no host".to_string())),
        };
        let body = request
            .body()
            .and_then(reqwest::Body::as_bytes)
            .map(<[u8]>::to_vec)
            .unwrap_or_default();

        let headers = request.headers_mut();
        headers.insert(DATE, date_header()?);
        headers.insert(HOST, header_value(&host)?);
        let mut names = vec!["date", "(request-target)", "host"];
        if method == Method::POST || method == Method::PUT {
            headers.insert(CONTENT_LENGTH, HeaderValue::from(body.len()));
            if !headers.contains_key(CONTENT_TYPE) {
                headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            }
            headers.insert(X_CONTENT_SHA256, header_value(&STANDARD.encode(Sha256::digest(&body)))?);
            names.extend(["content-length", "content-type", X_CONTENT_SHA256]);
        }

        let plain = signing_string(&names, &target, headers)?;
        let signature = self
            .signing_key
            .try_sign(plain.as_bytes())
            .map_err(|e| ProviderError::Sdk(format!("signing failed: {}", e)))?;
        let authorization = format!(
            "Signature version=\"1\",keyId=\"{}\",algorithm=\"rsa-sha256\",headers=\"{}\",signature=\"{}\"",
            self.key_id,
            names.join(" "),
            STANDARD.encode(signature.to_bytes())
        );
        headers.insert(AUTHORIZATION, header_value(&authorization)?);
        Ok(())
    }
}

/// One logical API call.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    /// SDK operation name, e.g. `GetDbSystem`.
    pub operation: &'static str,
    /// HTTP method.
    pub method: Method,
    /// Path below the endpoint, e.g. `/20160918/dbSystems/ocid1...`.
    pub path: String,
    /// Query parameters; `None` values are skipped.
    pub query: Vec<(&'static str, Option<String>)>,
    /// JSON body.
    pub body: Option<Value>,
}

impl ApiRequest {
    /// A request without query or body.
    pub fn new(operation: &'static str, method: Method, path: impl Into<String>) -> Self {
        Self {
            operation,
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    /// Add a query parameter when it has a value.
    pub fn query(mut self, name: &'static str, value: Option<impl ToString>) -> Self {
        self.query.push((name, value.map(|v| v.to_string())));
        self
    }

    /// Attach a JSON body.
    pub fn body(mut self, body: &impl serde::Serialize) -> Result<Self, ProviderError> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }
}

/// A successful response.
#[derive(Debug, Clone)]
pub struct ApiResponse<T> {
    /// Decoded body.
    pub body: T,
    /// The `opc-request-id` header.
    pub opc_request_id: Option<String>,
    /// The `opc-next-page` header.
    pub opc_next_page: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ErrorBody {
    code: String,
    message: String,
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Parse an error response body into a [`ServiceError`].
pub fn service_error(operation: &str, status: u16, request_id: Option<String>, body: &str) -> ServiceError {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let code = if parsed.code.is_empty() {
        "Unknown".to_string()
    } else {
        parsed.code
    };
    let message = if parsed.message.is_empty() {
        body.trim().to_string()
    } else {
        parsed.message
    };
    let err = ServiceError::new(operation, status, code, message);
    match request_id {
        Some(id) => err.with_request_id(id),
        None => err,
    }
}

fn retry_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

/// HTTP access to one service endpoint.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    signer: Arc<dyn RequestSigner>,
}

impl HttpTransport {
    /// Transport for `base_url`, e.g. `https://database.us-phoenix-1.oraclecloud.com`.
    pub fn new(base_url: impl Into<String>, signer: Arc<dyn RequestSigner>) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("terraform-provider-oci/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            signer,
        })
    }

    /// The endpoint this transport talks to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn execute(
        &self,
        request: &ApiRequest,
        retry_token: Option<&str>,
    ) -> Result<ApiResponse<String>, ProviderError> {
        let url = format!("{}{}", self.base_url, request.path);
        let query: Vec<(&str, &str)> = request
            .query
            .iter()
            .filter_map(|(k, v)| v.as_deref().map(|v| (*k, v)))
            .collect();

        let mut builder = self
            .client
            .request(request.method.clone(), &url)
            .query(&query);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        if let Some(token) = retry_token {
            builder = builder.header(OPC_RETRY_TOKEN, token);
        }
        let mut http_request = builder.build()?;
        self.signer.sign(&mut http_request)?;

        let response = self.client.execute(http_request).await?;
        let status = response.status();
        let opc_request_id = header(response.headers(), OPC_REQUEST_ID);
        let opc_next_page = header(response.headers(), OPC_NEXT_PAGE);
        let body = response.text().await?;
        debug!(
            operation = request.operation,
            status = status.as_u16(),
            opc_request_id = opc_request_id.as_deref().unwrap_or("-"),
            "SDK call"
        );

        if !status.is_success() {
            return Err(service_error(request.operation, status.as_u16(), opc_request_id, &body).into());
        }
        Ok(ApiResponse {
            body,
            opc_request_id,
            opc_next_page,
        })
    }

    async fn send(
        &self,
        request: &ApiRequest,
        metadata: &RequestMetadata,
    ) -> Result<ApiResponse<String>, ProviderError> {
        // The same token on every attempt lets the service drop duplicates.
        let token = (request.method == Method::POST).then(retry_token);
        let policy = metadata
            .retry_policy
            .clone()
            .unwrap_or_else(|| RetryPolicy::no_retry(""));
        call_with_retry(&policy, request.operation, || {
            self.execute(request, token.as_deref())
        })
        .await
    }

    /// Send `request` and decode the JSON body.
    pub async fn call<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
        metadata: &RequestMetadata,
    ) -> Result<ApiResponse<T>, ProviderError> {
        let response = self.send(&request, metadata).await?;
        Ok(ApiResponse {
            body: serde_json::from_str(&response.body)?,
            opc_request_id: response.opc_request_id,
            opc_next_page: response.opc_next_page,
        })
    }

    /// Send `request` and ignore the body.
    pub async fn call_empty(
        &self,
        request: ApiRequest,
        metadata: &RequestMetadata,
    ) -> Result<ApiResponse<()>, ProviderError> {
        let response = self.send(&request, metadata).await?;
        Ok(ApiResponse {
            body: (),
            opc_request_id: response.opc_request_id,
            opc_next_page: response.opc_next_page,
        })
    }
}
