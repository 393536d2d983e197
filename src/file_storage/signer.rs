//! # Request Signing
//!
//! AWS Signature Version 4 for S3-compatible stores. Credentials are read
//! from the environment at signing time, so a missing key surfaces before
//! any request leaves the process.

use std::fmt;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use regex::Regex;
use sha2::{Digest, Sha256};

use super::errors::{StorageError, StorageResult};
use super::transport::ObjectRequest;

type HmacSha256 = Hmac<Sha256>;

/// Produces the extra headers that authenticate a request
pub trait RequestSigner: Send + Sync + fmt::Debug {
    /// Headers to attach to `request`
    fn sign(&self, request: &ObjectRequest) -> StorageResult<Vec<(String, String)>>;
}

/// Access key material for the remote store
#[derive(Clone)]
pub struct Credentials {
    access_key: String,
    secret_key: String,
    session_token: Option<String>,
}

impl Credentials {
    pub const ACCESS_KEY_VAR: &'static str = "AWS_ACCESS_KEY_ID";
    pub const SECRET_KEY_VAR: &'static str = "AWS_SECRET_ACCESS_KEY";
    pub const SESSION_TOKEN_VAR: &'static str = "AWS_SESSION_TOKEN";

    /// Build credentials from explicit values
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            session_token: None,
        }
    }

    /// Read credentials from the process environment
    pub fn from_env() -> StorageResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read credentials through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> StorageResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &'static str| lookup(name).filter(|v| !v.is_empty());

        let access_key = get(Self::ACCESS_KEY_VAR)
            .ok_or(StorageError::MissingCredentials(Self::ACCESS_KEY_VAR))?;
        let secret_key = get(Self::SECRET_KEY_VAR)
            .ok_or(StorageError::MissingCredentials(Self::SECRET_KEY_VAR))?;

        Ok(Self {
            access_key,
            secret_key,
            session_token: get(Self::SESSION_TOKEN_VAR),
        })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Signature V4 signer reading credentials from the environment
#[derive(Debug, Clone)]
pub struct SigV4Signer {
    region: Option<String>,
    service: String,
}

impl SigV4Signer {
    /// Signer for S3, region resolved per request
    pub fn s3() -> Self {
        Self {
            region: std::env::var("AWS_REGION")
                .or_else(|_| std::env::var("AWS_DEFAULT_REGION"))
                .ok()
                .filter(|r| !r.is_empty()),
            service: "s3".to_string(),
        }
    }

    /// Signer with a fixed region and service
    pub fn new(region: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            region: Some(region.into()),
            service: service.into(),
        }
    }

    fn region_for(&self, host: &str) -> String {
        if let Some(region) = &self.region {
            return region.clone();
        }
        region_from_host(host).unwrap_or_else(|| "us-east-1".to_string())
    }

    /// Sign with explicit credentials and clock
    pub fn sign_with(
        &self,
        request: &ObjectRequest,
        credentials: &Credentials,
        now: DateTime<Utc>,
    ) -> StorageResult<Vec<(String, String)>> {
        let url = &request.url;
        let host = match (url.host_str(), url.port()) {
            (Some(h), Some(p)) => format!("{}:{}", h, p),
            (Some(h), None) => h.to_string(),
            (None, _) => return Err(StorageError::InvalidTarget(url.to_string())),
        };
        let region = self.region_for(url.host_str().unwrap_or_default());

        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date = now.format("%Y%m%d").to_string();
        let payload_hash = hex::encode(Sha256::digest(&request.body));

        let mut headers = vec![
            ("host".to_string(), host),
            ("x-amz-content-sha256".to_string(), payload_hash.clone()),
            ("x-amz-date".to_string(), amz_date.clone()),
        ];
        if let Some(token) = &credentials.session_token {
            headers.push(("x-amz-security-token".to_string(), token.clone()));
        }
        headers.sort();

        let signed_headers = headers
            .iter()
            .map(|(k, _)| k.as_str())
            .collect::<Vec<_>>()
            .join(";");
        let canonical_headers: String = headers
            .iter()
            .map(|(k, v)| format!("{}:{}\n", k, v.trim()))
            .collect();

        let canonical_request = format!(
            "{}\n{}\n{}\n{}\n{}\n{}",
            request.method.as_str(),
            canonical_uri(url.path()),
            canonical_query(url),
            canonical_headers,
            signed_headers,
            payload_hash
        );

        let scope = format!("{}/{}/{}/aws4_request", date, region, self.service);
        let string_to_sign = format!(
            "AWS4-HMAC-SHA256\n{}\n{}\n{}",
            amz_date,
            scope,
            hex::encode(Sha256::digest(canonical_request.as_bytes()))
        );

        let key = signing_key(&credentials.secret_key, &date, &region, &self.service)?;
        let signature = hex::encode(hmac(&key, string_to_sign.as_bytes())?);

        let mut out: Vec<(String, String)> = headers
            .into_iter()
            .filter(|(k, _)| k != "host")
            .collect();
        out.push((
            "authorization".to_string(),
            format!(
                "AWS4-HMAC-SHA256 Credential={}/{}, SignedHeaders={}, Signature={}",
                credentials.access_key, scope, signed_headers, signature
            ),
        ));
        Ok(out)
    }
}

impl RequestSigner for SigV4Signer {
    fn sign(&self, request: &ObjectRequest) -> StorageResult<Vec<(String, String)>> {
        let credentials = Credentials::from_env()?;
        self.sign_with(request, &credentials, Utc::now())
    }
}

fn region_from_host(host: &str) -> Option<String> {
    let pattern = Regex::new(r"s3[.-]([a-z0-9-]+)\.amazonaws\.com$").ok()?;
    pattern
        .captures(host)
        .map(|c| c[1].to_string())
        .filter(|r| r != "external-1")
}

fn hmac(key: &[u8], data: &[u8]) -> StorageResult<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| StorageError::Transport(format!("HMAC key rejected: {}", e)))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Derive the SigV4 signing key
pub fn signing_key(secret: &str, date: &str, region: &str, service: &str) -> StorageResult<Vec<u8>> {
    let k_date = hmac(format!("AWS4{}", secret).as_bytes(), date.as_bytes())?;
    let k_region = hmac(&k_date, region.as_bytes())?;
    let k_service = hmac(&k_region, service.as_bytes())?;
    hmac(&k_service, b"aws4_request")
}

fn uri_encode(input: &str, encode_slash: bool) -> String {
    let mut out = String::with_capacity(input.len());
    for b in input.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char)
            }
            b'/' if !encode_slash => out.push('/'),
            _ => out.push_str(&format!("%{:02X}", b)),
        }
    }
    out
}

fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hi = (bytes[i + 1] as char).to_digit(16);
            let lo = (bytes[i + 2] as char).to_digit(16);
            if let (Some(hi), Some(lo)) = (hi, lo) {
                out.push((hi * 16 + lo) as u8);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn canonical_uri(path: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }
    uri_encode(&percent_decode(path), false)
}

fn canonical_query(url: &reqwest::Url) -> String {
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (uri_encode(&k, true), uri_encode(&v, true)))
        .collect();
    pairs.sort();
    pairs
        .into_iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}
