//! # Object Store Transport
//!
//! The remote backend never talks HTTP directly; it hands requests to an
//! [`ObjectTransport`]. [`HttpTransport`] signs and sends them over the
//! network, [`MemoryTransport`] answers them from an in-process bucket.

use std::collections::BTreeMap;
use std::fmt;
use std::io::{Cursor, Read};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use reqwest::Url;

use super::backend::ObjectSource;
use super::errors::{StorageError, StorageResult};
use super::signer::RequestSigner;

/// Request verbs used against the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Put,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Put => "PUT",
        }
    }
}

/// One request against the object store
#[derive(Debug, Clone)]
pub struct ObjectRequest {
    pub method: Method,
    pub url: Url,
    pub body: Vec<u8>,
}

impl ObjectRequest {
    pub fn new(method: Method, url: Url, body: Vec<u8>) -> Self {
        Self { method, url, body }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::Get, url, Vec::new())
    }
}

/// Status and streaming body of a store response
pub struct ObjectResponse {
    pub status: u16,
    pub body: ObjectSource,
}

impl ObjectResponse {
    pub fn new(status: u16, body: Vec<u8>) -> Self {
        Self {
            status,
            body: Box::new(Cursor::new(body)),
        }
    }

    /// Drain at most `limit` bytes of the body as text, for diagnostics
    pub fn text(self, limit: u64) -> String {
        let mut buf = Vec::new();
        let _ = self.body.take(limit).read_to_end(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    }
}

impl fmt::Debug for ObjectResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectResponse")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// Sends object store requests
pub trait ObjectTransport: Send + Sync + fmt::Debug {
    fn send(&self, request: ObjectRequest) -> StorageResult<ObjectResponse>;
}

/// Signed HTTP transport
#[derive(Debug)]
pub struct HttpTransport {
    client: reqwest::blocking::Client,
    signer: Arc<dyn RequestSigner>,
}

impl HttpTransport {
    /// Transport without a request timeout; chunk uploads can be large
    pub fn new(signer: Arc<dyn RequestSigner>) -> StorageResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(None::<Duration>)
            .build()
            .map_err(|e| StorageError::Transport(e.to_string()))?;
        Ok(Self { client, signer })
    }
}

impl ObjectTransport for HttpTransport {
    fn send(&self, request: ObjectRequest) -> StorageResult<ObjectResponse> {
        let headers = self.signer.sign(&request)?;

        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Put => reqwest::Method::PUT,
        };
        let mut builder = self.client.request(method, request.url.clone());
        for (name, value) in headers {
            builder = builder.header(name, value);
        }
        if request.method == Method::Put {
            builder = builder.body(request.body);
        }

        let response = builder
            .send()
            .map_err(|e| StorageError::Transport(format!("{} {}: {}", request.method.as_str(), request.url, e)))?;

        Ok(ObjectResponse {
            status: response.status().as_u16(),
            body: Box::new(response),
        })
    }
}

/// In-process bucket speaking the same PUT/GET/list protocol
///
/// Listings are capped at `page_limit` keys per response, like a real
/// store's single result page.
#[derive(Debug, Clone)]
pub struct MemoryTransport {
    objects: Arc<Mutex<BTreeMap<String, Vec<u8>>>>,
    requests: Arc<Mutex<Vec<(Method, String)>>>,
    page_limit: usize,
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::with_page_limit(1000)
    }

    pub fn with_page_limit(page_limit: usize) -> Self {
        Self {
            objects: Arc::new(Mutex::new(BTreeMap::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
            page_limit,
        }
    }

    /// Stored bytes for a key
    pub fn object(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().ok()?.get(key).cloned()
    }

    /// All stored keys in order
    pub fn keys(&self) -> Vec<String> {
        self.objects
            .lock()
            .map(|o| o.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Every request seen so far as (method, path)
    pub fn requests(&self) -> Vec<(Method, String)> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    fn list(&self, prefix: &str) -> StorageResult<ObjectResponse> {
        let objects = self.lock_objects()?;
        let matching: Vec<(&String, &Vec<u8>)> = objects
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .collect();
        let truncated = matching.len() > self.page_limit;

        let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<ListBucketResult>");
        xml.push_str(&format!("<Prefix>{}</Prefix>", prefix));
        xml.push_str(&format!("<IsTruncated>{}</IsTruncated>", truncated));
        for (key, data) in matching.into_iter().take(self.page_limit) {
            xml.push_str(&format!(
                "<Contents><Key>{}</Key><Size>{}</Size></Contents>",
                key.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;"),
                data.len()
            ));
        }
        xml.push_str("</ListBucketResult>");
        Ok(ObjectResponse::new(200, xml.into_bytes()))
    }

    fn lock_objects(&self) -> StorageResult<std::sync::MutexGuard<'_, BTreeMap<String, Vec<u8>>>> {
        self.objects
            .lock()
            .map_err(|_| StorageError::Transport("memory bucket poisoned".into()))
    }
}

impl ObjectTransport for MemoryTransport {
    fn send(&self, request: ObjectRequest) -> StorageResult<ObjectResponse> {
        let key = request.url.path().trim_start_matches('/').to_string();
        if let Ok(mut log) = self.requests.lock() {
            log.push((request.method, key.clone()));
        }

        match request.method {
            Method::Put => {
                self.lock_objects()?.insert(key, request.body);
                Ok(ObjectResponse::new(200, Vec::new()))
            }
            Method::Get if key.is_empty() => {
                let prefix = request
                    .url
                    .query_pairs()
                    .find(|(k, _)| k == "prefix")
                    .map(|(_, v)| v.into_owned())
                    .unwrap_or_default();
                self.list(&prefix)
            }
            Method::Get => match self.lock_objects()?.get(&key) {
                Some(data) => Ok(ObjectResponse::new(200, data.clone())),
                None => Ok(ObjectResponse::new(404, b"<Error><Code>NoSuchKey</Code></Error>".to_vec())),
            },
        }
    }
}
