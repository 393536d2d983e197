//! # Remote Object Store Backend
//!
//! S3-style bucket addressed as `scheme://host`. The wire protocol has no
//! append, so a sink buffers the whole object in memory and uploads it with
//! a single PUT on commit.
//!
//! Listing issues one prefix query and only sees the store's first result
//! page. A truncated page is an error unless explicitly allowed.

use std::io::{self, Write};
use std::sync::Arc;

use regex::Regex;
use reqwest::Url;
use tracing::warn;

use super::backend::{ObjectSink, ObjectSource, StorageBackend, WalkFn};
use super::errors::{StorageError, StorageResult};
use super::transport::{Method, ObjectRequest, ObjectTransport};
use crate::observability::Event;

/// Bytes of an error response body kept for diagnostics
const ERROR_BODY_LIMIT: u64 = 4096;

/// Remote object store backend
#[derive(Debug, Clone)]
pub struct RemoteBackend {
    bucket: Url,
    transport: Arc<dyn ObjectTransport>,
    allow_truncated_listing: bool,
}

impl RemoteBackend {
    /// Backend for the bucket at `bucket` (e.g. `https://mybucket.s3.amazonaws.com`)
    pub fn new(bucket: &str, transport: Arc<dyn ObjectTransport>) -> StorageResult<Self> {
        let url = Url::parse(bucket).map_err(|e| StorageError::InvalidTarget(format!("{}: {}", bucket, e)))?;
        if url.host_str().is_none() {
            return Err(StorageError::InvalidTarget(format!("{}: missing host", bucket)));
        }
        Ok(Self {
            bucket: url,
            transport,
            allow_truncated_listing: false,
        })
    }

    /// Accept single-page listings that the store reports as truncated
    pub fn allow_truncated_listing(mut self, allow: bool) -> Self {
        self.allow_truncated_listing = allow;
        self
    }

    fn object_url(&self, path: &str) -> StorageResult<Url> {
        let base = self.bucket.as_str().trim_end_matches('/');
        let key = path.trim_start_matches('/');
        Url::parse(&format!("{}/{}", base, key))
            .map_err(|e| StorageError::InvalidPath(format!("{}: {}", path, e)))
    }
}

impl StorageBackend for RemoteBackend {
    fn save(&self, path: &str) -> StorageResult<Box<dyn ObjectSink>> {
        Ok(Box::new(RemoteSink {
            url: self.object_url(path)?,
            buffer: Vec::new(),
            transport: Arc::clone(&self.transport),
        }))
    }

    fn fetch(&self, path: &str) -> StorageResult<ObjectSource> {
        let url = self.object_url(path)?;
        let response = self.transport.send(ObjectRequest::get(url.clone()))?;

        match response.status {
            200 => Ok(response.body),
            404 => Err(StorageError::ObjectNotFound(path.to_string())),
            // Body may be a huge object, keep only the head of it
            status => Err(StorageError::UnexpectedStatus {
                url: url.to_string(),
                status,
                body: response.text(ERROR_BODY_LIMIT),
            }),
        }
    }

    fn walk(&self, root: &str, visit: &mut WalkFn<'_>) -> StorageResult<()> {
        let mut prefix = root.trim_start_matches('/').to_string();
        if !prefix.is_empty() && !prefix.ends_with('/') {
            prefix.push('/');
        }

        let mut url = self.bucket.clone();
        url.set_path("/");
        url.query_pairs_mut().clear().append_pair("prefix", &prefix);

        let response = self.transport.send(ObjectRequest::get(url.clone()))?;
        let status = response.status;
        let body = response.text(u64::MAX);
        if status != 200 {
            return Err(StorageError::UnexpectedStatus {
                url: url.to_string(),
                status,
                body,
            });
        }

        let listing = parse_listing(&body)?;
        if listing.truncated {
            if !self.allow_truncated_listing {
                return Err(StorageError::ListingTruncated(prefix));
            }
            warn!(
                event = %Event::ListingTruncated,
                prefix = %prefix,
                keys = listing.keys.len(),
                "listing truncated to first page"
            );
        }

        for key in &listing.keys {
            visit(key, None)?;
        }
        Ok(())
    }
}

/// One parsed listing page
#[derive(Debug, Default, PartialEq, Eq)]
struct Listing {
    keys: Vec<String>,
    truncated: bool,
}

fn parse_listing(body: &str) -> StorageResult<Listing> {
    if !body.contains("<ListBucketResult") {
        return Err(StorageError::MalformedListing(
            body.chars().take(200).collect(),
        ));
    }
    let key_pattern = Regex::new(r"<Key>([^<]*)</Key>")
        .map_err(|e| StorageError::MalformedListing(e.to_string()))?;
    let truncated_pattern = Regex::new(r"<IsTruncated>\s*true\s*</IsTruncated>")
        .map_err(|e| StorageError::MalformedListing(e.to_string()))?;

    Ok(Listing {
        keys: key_pattern
            .captures_iter(body)
            .map(|c| xml_unescape(&c[1]))
            .collect(),
        truncated: truncated_pattern.is_match(body),
    })
}

fn xml_unescape(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Buffers the whole object, uploads it on commit
struct RemoteSink {
    url: Url,
    buffer: Vec<u8>,
    transport: Arc<dyn ObjectTransport>,
}

impl Write for RemoteSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl ObjectSink for RemoteSink {
    fn commit(self: Box<Self>) -> StorageResult<()> {
        let RemoteSink {
            url,
            buffer,
            transport,
        } = *self;
        let response = transport.send(ObjectRequest::new(Method::Put, url.clone(), buffer))?;
        if response.status != 200 {
            return Err(StorageError::UnexpectedStatus {
                url: url.to_string(),
                status: response.status,
                body: response.text(ERROR_BODY_LIMIT),
            });
        }
        Ok(())
    }
}
