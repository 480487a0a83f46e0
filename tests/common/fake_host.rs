#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use score_fetcher::transport::{AssetTransport, ProbeResponse, TransportError};

use super::constants::CATALOG_URL;

/// In-memory asset host. Unknown URLs answer 404.
#[derive(Default)]
pub struct FakeHost {
    files: Mutex<HashMap<String, Vec<u8>>>,
    log: Mutex<Vec<String>>,
}

impl FakeHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_catalog(catalog: &str) -> Arc<Self> {
        let host = Self::new();
        host.serve(CATALOG_URL, catalog.as_bytes().to_vec());
        host
    }

    pub fn serve(&self, url: &str, body: Vec<u8>) {
        self.files.lock().unwrap().insert(url.to_string(), body);
    }

    /// Every request so far, as `PROBE <url>` or `GET <url>`.
    pub fn requests(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    /// Distinct URLs requested whose path contains `needle`.
    pub fn urls_containing(&self, needle: &str) -> Vec<String> {
        let mut urls: Vec<String> = Vec::new();
        for entry in self.requests() {
            let url = entry.split_once(' ').map(|(_, u)| u).unwrap_or(&entry);
            if url.contains(needle) && !urls.iter().any(|u| u == url) {
                urls.push(url.to_string());
            }
        }
        urls
    }

    pub fn probe_count(&self) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.starts_with("PROBE "))
            .count()
    }
}

#[async_trait]
impl AssetTransport for FakeHost {
    async fn probe(&self, url: &str, max_bytes: u64) -> Result<ProbeResponse, TransportError> {
        self.log.lock().unwrap().push(format!("PROBE {}", url));
        match self.files.lock().unwrap().get(url) {
            Some(body) => {
                let end = body.len().min(max_bytes as usize);
                Ok(ProbeResponse {
                    status: 206,
                    head: body[..end].to_vec(),
                })
            }
            None => Ok(ProbeResponse {
                status: 404,
                head: Vec::new(),
            }),
        }
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        self.log.lock().unwrap().push(format!("GET {}", url));
        self.files
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or(TransportError::Status(404))
    }
}
