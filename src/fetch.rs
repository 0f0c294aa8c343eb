//! Byte fetching
//!
//! Toolchain binaries and the sysroot archive are static assets. Everything
//! that needs bytes from a URI goes through the [`Fetcher`] trait:
//! - [`HttpFetcher`] uses the browser Fetch API (wasm32 only)
//! - [`StaticFetcher`] serves a fixed in-memory table (tests, native tools)

use futures::future::LocalBoxFuture;
use std::cell::RefCell;
use std::collections::HashMap;
use thiserror::Error;

/// Fetch failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The request could not be made or the body could not be read
    #[error("fetch {uri} failed: {reason}")]
    Network { uri: String, reason: String },
    /// The server answered with a non-success status
    #[error("fetch {uri} failed: HTTP {status}")]
    Status { uri: String, status: u16 },
}

pub type FetchResult<T> = Result<T, FetchError>;

/// Source of raw bytes keyed by URI
pub trait Fetcher {
    fn fetch(&self, uri: &str) -> LocalBoxFuture<'static, FetchResult<Vec<u8>>>;
}

/// In-memory fetcher; unknown URIs answer 404
#[derive(Debug, Default)]
pub struct StaticFetcher {
    assets: RefCell<HashMap<String, Vec<u8>>>,
    requests: RefCell<Vec<String>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register bytes for a URI, replacing any previous entry
    pub fn insert(&self, uri: &str, bytes: Vec<u8>) {
        self.assets.borrow_mut().insert(uri.to_string(), bytes);
    }

    /// Every URI requested so far, in order
    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }
}

impl Fetcher for StaticFetcher {
    fn fetch(&self, uri: &str) -> LocalBoxFuture<'static, FetchResult<Vec<u8>>> {
        self.requests.borrow_mut().push(uri.to_string());
        let result = self
            .assets
            .borrow()
            .get(uri)
            .cloned()
            .ok_or_else(|| FetchError::Status {
                uri: uri.to_string(),
                status: 404,
            });
        Box::pin(async move { result })
    }
}

/// Fetch API client
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpFetcher;

#[cfg(target_arch = "wasm32")]
impl HttpFetcher {
    pub fn new() -> Self {
        Self
    }

    async fn get(uri: String) -> FetchResult<Vec<u8>> {
        use wasm_bindgen::JsCast;
        use wasm_bindgen_futures::JsFuture;

        let network = |reason: String| FetchError::Network {
            uri: uri.clone(),
            reason,
        };

        let window = web_sys::window().ok_or_else(|| network("no window object".into()))?;

        let opts = web_sys::RequestInit::new();
        opts.set_method("GET");
        opts.set_mode(web_sys::RequestMode::Cors);

        let request = web_sys::Request::new_with_str_and_init(&uri, &opts)
            .map_err(|e| network(format!("failed to create request: {:?}", e)))?;

        let resp_value = JsFuture::from(window.fetch_with_request(&request))
            .await
            .map_err(|e| network(format!("{:?}", e)))?;

        let resp: web_sys::Response = resp_value
            .dyn_into()
            .map_err(|_| network("failed to cast response".into()))?;

        if !resp.ok() {
            return Err(FetchError::Status {
                uri: uri.clone(),
                status: resp.status(),
            });
        }

        let array_buffer = JsFuture::from(
            resp.array_buffer()
                .map_err(|e| network(format!("failed to get body: {:?}", e)))?,
        )
        .await
        .map_err(|e| network(format!("failed to read body: {:?}", e)))?;

        Ok(js_sys::Uint8Array::new(&array_buffer).to_vec())
    }
}

#[cfg(target_arch = "wasm32")]
impl Fetcher for HttpFetcher {
    fn fetch(&self, uri: &str) -> LocalBoxFuture<'static, FetchResult<Vec<u8>>> {
        Box::pin(Self::get(uri.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    #[test]
    fn test_static_fetcher_hit_and_miss() {
        let fetcher = StaticFetcher::new();
        fetcher.insert("/clang.wasm", vec![1, 2, 3]);

        assert_eq!(block_on(fetcher.fetch("/clang.wasm")), Ok(vec![1, 2, 3]));
        assert_eq!(
            block_on(fetcher.fetch("/missing")),
            Err(FetchError::Status {
                uri: "/missing".into(),
                status: 404
            })
        );
        assert_eq!(fetcher.requests(), vec!["/clang.wasm", "/missing"]);
    }

    #[test]
    fn test_error_display() {
        let err = FetchError::Status {
            uri: "/clang-fs.tar.gz".into(),
            status: 503,
        };
        assert_eq!(err.to_string(), "fetch /clang-fs.tar.gz failed: HTTP 503");
    }
}
