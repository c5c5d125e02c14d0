//! Mock source for testing purposes.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::models::{SearchResult, SourceTag};
use crate::sources::{Source, SourceError};

/// A mock source for testing that returns predefined responses.
#[derive(Debug)]
pub struct MockSource {
    tag: SourceTag,
    results: Mutex<Result<Vec<SearchResult>, String>>,
    delay: Mutex<Option<Duration>>,
    calls: AtomicUsize,
}

impl MockSource {
    /// Create a mock source answering with no results.
    pub fn new(tag: SourceTag) -> Self {
        Self {
            tag,
            results: Mutex::new(Ok(Vec::new())),
            delay: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    /// Set the results to return.
    pub fn set_results(&self, results: Vec<SearchResult>) {
        if let Ok(mut guard) = self.results.lock() {
            *guard = Ok(results);
        }
    }

    /// Answer every search with `SourceError::Unavailable`.
    pub fn set_error(&self, message: &str) {
        if let Ok(mut guard) = self.results.lock() {
            *guard = Err(message.to_string());
        }
    }

    /// Sleep before answering, to exercise timeouts.
    pub fn set_delay(&self, delay: Duration) {
        if let Ok(mut guard) = self.delay.lock() {
            *guard = Some(delay);
        }
    }

    /// Number of searches performed so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Source for MockSource {
    fn tag(&self) -> SourceTag {
        self.tag.clone()
    }

    fn name(&self) -> &str {
        "Mock Source"
    }

    async fn search(&self, _terms: &[String]) -> Result<Vec<SearchResult>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let delay = self.delay.lock().ok().and_then(|guard| *guard);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let guard = self
            .results
            .lock()
            .map_err(|e| SourceError::Other(e.to_string()))?;
        match &*guard {
            Ok(results) => Ok(results.clone()),
            Err(message) => Err(SourceError::Unavailable(message.clone())),
        }
    }
}
