//! Sources of environment payloads.

use std::collections::VecDeque;
use std::future::Future;
use std::path::PathBuf;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::trace;

use crate::error::TransportError;

/// Something that can produce one raw environment payload per call.
///
/// Implementations decide the transport; the link only needs decoded JSON back.
pub trait FetchClient: Send + Sync + 'static {
    fn fetch(&self) -> impl Future<Output = Result<Value, TransportError>> + Send;
}

/// Reads the payload from a JSON file on every fetch.
#[derive(Debug, Clone)]
pub struct FileFetchClient {
    path: PathBuf,
}

impl FileFetchClient {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl FetchClient for FileFetchClient {
    async fn fetch(&self) -> Result<Value, TransportError> {
        let text = tokio::fs::read_to_string(&self.path).await?;
        trace!(path = %self.path.display(), bytes = text.len(), "payload read");
        Ok(serde_json::from_str(&text)?)
    }
}

/// Hands out a fixed sequence of payloads, then reports [`TransportError::Exhausted`].
#[derive(Debug, Default)]
pub struct ReplayFetchClient {
    queue: Mutex<VecDeque<Value>>,
}

impl ReplayFetchClient {
    pub fn new(payloads: impl IntoIterator<Item = Value>) -> Self {
        Self {
            queue: Mutex::new(payloads.into_iter().collect()),
        }
    }

    pub fn push(&self, payload: Value) {
        self.queue.lock().push_back(payload);
    }

    pub fn remaining(&self) -> usize {
        self.queue.lock().len()
    }
}

impl FetchClient for ReplayFetchClient {
    async fn fetch(&self) -> Result<Value, TransportError> {
        self.queue.lock().pop_front().ok_or(TransportError::Exhausted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_replay_then_exhausted() {
        let client = ReplayFetchClient::new([json!({"n": 1})]);
        client.push(json!({"n": 2}));
        assert_eq!(client.fetch().await.unwrap(), json!({"n": 1}));
        assert_eq!(client.fetch().await.unwrap(), json!({"n": 2}));
        assert!(matches!(client.fetch().await, Err(TransportError::Exhausted)));
        assert_eq!(client.remaining(), 0);
    }

    #[tokio::test]
    async fn test_file_client() {
        let dir = std::env::temp_dir().join(format!("drops-fetch-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let good = dir.join("payload.json");
        std::fs::write(&good, r#"{"is_changed": false}"#).unwrap();
        let value = FileFetchClient::new(&good).fetch().await.unwrap();
        assert_eq!(value, json!({"is_changed": false}));

        let garbled = dir.join("garbled.json");
        std::fs::write(&garbled, "{not json").unwrap();
        assert!(matches!(
            FileFetchClient::new(&garbled).fetch().await,
            Err(TransportError::Decode(_))
        ));

        assert!(matches!(
            FileFetchClient::new(dir.join("missing.json")).fetch().await,
            Err(TransportError::Io(_))
        ));
    }
}
