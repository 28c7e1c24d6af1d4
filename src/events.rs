//! Audit event sink
//!
//! A narrow capability interface for the append-only audit trail. The
//! pipeline records one line per decoded admission request and one per
//! applied mutation. Sinks are fire-and-forget: a failing sink logs a
//! warning and never influences the admission verdict.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Utc;
use tokio::io::AsyncWriteExt;
use tracing::warn;

/// Capability interface for recording audit events
///
/// `record` must not return errors; implementations swallow failures
/// after logging them so the decision path stays infallible.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Record one audit event
    async fn record(&self, message: &str);
}

/// Sink appending timestamped lines to a file
///
/// The file is opened in append mode on every call. Slower, but the
/// events file may be rotated away underneath a long-running webhook
/// and the next event has to recreate it.
pub struct FileEventSink {
    path: PathBuf,
}

impl FileEventSink {
    /// Sink writing to `path`, creating the file on first use
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl EventSink for FileEventSink {
    async fn record(&self, message: &str) {
        let line = format!("[{}] {}\n", Utc::now().to_rfc3339(), message);
        let written = async {
            let mut file = tokio::fs::OpenOptions::new()
                .append(true)
                .create(true)
                .open(&self.path)
                .await?;
            file.write_all(line.as_bytes()).await
        }
        .await;
        if let Err(e) = written {
            warn!(error = %e, file = %self.path.display(), "failed to record audit event");
        }
    }
}

/// Sink that drops every event, for deployments without an audit file
pub struct NoopEventSink;

#[async_trait]
impl EventSink for NoopEventSink {
    async fn record(&self, _message: &str) {}
}

/// In-memory sink collecting raw messages, for tests
#[derive(Default)]
pub struct MemoryEventSink {
    entries: tokio::sync::Mutex<Vec<String>>,
}

impl MemoryEventSink {
    /// Empty in-memory sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far, in arrival order
    pub async fn entries(&self) -> Vec<String> {
        self.entries.lock().await.clone()
    }
}

#[async_trait]
impl EventSink for MemoryEventSink {
    async fn record(&self, message: &str) {
        self.entries.lock().await.push(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn file_sink_appends_timestamped_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.txt");

        let sink = FileEventSink::new(&path);
        sink.record("admission request: uid=uid-1").await;
        sink.record("pod default/web-0: label \"changed\" replaced").await;

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with('['));
        assert!(lines[0].ends_with("admission request: uid=uid-1"));
        assert!(lines[1].contains("label \"changed\" replaced"));

        // Timestamp prefix is RFC 3339 inside brackets
        let stamp = lines[0]
            .strip_prefix('[')
            .and_then(|rest| rest.split(']').next())
            .unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(stamp).is_ok());
    }

    #[tokio::test]
    async fn file_sink_creates_the_file_on_first_event() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fresh-events.txt");
        assert!(!path.exists());

        FileEventSink::new(&path).record("first event").await;
        assert!(path.exists());
    }

    #[tokio::test]
    async fn file_sink_swallows_write_failures() {
        // Directory path cannot be opened as a file; record must not panic
        let dir = tempfile::tempdir().unwrap();
        FileEventSink::new(dir.path()).record("goes nowhere").await;
    }

    #[tokio::test]
    async fn memory_sink_collects_in_arrival_order() {
        let sink = MemoryEventSink::new();
        sink.record("first").await;
        sink.record("second").await;
        assert_eq!(sink.entries().await, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn sinks_are_usable_as_trait_objects() {
        let sinks: Vec<Arc<dyn EventSink>> =
            vec![Arc::new(NoopEventSink), Arc::new(MemoryEventSink::new())];
        for sink in sinks {
            sink.record("shared event").await;
        }
    }
}
