//! Progress reporting from concurrent region tasks.
//!
//! The coordinator reports every region task through a [`ProgressSink`]. Sinks are
//! shared across tokio tasks, so implementations synchronize internally.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Instant;

/// Maximum number of status messages to retain
const MAX_MESSAGES: usize = 256;

/// Opaque handle returned by [`ProgressSink::begin`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgressHandle(pub u64);

pub trait ProgressSink: Send + Sync {
    fn begin(&self, label: &str) -> ProgressHandle;
    fn complete(&self, handle: ProgressHandle);
    fn fail(&self, handle: ProgressHandle, label: &str);
}

/// Sink used when the caller does not want progress
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn begin(&self, _label: &str) -> ProgressHandle {
        ProgressHandle(0)
    }

    fn complete(&self, _handle: ProgressHandle) {}

    fn fail(&self, _handle: ProgressHandle, _label: &str) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusState {
    Started,
    Completed,
    Failed,
}

#[derive(Clone, Debug)]
pub struct StatusMessage {
    pub timestamp: Instant,
    pub handle: ProgressHandle,
    pub label: String,
    pub state: StatusState,
}

impl StatusMessage {
    pub fn display_text(&self) -> String {
        match self.state {
            StatusState::Started => format!("... {}", self.label),
            StatusState::Completed => format!("done {}", self.label),
            StatusState::Failed => format!("FAILED {}", self.label),
        }
    }
}

/// Thread-safe recording sink; optionally echoes every transition to stderr
#[derive(Clone, Default)]
pub struct StatusChannel {
    messages: Arc<RwLock<VecDeque<StatusMessage>>>,
    next_handle: Arc<AtomicU64>,
    echo: bool,
}

impl StatusChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// A channel that also prints each transition to stderr
    pub fn with_echo() -> Self {
        Self {
            echo: true,
            ..Self::default()
        }
    }

    fn send(&self, message: StatusMessage) {
        if self.echo {
            eprintln!("{}", message.display_text());
        }
        if let Ok(mut messages) = self.messages.write() {
            while messages.len() >= MAX_MESSAGES {
                messages.pop_front();
            }
            messages.push_back(message);
        }
    }

    fn label_for(&self, handle: ProgressHandle) -> String {
        self.messages
            .read()
            .ok()
            .and_then(|messages| {
                messages
                    .iter()
                    .find(|m| m.handle == handle && m.state == StatusState::Started)
                    .map(|m| m.label.clone())
            })
            .unwrap_or_default()
    }

    pub fn messages(&self) -> Vec<StatusMessage> {
        self.messages
            .read()
            .map(|messages| messages.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Labels reported through `fail`, in report order
    pub fn failed_labels(&self) -> Vec<String> {
        self.messages()
            .into_iter()
            .filter(|m| m.state == StatusState::Failed)
            .map(|m| m.label)
            .collect()
    }

    /// Labels begun but neither completed nor failed yet
    pub fn active_labels(&self) -> Vec<String> {
        let messages = self.messages();
        messages
            .iter()
            .filter(|m| m.state == StatusState::Started)
            .filter(|started| {
                !messages
                    .iter()
                    .any(|m| m.handle == started.handle && m.state != StatusState::Started)
            })
            .map(|m| m.label.clone())
            .collect()
    }
}

impl ProgressSink for StatusChannel {
    fn begin(&self, label: &str) -> ProgressHandle {
        let handle = ProgressHandle(self.next_handle.fetch_add(1, Ordering::Relaxed) + 1);
        self.send(StatusMessage {
            timestamp: Instant::now(),
            handle,
            label: label.to_string(),
            state: StatusState::Started,
        });
        handle
    }

    fn complete(&self, handle: ProgressHandle) {
        let label = self.label_for(handle);
        self.send(StatusMessage {
            timestamp: Instant::now(),
            handle,
            label,
            state: StatusState::Completed,
        });
    }

    fn fail(&self, handle: ProgressHandle, label: &str) {
        self.send(StatusMessage {
            timestamp: Instant::now(),
            handle,
            label: label.to_string(),
            state: StatusState::Failed,
        });
    }
}
