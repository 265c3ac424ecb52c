//! Side channel for recoverable failures.
//!
//! Missing host values, rejected ranges and out-of-order phase events do not
//! abort anything; they are recorded here instead. Each distinct
//! `(kind, subject)` pair is logged once per session and counted after that,
//! so a value that is missing every frame costs one log line and one map slot.

use plugbind_runtime::BindingError;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{error, warn};

/// Class of a recorded failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    ResolutionFailure,
    CapabilityViolation,
    ArrayBounds,
    ProtocolViolation,
    /// Host handed a trampoline a value of the wrong kind.
    TrampolineMismatch,
}

#[derive(Debug)]
struct Record {
    count: u64,
    message: String,
}

type RecordMap = HashMap<DiagnosticKind, HashMap<String, Record>>;

/// Recorded failures, keyed by kind and subject name.
#[derive(Debug, Default)]
pub struct Diagnostics {
    records: Mutex<RecordMap>,
}

impl Diagnostics {
    /// Create an empty side channel.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RecordMap> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a failure. Returns `true` the first time this pair is seen.
    pub fn record(&self, kind: DiagnosticKind, subject: &str, message: impl Into<String>) -> bool {
        self.record_with(kind, subject, || message.into())
    }

    /// Like [`record`](Self::record), building the message only on first sight.
    pub fn record_with(
        &self,
        kind: DiagnosticKind,
        subject: &str,
        message: impl FnOnce() -> String,
    ) -> bool {
        let mut records = self.lock();
        let by_subject = records.entry(kind).or_default();
        if let Some(record) = by_subject.get_mut(subject) {
            record.count += 1;
            return false;
        }

        let message = message();
        match kind {
            DiagnosticKind::CapabilityViolation => error!(subject, ?kind, "{}", message),
            _ => warn!(subject, ?kind, "{}", message),
        }
        by_subject.insert(subject.to_string(), Record { count: 1, message });
        true
    }

    /// Record a binding error under its class.
    ///
    /// Errors without a runtime class (manifest, IO) are logged and dropped.
    pub fn report(&self, err: &BindingError) {
        let (kind, subject) = match err {
            BindingError::Unresolved(name) => (DiagnosticKind::ResolutionFailure, name.as_str()),
            BindingError::KindMismatch { name, .. } => {
                (DiagnosticKind::ResolutionFailure, name.as_str())
            }
            BindingError::CapabilityViolation(name) => {
                (DiagnosticKind::CapabilityViolation, name.as_str())
            }
            BindingError::ArrayBounds { name, .. } => (DiagnosticKind::ArrayBounds, name.as_str()),
            BindingError::ProtocolViolation { action, .. } => {
                (DiagnosticKind::ProtocolViolation, action.as_str())
            }
            other => {
                warn!("Unclassified binding error: {}", other);
                return;
            }
        };
        self.record_with(kind, subject, || err.to_string());
    }

    /// How many times a pair was recorded.
    pub fn count(&self, kind: DiagnosticKind, subject: &str) -> u64 {
        self.lock()
            .get(&kind)
            .and_then(|by_subject| by_subject.get(subject))
            .map(|r| r.count)
            .unwrap_or(0)
    }

    /// Total recordings of one kind across all subjects.
    pub fn total(&self, kind: DiagnosticKind) -> u64 {
        self.lock()
            .get(&kind)
            .map(|by_subject| by_subject.values().map(|r| r.count).sum())
            .unwrap_or(0)
    }

    /// Subjects with at least one recording of `kind`, sorted.
    pub fn subjects(&self, kind: DiagnosticKind) -> Vec<String> {
        let mut subjects: Vec<String> = self
            .lock()
            .get(&kind)
            .map(|by_subject| by_subject.keys().cloned().collect())
            .unwrap_or_default();
        subjects.sort();
        subjects
    }

    /// Check if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.lock().values().all(HashMap::is_empty)
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Snapshot for tooling.
    pub fn snapshot(&self) -> DiagnosticsReport {
        let mut entries: Vec<DiagnosticEntry> = self
            .lock()
            .iter()
            .flat_map(|(kind, by_subject)| {
                by_subject.iter().map(|(subject, record)| DiagnosticEntry {
                    kind: *kind,
                    subject: subject.clone(),
                    count: record.count,
                    message: record.message.clone(),
                })
            })
            .collect();
        entries.sort_by(|a, b| (a.kind, &a.subject).cmp(&(b.kind, &b.subject)));
        DiagnosticsReport { entries }
    }
}

/// Serializable view of [`Diagnostics`].
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticsReport {
    pub entries: Vec<DiagnosticEntry>,
}

/// One recorded `(kind, subject)` pair.
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticEntry {
    pub kind: DiagnosticKind,
    pub subject: String,
    pub count: u64,
    /// Message of the first occurrence.
    pub message: String,
}

impl DiagnosticsReport {
    /// Render as pretty JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
