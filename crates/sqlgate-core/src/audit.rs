//! Audit trail of authorization decisions.
//!
//! [`Recording`] wraps another authorizer and copies every request together
//! with its decision into a shared [`AuditTrail`], a JSONL file, or both.
//! The in-memory trail grows until drained; long-lived connections should
//! record to a file only ([`Recording::without_trail`]).

use crate::authorizer::Authorizer;
use crate::decision::Decision;
use crate::request::{AuthRequest, OwnedAuthRequest};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub request: OwnedAuthRequest,
    pub decision: Decision,
}

/// Shared, cloneable list of audit entries.
#[derive(Debug, Clone, Default)]
pub struct AuditTrail {
    entries: Arc<Mutex<Vec<AuditEntry>>>,
}

impl AuditTrail {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<AuditEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, entry: AuditEntry) {
        self.lock().push(entry);
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.lock().clone()
    }

    /// Remove and return everything recorded so far.
    pub fn drain(&self) -> Vec<AuditEntry> {
        std::mem::take(&mut *self.lock())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// Append-only JSONL file.
#[derive(Debug)]
pub struct JsonlSink {
    file: File,
}

impl JsonlSink {
    pub fn open(path: &Path) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { file })
    }

    pub fn write(&mut self, entry: &AuditEntry) {
        match serde_json::to_string(entry) {
            Ok(json) => {
                if let Err(e) = writeln!(self.file, "{}", json) {
                    tracing::warn!(event = "audit_write_failed", error = %e);
                }
            }
            Err(e) => tracing::warn!(event = "audit_encode_failed", error = %e),
        }
    }
}

/// Records every decision of the wrapped authorizer.
pub struct Recording<A> {
    inner: A,
    trail: Option<AuditTrail>,
    sink: Option<JsonlSink>,
}

impl<A: Authorizer> Recording<A> {
    pub fn new(inner: A, trail: AuditTrail) -> Self {
        Self {
            inner,
            trail: Some(trail),
            sink: None,
        }
    }

    /// Recording that keeps nothing in memory; pair it with [`Self::with_sink`].
    pub fn without_trail(inner: A) -> Self {
        Self {
            inner,
            trail: None,
            sink: None,
        }
    }

    pub fn with_sink(mut self, sink: JsonlSink) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn trail(&self) -> Option<&AuditTrail> {
        self.trail.as_ref()
    }
}

impl<A: Authorizer> Authorizer for Recording<A> {
    fn authorize(&mut self, request: &AuthRequest<'_>) -> Decision {
        let decision = self.inner.authorize(request);
        let entry = AuditEntry {
            timestamp: Utc::now(),
            request: request.owned(),
            decision,
        };
        if let Some(sink) = &mut self.sink {
            sink.write(&entry);
        }
        if let Some(trail) = &self.trail {
            trail.push(entry);
        }
        decision
    }
}
