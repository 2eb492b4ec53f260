//! Non-fatal diagnostics
//!
//! Guard rejections and unknown opcodes are returned to the caller as
//! errors and also reported to a sink, so hosts that only see a status
//! code can still surface a message.

use std::sync::{Arc, Mutex};

use tracing::warn;

/// A rejected dispatch, as reported to a [`DiagnosticSink`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub opcode: u8,
    /// [`GatewayError::code`](crate::GatewayError::code) of the rejection
    pub code: u16,
    pub message: String,
}

pub trait DiagnosticSink {
    fn report(&self, diagnostic: Diagnostic);
}

/// Forwards diagnostics to `tracing` at warn level
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, diagnostic: Diagnostic) {
        warn!(
            opcode = diagnostic.opcode,
            code = diagnostic.code,
            "{}",
            diagnostic.message
        );
    }
}

/// Keeps diagnostics in memory; clones share the same buffer
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    entries: Arc<Mutex<Vec<Diagnostic>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<Diagnostic> {
        self.entries
            .lock()
            .map(|e| e.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    /// Remove and return everything recorded so far
    pub fn drain(&self) -> Vec<Diagnostic> {
        match self.entries.lock() {
            Ok(mut e) => std::mem::take(&mut *e),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

impl DiagnosticSink for MemorySink {
    fn report(&self, diagnostic: Diagnostic) {
        match self.entries.lock() {
            Ok(mut e) => e.push(diagnostic),
            Err(poisoned) => poisoned.into_inner().push(diagnostic),
        }
    }
}
