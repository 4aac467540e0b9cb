// ── Core error types ──
//
// User-facing errors from wgctl-core. Transport details never leak:
// the `From<wgctl_exec::Error>` impl folds every command failure into
// the opaque `Execution` variant carrying the diagnostic output.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Data errors ──────────────────────────────────────────────────
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: String,
        identifier: String,
    },

    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no free address left for device {device} in {network}")]
    AddressExhausted { device: String, network: String },

    // ── Operation errors ─────────────────────────────────────────────
    #[error("command `{command}` failed: {output}")]
    Execution { command: String, output: String },

    #[error("storage error at {path}: {reason}")]
    Persistence { path: String, reason: String },

    // ── Run control ──────────────────────────────────────────────────
    #[error("run timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("run cancelled")]
    Cancelled,
}

impl CoreError {
    pub(crate) fn not_found(entity_type: &str, identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            identifier: identifier.into(),
        }
    }

    pub(crate) fn validation(field: &str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<wgctl_exec::Error> for CoreError {
    fn from(err: wgctl_exec::Error) -> Self {
        Self::Execution {
            command: err.command().unwrap_or("<transport>").to_owned(),
            output: err.output(),
        }
    }
}
