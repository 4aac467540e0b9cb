use thiserror::Error;

/// Top-level error type for the `wgctl-exec` crate.
///
/// Covers every way a command can fail before or after it reaches the
/// target host. `wgctl-core` folds these into its opaque execution error.
#[derive(Debug, Error)]
pub enum Error {
    // ── Process ─────────────────────────────────────────────────────
    /// The executable could not be started at all.
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Pipe or wait failure while the child was running.
    #[error("I/O error while running command: {0}")]
    Io(#[from] std::io::Error),

    /// The command ran and exited unsuccessfully.
    ///
    /// `output` carries stdout and stderr combined, trimmed.
    #[error("`{command}` exited with {}: {output}", format_code(*.code))]
    Exit {
        command: String,
        code: Option<i32>,
        output: String,
    },

    // ── Transport ───────────────────────────────────────────────────
    /// The SSH destination is unusable (empty, or would be parsed as an option).
    #[error("invalid SSH target: {0}")]
    InvalidTarget(String),
}

impl Error {
    /// Returns `true` if the remote command ran and exited non-zero.
    pub fn is_exit(&self) -> bool {
        matches!(self, Self::Exit { .. })
    }

    /// The command line this error relates to, if known.
    pub fn command(&self) -> Option<&str> {
        match self {
            Self::Exit { command, .. } => Some(command),
            Self::Spawn { program, .. } => Some(program),
            Self::Io(_) | Self::InvalidTarget(_) => None,
        }
    }

    /// Diagnostic output carried by the error.
    pub fn output(&self) -> String {
        match self {
            Self::Exit { output, .. } => output.clone(),
            other => other.to_string(),
        }
    }
}

fn format_code(code: Option<i32>) -> String {
    code.map_or_else(|| "signal".into(), |c| format!("status {c}"))
}
