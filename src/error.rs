use thiserror::Error;

/// Exit code for usage errors and empty selections.
pub const EXIT_USAGE: u8 = 2;

/// Failures reported to the user without writing any output.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),

    #[error("no matching files for scope={scope}")]
    EmptySelection { scope: String },
}

impl CliError {
    pub fn exit_code(&self) -> u8 {
        match self {
            CliError::Usage(_) | CliError::EmptySelection { .. } => EXIT_USAGE,
        }
    }
}
