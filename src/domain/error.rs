//! Domain error types.

/// Top-level error type for fin-analyst.
#[derive(Debug, thiserror::Error)]
pub enum AnalystError {
    #[error("dataset '{dataset}' not found")]
    NotFound { dataset: String },

    #[error("not enough data points for trend analysis of '{column}': have {points}, need {minimum}")]
    InsufficientData {
        column: String,
        points: usize,
        minimum: usize,
    },

    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("unknown tool: {name}")]
    UnknownTool { name: String },

    #[error("CSV error: {reason}")]
    Csv { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("unsupported: {reason}")]
    Unsupported { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AnalystError {
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        AnalystError::InvalidInput {
            reason: reason.into(),
        }
    }

    /// Process exit status for the CLI.
    pub fn exit_status(&self) -> u8 {
        match self {
            AnalystError::Io(_) => 1,
            AnalystError::ConfigParse { .. } | AnalystError::ConfigInvalid { .. } => 2,
            AnalystError::Csv { .. } => 3,
            AnalystError::InvalidInput { .. } | AnalystError::UnknownTool { .. } => 4,
            AnalystError::NotFound { .. } | AnalystError::InsufficientData { .. } => 5,
            AnalystError::Unsupported { .. } => 6,
        }
    }
}

impl From<&AnalystError> for std::process::ExitCode {
    fn from(err: &AnalystError) -> Self {
        std::process::ExitCode::from(err.exit_status())
    }
}
