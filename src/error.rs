use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Invalid question")]
    InvalidQuestion,

    #[error("Invalid financial data: {0}")]
    InvalidFinancialData(String),

    #[error("Invalid date '{0}': expected RFC 3339 or YYYY-MM-DD")]
    InvalidDate(String),

    #[error("GEMINI_API_KEY is not configured")]
    MissingApiKey,

    #[error("Gemini API error (status {status}): {body}")]
    Provider { status: u16, body: String },

    #[error("Gemini returned no text")]
    EmptyResponse,

    /// The only relay failure callers ever see. Provider detail is logged, not carried.
    #[error("Failed to process financial analysis")]
    AnalysisFailed,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl AnalysisError {
    /// True for failures caused by the caller's payload rather than the relay.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AnalysisError::InvalidQuestion
                | AnalysisError::InvalidFinancialData(_)
                | AnalysisError::InvalidDate(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
