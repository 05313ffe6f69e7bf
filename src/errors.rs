use thiserror::Error;

#[derive(Debug, Error)]
pub enum AutoQuizError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Screen capture unavailable: {0}")]
    CaptureUnavailable(String),

    #[error("Text extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("No answer available: {0}")]
    NoAnswerAvailable(String),

    #[error("No target found: {0}")]
    NoTargetFound(String),

    #[error("Interaction failed: {0}")]
    InteractionFailed(String),

    #[error("Authorization denied: {0}")]
    AuthorizationDenied(String),

    #[error("License error: {0}")]
    License(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("TOML deserialize error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("Run cancelled")]
    Cancelled,
}

impl AutoQuizError {
    /// Whether a batch moves on to the next question after this error.
    /// Authorization denial and cancellation end the batch instead.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            AutoQuizError::AuthorizationDenied(_) | AutoQuizError::Cancelled
        )
    }

    /// Short stable name used in attempt history records.
    pub fn kind(&self) -> &'static str {
        match self {
            AutoQuizError::Config(_) => "config",
            AutoQuizError::CaptureUnavailable(_) => "capture_unavailable",
            AutoQuizError::ExtractionFailed(_) => "extraction_failed",
            AutoQuizError::NoAnswerAvailable(_) => "no_answer_available",
            AutoQuizError::NoTargetFound(_) => "no_target_found",
            AutoQuizError::InteractionFailed(_) => "interaction_failed",
            AutoQuizError::AuthorizationDenied(_) => "authorization_denied",
            AutoQuizError::License(_) => "license",
            AutoQuizError::Io(_) => "io",
            AutoQuizError::Json(_) => "json",
            AutoQuizError::Http(_) => "http",
            AutoQuizError::Image(_) => "image",
            AutoQuizError::TomlDe(_) => "toml_de",
            AutoQuizError::TomlSer(_) => "toml_ser",
            AutoQuizError::Cancelled => "cancelled",
        }
    }
}

pub type AutoQuizResult<T> = Result<T, AutoQuizError>;
