#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("not found")]
    NotFound,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("supabase error ({status}): {message}")]
    Supabase { status: u16, message: String },

    #[error("{service} error ({status}): {message}")]
    Upstream {
        service: &'static str,
        status: u16,
        message: String,
    },

    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("reqwest error: {0:?}")]
    Reqwest(#[from] reqwest::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0:?}")]
    IO(#[from] std::io::Error),

    #[error("unexpected error: {0:?}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// True for failures caused by a remote service rather than by the request.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            AppError::Supabase { .. } | AppError::Upstream { .. } | AppError::Reqwest(_)
        )
    }
}
