use axum::{http::StatusCode, response::IntoResponse};

pub type AppResult<T> = Result<T, AppErr>;

/* ── HTTP side: search gateway & token cache ── */
#[derive(thiserror::Error, Debug)]
pub enum AppErr {
    #[error("DB: {0}")]
    Db(#[from] sqlx::Error),

    #[error("HTTP: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upstream returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("unavailable: {0}")]
    Unavailable(String),
}

impl IntoResponse for AppErr {
    fn into_response(self) -> axum::response::Response {
        let code = match &self {
            AppErr::Http(_) | AppErr::Upstream { .. } => StatusCode::BAD_GATEWAY,
            AppErr::Unavailable(_)                    => StatusCode::SERVICE_UNAVAILABLE,
            AppErr::Db(_)                             => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (code, self.to_string()).into_response()
    }
}

/* ── socket side: every variant is recoverable ──
 * Display is exactly the text sent back as {"error": ...}. */
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Permission(String),

    #[error("{0}")]
    Protocol(String),
}

impl SyncError {
    pub fn kind(&self) -> &'static str {
        match self {
            SyncError::Validation(_) => "validation",
            SyncError::NotFound(_)   => "not_found",
            SyncError::Conflict(_)   => "conflict",
            SyncError::Permission(_) => "permission",
            SyncError::Protocol(_)   => "protocol",
        }
    }
}
