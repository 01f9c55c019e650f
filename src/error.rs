use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("HTTP: {0}")]
    Http(#[from] reqwest::Error),
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },
    #[error("access denied; share the sheet with \"Anyone with the link\" as Viewer")]
    AccessDenied,
    #[error("sheet with GID {0} not found")]
    SheetNotFound(String),
    #[error("no sheet configured for team member {0}")]
    UnknownMember(String),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("configuration: {0}")]
    Config(String),
    #[error("CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
}

pub type AdapterResult<T> = Result<T, AdapterError>;
