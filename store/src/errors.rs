use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(
        "Invalid timestamp {value:?}: not RFC 3339 ({rfc3339}), not an offset-less ISO-8601 datetime ({naive})"
    )]
    Timestamp {
        value: String,
        rfc3339: chrono::ParseError,
        naive: chrono::ParseError,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
