use thiserror::Error;

#[derive(Debug, Error)]
pub enum ZipviewError {
    #[error("cannot build a trace from an empty span list")]
    EmptyTrace,

    #[error("span {span_id} belongs to trace {found}, expected {expected}")]
    MixedTrace {
        expected: String,
        found: String,
        span_id: String,
    },

    #[error("invalid span {span_id}: {reason}")]
    InvalidSpan { span_id: String, reason: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, ZipviewError>;
