pub mod adapter;
pub mod http;

pub use adapter::{AdapterError, ApiEnvelope, TraceIds, ZipkinAdapter};
pub use http::{FetchClient, HttpError, StatusError};
