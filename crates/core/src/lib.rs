pub mod annotation;
pub mod config;
pub mod duration;
pub mod error;
pub mod model;
pub mod query;
pub mod transform;
pub mod url;

pub use error::{Result, ZipviewError};
