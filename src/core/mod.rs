pub mod chunking;
pub mod deploy;
pub mod engine;
pub mod executor;
pub mod normalizer;
pub mod reporter;
pub mod resolver;
pub mod retry;
pub mod source;

pub use crate::domain::ports::{HttpTransport, Storage};
pub use crate::utils::error::Result;
