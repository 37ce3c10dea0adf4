pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::CliConfig;

pub use adapters::{http::ReqwestTransport, storage::LocalStorage};
pub use config::{toml_config::TomlConfig, ConfigLayer, RunConfig};
pub use core::engine::SyncEngine;
pub use domain::model::{RunStatus, RunSummary, SyncMode};
pub use utils::error::{Result, SyncError};
