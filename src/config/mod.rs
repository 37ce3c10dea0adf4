#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

use crate::adapters::urllist_api::DEFAULT_REQUEST_TIMEOUT;
use crate::core::chunking::DEFAULT_MAX_PAYLOAD_BYTES;
use crate::core::retry::RetryPolicy;
use crate::core::source::{DEFAULT_DOMAIN_COLUMN, DEFAULT_SOURCE_TIMEOUT};
use crate::domain::model::{SourceDescriptor, SyncMode};
use crate::utils::error::{Result, SyncError};
use crate::utils::validation::{self, Validate};
use std::time::Duration;

/// One configuration source with every setting optional. Layers stack with
/// `or`: the first layer that sets a field wins.
#[derive(Debug, Clone, Default)]
pub struct ConfigLayer {
    pub source: Option<String>,
    pub list_name: Option<String>,
    pub token: Option<String>,
    pub tenant: Option<String>,
    pub mode: Option<SyncMode>,
    pub create_if_missing: Option<bool>,
    pub deploy: Option<bool>,
    pub domain_column: Option<String>,
    pub max_payload_bytes: Option<usize>,
    pub request_timeout_secs: Option<u64>,
    pub source_timeout_secs: Option<u64>,
    pub retry_attempts: Option<u32>,
    pub retry_delay_secs: Option<u64>,
    pub verify_after_count: Option<bool>,
}

impl ConfigLayer {
    pub fn or(self, fallback: ConfigLayer) -> ConfigLayer {
        ConfigLayer {
            source: self.source.or(fallback.source),
            list_name: self.list_name.or(fallback.list_name),
            token: self.token.or(fallback.token),
            tenant: self.tenant.or(fallback.tenant),
            mode: self.mode.or(fallback.mode),
            create_if_missing: self.create_if_missing.or(fallback.create_if_missing),
            deploy: self.deploy.or(fallback.deploy),
            domain_column: self.domain_column.or(fallback.domain_column),
            max_payload_bytes: self.max_payload_bytes.or(fallback.max_payload_bytes),
            request_timeout_secs: self.request_timeout_secs.or(fallback.request_timeout_secs),
            source_timeout_secs: self.source_timeout_secs.or(fallback.source_timeout_secs),
            retry_attempts: self.retry_attempts.or(fallback.retry_attempts),
            retry_delay_secs: self.retry_delay_secs.or(fallback.retry_delay_secs),
            verify_after_count: self.verify_after_count.or(fallback.verify_after_count),
        }
    }
}

/// Everything one run needs, resolved and validated up front.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub source: SourceDescriptor,
    pub list_name: String,
    pub token: String,
    pub tenant: String,
    pub mode: SyncMode,
    pub create_if_missing: bool,
    pub deploy: bool,
    pub domain_column: String,
    pub max_payload_bytes: usize,
    pub request_timeout: Duration,
    pub source_timeout: Duration,
    pub retry: RetryPolicy,
    pub verify_after_count: bool,
}

impl RunConfig {
    /// Required settings with defaults for the rest (REPLACE, no create, no deploy).
    pub fn new(source: &str, list_name: &str, token: &str, tenant: &str) -> Self {
        Self {
            source: SourceDescriptor::classify(source),
            list_name: list_name.to_string(),
            token: token.to_string(),
            tenant: tenant.to_string(),
            mode: SyncMode::Replace,
            create_if_missing: false,
            deploy: false,
            domain_column: DEFAULT_DOMAIN_COLUMN.to_string(),
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            source_timeout: DEFAULT_SOURCE_TIMEOUT,
            retry: RetryPolicy::default(),
            verify_after_count: true,
        }
    }

    pub fn from_layer(layer: ConfigLayer) -> Result<Self> {
        let source = validation::validate_required_field("source (-s/--source)", &layer.source)?;
        let list_name =
            validation::validate_required_field("URL list name (-l/--urlist)", &layer.list_name)?;
        let token = validation::validate_required_field("API token (-t/--token)", &layer.token)?;
        let tenant = validation::validate_required_field("tenant (-n/--nskp)", &layer.tenant)?;

        let defaults = RetryPolicy::default();
        let retry = RetryPolicy::new(
            layer.retry_attempts.unwrap_or(defaults.max_retries),
            layer
                .retry_delay_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.base_delay),
        );

        let mut config = Self::new(source, list_name, token, tenant);
        config.mode = layer.mode.unwrap_or(SyncMode::Replace);
        config.create_if_missing = layer.create_if_missing.unwrap_or(false);
        config.deploy = layer.deploy.unwrap_or(false);
        if let Some(column) = layer.domain_column {
            config.domain_column = column;
        }
        if let Some(bytes) = layer.max_payload_bytes {
            config.max_payload_bytes = bytes;
        }
        if let Some(secs) = layer.request_timeout_secs {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = layer.source_timeout_secs {
            config.source_timeout = Duration::from_secs(secs);
        }
        config.retry = retry;
        config.verify_after_count = layer.verify_after_count.unwrap_or(true);

        config.validate()?;
        Ok(config)
    }
}

fn reject_placeholder(field: &str, value: &str) -> Result<()> {
    if value.contains("${") {
        return Err(SyncError::InvalidConfigValueError {
            field: field.to_string(),
            value: value.to_string(),
            reason: "Environment variable placeholder was not resolved".to_string(),
        });
    }
    Ok(())
}

impl Validate for RunConfig {
    fn validate(&self) -> Result<()> {
        match &self.source {
            SourceDescriptor::Remote(url) => validation::validate_url("source", url)?,
            SourceDescriptor::LocalFile(path) => {
                validation::validate_path("source", &path.to_string_lossy())?
            }
        }

        validation::validate_non_empty_string("urlist", &self.list_name)?;
        validation::validate_non_empty_string("token", &self.token)?;
        reject_placeholder("token", &self.token)?;
        reject_placeholder("urlist", &self.list_name)?;
        validation::validate_tenant("nskp", &self.tenant)?;
        validation::validate_non_empty_string("domain_column", &self.domain_column)?;
        validation::validate_positive_number("max_payload_bytes", self.max_payload_bytes, 1024)?;
        validation::validate_range("api.timeout_seconds", self.request_timeout.as_secs(), 1, 600)?;
        validation::validate_range(
            "source.timeout_seconds",
            self.source_timeout.as_secs(),
            1,
            600,
        )?;
        validation::validate_range("api.retry_attempts", self.retry.max_retries, 0, 10)?;
        validation::validate_range("api.retry_delay_seconds", self.retry.base_delay.as_secs(), 0, 60)?;

        Ok(())
    }
}
