use crate::config::ConfigLayer;
use crate::domain::model::SyncMode;
use crate::utils::error::{Result, SyncError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Run settings from a TOML file. Every section is optional so a file can
/// carry only the parts that rarely change (tenant, token, tunables).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlConfig {
    #[serde(default)]
    pub source: SourceSection,
    #[serde(default)]
    pub target: TargetSection,
    #[serde(default)]
    pub sync: SyncSection,
    #[serde(default)]
    pub api: ApiSection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceSection {
    /// Local path or http(s) URL.
    pub location: Option<String>,
    pub domain_column: Option<String>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetSection {
    pub tenant: Option<String>,
    pub token: Option<String>,
    pub list: Option<String>,
    pub create_if_missing: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SyncSection {
    pub mode: Option<SyncMode>,
    pub deploy: Option<bool>,
    pub max_payload_bytes: Option<usize>,
    pub verify_after_count: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiSection {
    pub timeout_seconds: Option<u64>,
    pub retry_attempts: Option<u32>,
    pub retry_delay_seconds: Option<u64>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| SyncError::ConfigError {
            message: format!("cannot read config file {}: {}", path.display(), e),
        })?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| SyncError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${NSKP_TOKEN})，未設定的變數保留原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| SyncError::ConfigError {
            message: format!("invalid placeholder pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn to_layer(&self) -> ConfigLayer {
        ConfigLayer {
            source: self.source.location.clone(),
            list_name: self.target.list.clone(),
            token: self.target.token.clone(),
            tenant: self.target.tenant.clone(),
            mode: self.sync.mode,
            create_if_missing: self.target.create_if_missing,
            deploy: self.sync.deploy,
            domain_column: self.source.domain_column.clone(),
            max_payload_bytes: self.sync.max_payload_bytes,
            request_timeout_secs: self.api.timeout_seconds,
            source_timeout_secs: self.source.timeout_seconds,
            retry_attempts: self.api.retry_attempts,
            retry_delay_secs: self.api.retry_delay_seconds,
            verify_after_count: self.sync.verify_after_count,
        }
    }
}
