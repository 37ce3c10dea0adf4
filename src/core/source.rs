use crate::core::normalizer::clean_domain;
use crate::domain::model::{RawSource, SourceDescriptor, SourceFormat};
use crate::domain::ports::{ApiRequest, HttpMethod, HttpTransport, Storage};
use crate::utils::error::{Result, SyncError};
use std::path::Path;
use std::time::Duration;

/// Column holding the domain in the CERT.PL register export.
pub const DEFAULT_DOMAIN_COLUMN: &str = "AdresDomeny";
pub const DEFAULT_SOURCE_TIMEOUT: Duration = Duration::from_secs(30);

// tab 優先（CERT.PL 格式），其次逗號與分號
const TABULAR_DELIMITERS: [u8; 3] = [b'\t', b',', b';'];

fn decode_text(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    text.strip_prefix('\u{feff}').unwrap_or(&*text).to_string()
}

/// Decides once how a local file is parsed: tabular when a header row carries
/// `column` under one of the known delimiters and that column holds at least
/// one usable domain, line-oriented otherwise.
pub fn detect_format(text: &str, column: &str) -> SourceFormat {
    detect(text, column).0
}

/// Detection and parsing in one pass; returns the chosen format with its candidates.
pub fn detect(text: &str, column: &str) -> (SourceFormat, Vec<String>) {
    for delimiter in TABULAR_DELIMITERS {
        let Ok(candidates) = parse_tabular(text, column, delimiter) else {
            continue;
        };

        if candidates.iter().any(|candidate| clean_domain(candidate).is_some()) {
            let format = SourceFormat::Tabular {
                column: column.to_string(),
                delimiter,
            };
            return (format, candidates);
        }

        tracing::debug!(
            "Column '{}' found with delimiter {:?} but holds no usable domain",
            column,
            delimiter as char
        );
    }

    (SourceFormat::LineOriented, parse_lines(text))
}

pub fn parse_tabular(text: &str, column: &str, delimiter: u8) -> Result<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(text.as_bytes());

    let index = reader
        .headers()?
        .iter()
        .position(|header| header.trim() == column)
        .ok_or_else(|| SyncError::ConfigError {
            message: format!("column '{}' not present in header", column),
        })?;

    let mut candidates = Vec::new();
    for record in reader.records() {
        let record = record?;
        if let Some(value) = record.get(index) {
            candidates.push(value.to_string());
        }
    }

    Ok(candidates)
}

pub fn parse_lines(text: &str) -> Vec<String> {
    text.lines().map(str::to_string).collect()
}

/// Fetches raw domain candidates from a local file or a remote feed.
pub struct SourceReader<'a, T: HttpTransport + ?Sized, S: Storage> {
    transport: &'a T,
    storage: &'a S,
    domain_column: String,
    timeout: Duration,
}

impl<'a, T: HttpTransport + ?Sized, S: Storage> SourceReader<'a, T, S> {
    pub fn new(transport: &'a T, storage: &'a S) -> Self {
        Self {
            transport,
            storage,
            domain_column: DEFAULT_DOMAIN_COLUMN.to_string(),
            timeout: DEFAULT_SOURCE_TIMEOUT,
        }
    }

    pub fn with_domain_column(mut self, column: impl Into<String>) -> Self {
        self.domain_column = column.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn read(&self, descriptor: &SourceDescriptor) -> Result<RawSource> {
        match descriptor {
            SourceDescriptor::Remote(url) => self.read_remote(url).await,
            SourceDescriptor::LocalFile(path) => self.read_local(path).await,
        }
    }

    async fn read_local(&self, path: &Path) -> Result<RawSource> {
        let path_str = path.to_string_lossy().to_string();
        tracing::info!("📂 Reading domains from file: {}", path_str);

        let bytes = self
            .storage
            .read_file(&path_str)
            .await
            .map_err(|e| SyncError::SourceFetch {
                source_name: path_str.clone(),
                reason: e.to_string(),
            })?;

        let text = decode_text(&bytes);
        let (format, candidates) = detect(&text, &self.domain_column);

        match &format {
            SourceFormat::Tabular { column, delimiter } => {
                tracing::debug!(
                    "Tabular source, column '{}', delimiter {:?}",
                    column,
                    *delimiter as char
                );
            }
            SourceFormat::LineOriented => {
                tracing::warn!(
                    "⚠️ No usable '{}' column in {}; reading it as plain text (one domain per line)",
                    self.domain_column,
                    path_str
                );
            }
        }

        Ok(RawSource {
            descriptor: SourceDescriptor::LocalFile(path.to_path_buf()),
            format,
            candidates,
        })
    }

    async fn read_remote(&self, url: &str) -> Result<RawSource> {
        tracing::info!("📥 Downloading domains from: {}", url);

        let request = ApiRequest::new(HttpMethod::Get, url, self.timeout);
        let response = self
            .transport
            .send(&request)
            .await
            .map_err(|e| SyncError::SourceFetch {
                source_name: url.to_string(),
                reason: e.to_string(),
            })?;

        if !response.is_success() {
            return Err(SyncError::SourceFetch {
                source_name: url.to_string(),
                reason: format!("HTTP {}", response.status),
            });
        }

        Ok(RawSource {
            descriptor: SourceDescriptor::Remote(url.to_string()),
            format: SourceFormat::LineOriented,
            candidates: parse_lines(&response.body),
        })
    }
}
