use crate::core::retry::RetryPolicy;
use crate::domain::model::DomainRecord;
use crate::domain::ports::{ApiRequest, ApiResponse, HttpMethod, HttpTransport};
use crate::domain::wire;
use crate::utils::error::{Result, SyncError};
use serde_json::Value;
use std::time::Duration;

pub const API_PATH: &str = "/api/v2/policy/urllist";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// One entry of the list collection. Entries without a usable id still count
/// towards the names reported when a lookup misses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlListEntry {
    pub id: Option<u64>,
    pub name: String,
}

/// `https://<tenant>/api/v2/policy/urllist`, or `<origin>/api/...` when the
/// tenant is already given as an http(s) origin.
pub fn base_url(tenant: &str) -> String {
    let tenant = tenant.trim().trim_end_matches('/');
    let lowered = tenant.to_ascii_lowercase();
    if lowered.starts_with("http://") || lowered.starts_with("https://") {
        format!("{}{}", tenant, API_PATH)
    } else {
        format!("https://{}{}", tenant, API_PATH)
    }
}

/// Client for the tenant's URL list endpoints. Every call goes through the
/// retry policy.
pub struct UrlListClient<'a, T: HttpTransport + ?Sized> {
    transport: &'a T,
    base_url: String,
    token: String,
    retry: RetryPolicy,
    timeout: Duration,
}

impl<'a, T: HttpTransport + ?Sized> UrlListClient<'a, T> {
    pub fn new(transport: &'a T, tenant: &str, token: &str) -> Self {
        Self {
            transport,
            base_url: base_url(tenant),
            token: token.to_string(),
            retry: RetryPolicy::default(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: HttpMethod, url: String) -> ApiRequest {
        ApiRequest::new(method, url, self.timeout).bearer(self.token.as_str())
    }

    async fn call(&self, operation: &str, request: ApiRequest) -> Result<ApiResponse> {
        self.retry
            .execute(self.transport, &request)
            .await
            .map_err(|e| e.into_sync_error(operation))
    }

    pub async fn list_all(&self) -> Result<Vec<UrlListEntry>> {
        let request = self.request(HttpMethod::Get, self.base_url.clone());
        let response = self.call("list URL lists", request).await?;
        parse_list_collection(&response.body)
    }

    pub async fn fetch_count(&self, id: u64) -> Result<usize> {
        let request = self.request(HttpMethod::Get, format!("{}/{}", self.base_url, id));
        let response = self.call("read URL list", request).await?;
        parse_url_count(&response.body)
    }

    /// Overwrites the list content with `domains` (PUT).
    pub async fn replace(&self, id: u64, name: &str, domains: &[DomainRecord]) -> Result<()> {
        let body = wire::named_list_body(name, domains)?;
        let request = self
            .request(HttpMethod::Put, format!("{}/{}", self.base_url, id))
            .json_body(body);
        self.call("replace URL list", request).await?;
        Ok(())
    }

    /// Adds `domains` to the list content (PATCH).
    pub async fn append(&self, id: u64, domains: &[DomainRecord]) -> Result<()> {
        let body = wire::append_body(domains)?;
        let request = self
            .request(HttpMethod::Patch, format!("{}/{}/append", self.base_url, id))
            .json_body(body);
        self.call("append to URL list", request).await?;
        Ok(())
    }

    pub async fn create(&self, name: &str, domains: &[DomainRecord]) -> Result<UrlListEntry> {
        let body = wire::named_list_body(name, domains)?;
        let request = self
            .request(HttpMethod::Post, self.base_url.clone())
            .json_body(body);
        let response = self.call("create URL list", request).await?;
        parse_created_list(&response.body, name)
    }

    pub async fn deploy(&self) -> Result<()> {
        let request = self.request(HttpMethod::Post, format!("{}/deploy", self.base_url));
        self.call("deploy URL list changes", request).await?;
        Ok(())
    }
}

fn parse_id(value: &Value) -> Option<u64> {
    value
        .as_u64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
}

/// The collection comes back as a bare array or wrapped in `data`/`urllists`.
pub fn parse_list_collection(body: &str) -> Result<Vec<UrlListEntry>> {
    let value: Value = serde_json::from_str(body)?;

    let items: &[Value] = match &value {
        Value::Array(items) => items.as_slice(),
        Value::Object(obj) => obj
            .get("data")
            .or_else(|| obj.get("urllists"))
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[]),
        _ => {
            return Err(SyncError::UnexpectedResponse {
                operation: "list URL lists".to_string(),
                message: "expected a JSON array or object".to_string(),
            })
        }
    };

    Ok(items
        .iter()
        .filter_map(|item| {
            let name = item.get("name")?.as_str()?.to_string();
            let id = item.get("id").and_then(parse_id);
            Some(UrlListEntry { id, name })
        })
        .collect())
}

pub fn parse_url_count(body: &str) -> Result<usize> {
    let value: Value = serde_json::from_str(body)?;
    let urls = value
        .get("data")
        .and_then(|data| data.get("urls"))
        .or_else(|| value.get("urls"));
    Ok(urls.and_then(Value::as_array).map(Vec::len).unwrap_or(0))
}

/// The create call answers with the list itself, the list under `data`, or an
/// array whose last element is the new list.
pub fn parse_created_list(body: &str, requested_name: &str) -> Result<UrlListEntry> {
    let value: Value = serde_json::from_str(body)?;

    let created = match &value {
        Value::Object(obj) if obj.contains_key("id") => Some(&value),
        Value::Object(obj) => match obj.get("data") {
            Some(data) if data.is_object() => Some(data),
            _ => Some(&value),
        },
        Value::Array(items) => items.last(),
        _ => None,
    };

    let id = created
        .and_then(|list| list.get("id"))
        .and_then(parse_id)
        .ok_or_else(|| SyncError::UnexpectedResponse {
            operation: "create URL list".to_string(),
            message: format!("no list id in response: {}", truncate(body, 200)),
        })?;

    let name = created
        .and_then(|list| list.get("name"))
        .and_then(Value::as_str)
        .unwrap_or(requested_name)
        .to_string();

    Ok(UrlListEntry { id: Some(id), name })
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
