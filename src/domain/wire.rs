//! JSON bodies sent to the URL list endpoints.
//!
//! The chunk planner measures payloads with these exact types, so a chunk's
//! `payload_bytes` equals the body the API receives.

use crate::domain::model::DomainRecord;
use serde::Serialize;

/// Match type the gateway applies to every entry.
pub const URL_MATCH_TYPE: &str = "exact";

#[derive(Debug, Serialize)]
pub struct UrlListData<'a> {
    pub urls: &'a [DomainRecord],
    #[serde(rename = "type")]
    pub match_type: &'a str,
}

impl<'a> UrlListData<'a> {
    pub fn exact(urls: &'a [DomainRecord]) -> Self {
        Self {
            urls,
            match_type: URL_MATCH_TYPE,
        }
    }
}

/// Body of the replace (PUT) and create (POST) calls.
#[derive(Debug, Serialize)]
pub struct NamedListBody<'a> {
    pub name: &'a str,
    pub data: UrlListData<'a>,
}

/// Body of the append (PATCH) call.
#[derive(Debug, Serialize)]
pub struct AppendBody<'a> {
    pub data: UrlListData<'a>,
}

pub fn named_list_body(name: &str, urls: &[DomainRecord]) -> serde_json::Result<String> {
    serde_json::to_string(&NamedListBody {
        name,
        data: UrlListData::exact(urls),
    })
}

pub fn append_body(urls: &[DomainRecord]) -> serde_json::Result<String> {
    serde_json::to_string(&AppendBody {
        data: UrlListData::exact(urls),
    })
}

/// Bytes of the largest envelope (replace/create) with an empty `urls` array.
pub fn envelope_bytes(list_name: &str) -> usize {
    let named = named_list_body(list_name, &[]).map(|s| s.len()).unwrap_or(0);
    let append = append_body(&[]).map(|s| s.len()).unwrap_or(0);
    named.max(append)
}

/// Bytes one domain adds inside the `urls` array, excluding the separating comma.
pub fn entry_bytes(domain: &DomainRecord) -> usize {
    serde_json::to_string(domain)
        .map(|s| s.len())
        .unwrap_or(domain.as_str().len() + 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(value: &str) -> DomainRecord {
        DomainRecord::new_unchecked(value.to_string())
    }

    #[test]
    fn test_named_list_body_shape() {
        let urls = vec![record("a.com"), record("b.com")];
        let body = named_list_body("UL-test", &urls).unwrap();
        assert_eq!(
            body,
            r#"{"name":"UL-test","data":{"urls":["a.com","b.com"],"type":"exact"}}"#
        );
    }

    #[test]
    fn test_append_body_shape() {
        let urls = vec![record("a.com")];
        let body = append_body(&urls).unwrap();
        assert_eq!(body, r#"{"data":{"urls":["a.com"],"type":"exact"}}"#);
    }

    #[test]
    fn test_envelope_plus_entries_matches_serialized_length() {
        let urls = vec![record("a.com"), record("xn--bcher-kva.example"), record("c.pl")];
        let expected = named_list_body("UL-test", &urls).unwrap().len();
        let measured = envelope_bytes("UL-test")
            + urls.iter().map(entry_bytes).sum::<usize>()
            + (urls.len() - 1);
        assert_eq!(measured, expected);
    }

    #[test]
    fn test_entry_bytes_counts_escapes() {
        assert_eq!(entry_bytes(&record("a.com")), 7);
        assert_eq!(entry_bytes(&record("a\"b.com")), 10);
    }
}
