use crate::domain::model::{DomainRecord, DomainSet, NormalizedDomains};

const SCHEME_PREFIXES: [&str; 2] = ["https://", "http://"];

fn strip_one_scheme(candidate: &str) -> Option<&str> {
    SCHEME_PREFIXES.iter().find_map(|prefix| {
        candidate
            .get(..prefix.len())
            .filter(|head| head.eq_ignore_ascii_case(prefix))
            .map(|_| &candidate[prefix.len()..])
    })
}

/// Strips stacked prefixes too (`http://https://a.com`, `https://  http://b.com`).
fn strip_scheme(candidate: &str) -> &str {
    let mut rest = candidate.trim();
    while let Some(stripped) = strip_one_scheme(rest) {
        rest = stripped.trim();
    }
    rest
}

fn has_domain_shape(candidate: &str) -> bool {
    !candidate.is_empty()
        && candidate.contains('.')
        && !candidate
            .chars()
            .any(|c| c.is_whitespace() || c.is_control())
}

/// Cleans one raw candidate; `None` when nothing usable is left.
pub fn clean_domain(raw: &str) -> Option<DomainRecord> {
    let cleaned = strip_scheme(raw.trim()).trim().trim_end_matches('/').trim();

    if has_domain_shape(cleaned) {
        Some(DomainRecord::new_unchecked(cleaned.to_string()))
    } else {
        None
    }
}

/// Builds the run's DomainSet from raw candidates, keeping first-seen order.
pub fn normalize<I, S>(candidates: I) -> NormalizedDomains
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut domains = DomainSet::new();
    let mut fetched = 0;
    let mut rejected = 0;

    for candidate in candidates {
        fetched += 1;
        match clean_domain(candidate.as_ref()) {
            Some(record) => {
                domains.insert(record);
            }
            None => {
                rejected += 1;
                let raw = candidate.as_ref().trim();
                if !raw.is_empty() {
                    tracing::debug!("Skipping invalid domain entry: {:?}", raw);
                }
            }
        }
    }

    NormalizedDomains {
        domains,
        fetched,
        rejected,
    }
}
