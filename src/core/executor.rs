use crate::adapters::urllist_api::UrlListClient;
use crate::domain::model::{Chunk, RemoteList, SyncMode};
use crate::domain::ports::HttpTransport;
use crate::utils::error::{Result, SyncError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkOperation {
    /// Full overwrite (PUT).
    Overwrite,
    /// Incremental add (PATCH .../append).
    Append,
}

/// REPLACE is clear-then-append-all with the clear folded into chunk 1: the
/// first chunk overwrites, every later chunk appends. APPEND only appends.
pub fn operation_for(mode: SyncMode, chunk_index: usize) -> ChunkOperation {
    match mode {
        SyncMode::Replace if chunk_index == 1 => ChunkOperation::Overwrite,
        _ => ChunkOperation::Append,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncOutcome {
    pub chunks_applied: usize,
    pub domains_sent: usize,
}

/// Applies chunks strictly in order; the first unrecovered failure stops the
/// run and nothing already applied is rolled back.
pub struct SyncExecutor<'c, 'a, T: HttpTransport + ?Sized> {
    client: &'c UrlListClient<'a, T>,
}

impl<'c, 'a, T: HttpTransport + ?Sized> SyncExecutor<'c, 'a, T> {
    pub fn new(client: &'c UrlListClient<'a, T>) -> Self {
        Self { client }
    }

    pub async fn apply(
        &self,
        list: &RemoteList,
        mode: SyncMode,
        chunks: &[Chunk],
        total_chunks: usize,
    ) -> Result<SyncOutcome> {
        let mut outcome = SyncOutcome::default();

        for chunk in chunks {
            let operation = operation_for(mode, chunk.index);
            let label = match operation {
                ChunkOperation::Overwrite => "PUT",
                ChunkOperation::Append => "Append",
            };
            tracing::info!(
                "📤 {} chunk {}/{} ({} domains, {} bytes)...",
                label,
                chunk.index,
                total_chunks,
                chunk.len(),
                chunk.payload_bytes
            );

            let result = match operation {
                ChunkOperation::Overwrite => {
                    self.client
                        .replace(list.id, &list.name, &chunk.domains)
                        .await
                }
                ChunkOperation::Append => self.client.append(list.id, &chunk.domains).await,
            };

            if let Err(error) = result {
                let applied = chunk.index - 1;
                tracing::error!(
                    "❌ Chunk {}/{} failed; {} chunk(s) already applied stay on the list",
                    chunk.index,
                    total_chunks,
                    applied
                );
                return Err(escalate(error, chunk.index, total_chunks, applied));
            }

            outcome.chunks_applied += 1;
            outcome.domains_sent += chunk.len();
        }

        Ok(outcome)
    }
}

/// Wraps any failure of chunk `chunk` so the error always states how many
/// chunks were already applied; the underlying category is kept.
pub(crate) fn escalate(error: SyncError, chunk: usize, total: usize, applied: usize) -> SyncError {
    let cause = error.category();
    let (retries, reason) = match error {
        SyncError::Transient {
            retries, reason, ..
        } => (retries, reason),
        SyncError::ApiRejected { status, body, .. } => (
            0,
            format!("HTTP {}: {}", status, body.chars().take(200).collect::<String>()),
        ),
        already @ SyncError::SyncFailed { .. } => return already,
        other => (0, other.to_string()),
    };

    SyncError::SyncFailed {
        chunk,
        total,
        applied,
        retries,
        reason,
        cause,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::fakes::ScriptedTransport;
    use crate::core::chunking::ChunkPlanner;
    use crate::core::normalizer::normalize;
    use crate::domain::model::ChunkPlan;
    use crate::domain::ports::HttpMethod;
    use crate::utils::error::ErrorCategory;

    fn target() -> RemoteList {
        RemoteList {
            id: 7,
            name: "UL-test".to_string(),
            count: 10,
        }
    }

    fn three_chunk_plan() -> ChunkPlan {
        let domains = normalize((0..30).map(|i| format!("host-{:02}.example.pl", i))).domains;
        // 10 domains per chunk: envelope + 10 quoted 18-char names + 9 commas
        let limit = crate::domain::wire::envelope_bytes("UL-test") + 10 * 20 + 9;
        let plan = ChunkPlanner::for_list("UL-test", limit).plan(&domains);
        assert_eq!(plan.len(), 3);
        plan
    }

    #[test]
    fn test_operation_for_modes() {
        assert_eq!(operation_for(SyncMode::Replace, 1), ChunkOperation::Overwrite);
        assert_eq!(operation_for(SyncMode::Replace, 2), ChunkOperation::Append);
        assert_eq!(operation_for(SyncMode::Append, 1), ChunkOperation::Append);
    }

    #[tokio::test]
    async fn test_replace_overwrites_then_appends() {
        let plan = three_chunk_plan();
        let transport = ScriptedTransport::new().respond_times(3, 200, "{}");
        let client = UrlListClient::new(&transport, "acme.goskope.com", "tok");

        let outcome = SyncExecutor::new(&client)
            .apply(&target(), SyncMode::Replace, &plan.chunks, plan.len())
            .await
            .unwrap();

        assert_eq!(outcome.chunks_applied, 3);
        assert_eq!(outcome.domains_sent, 30);

        let requests = transport.requests();
        let methods: Vec<HttpMethod> = requests.iter().map(|r| r.method).collect();
        assert_eq!(methods, vec![HttpMethod::Put, HttpMethod::Patch, HttpMethod::Patch]);
        assert!(requests[0].url.ends_with("/urllist/7"));
        assert!(requests[1].url.ends_with("/urllist/7/append"));
        assert!(requests[0].body.as_deref().unwrap().contains("host-00.example.pl"));
        assert!(requests[2].body.as_deref().unwrap().contains("host-29.example.pl"));
    }

    #[tokio::test]
    async fn test_append_mode_only_appends() {
        let plan = three_chunk_plan();
        let transport = ScriptedTransport::new().respond_times(3, 200, "{}");
        let client = UrlListClient::new(&transport, "acme.goskope.com", "tok");

        SyncExecutor::new(&client)
            .apply(&target(), SyncMode::Append, &plan.chunks, plan.len())
            .await
            .unwrap();

        assert!(transport
            .requests()
            .iter()
            .all(|r| r.method == HttpMethod::Patch));
    }

    #[tokio::test]
    async fn test_tail_after_create_is_appended() {
        let plan = three_chunk_plan();
        let transport = ScriptedTransport::new().respond_times(2, 200, "{}");
        let client = UrlListClient::new(&transport, "acme.goskope.com", "tok");

        let outcome = SyncExecutor::new(&client)
            .apply(&target(), SyncMode::Replace, &plan.chunks[1..], plan.len())
            .await
            .unwrap();

        assert_eq!(outcome.chunks_applied, 2);
        assert!(transport
            .requests()
            .iter()
            .all(|r| r.method == HttpMethod::Patch));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_chunk_aborts_remaining() {
        let plan = three_chunk_plan();
        let transport = ScriptedTransport::new()
            .respond(200, "{}")
            .respond_times(4, 503, "unavailable")
            .respond(200, "{}");
        let client = UrlListClient::new(&transport, "acme.goskope.com", "tok");

        let error = SyncExecutor::new(&client)
            .apply(&target(), SyncMode::Replace, &plan.chunks, plan.len())
            .await
            .unwrap_err();

        match error {
            SyncError::SyncFailed {
                chunk,
                total,
                applied,
                retries,
                ..
            } => {
                assert_eq!((chunk, total, applied, retries), (2, 3, 1, 3));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        // 1 PUT + 4 attempts for chunk 2, chunk 3 never sent
        assert_eq!(transport.calls(), 5);
        assert_eq!(transport.remaining(), 1);
    }

    #[tokio::test]
    async fn test_unauthorized_first_chunk_fails_without_retry() {
        let plan = three_chunk_plan();
        let transport = ScriptedTransport::new().respond(401, "");
        let client = UrlListClient::new(&transport, "acme.goskope.com", "tok");

        let error = SyncExecutor::new(&client)
            .apply(&target(), SyncMode::Append, &plan.chunks, plan.len())
            .await
            .unwrap_err();

        assert!(matches!(
            error,
            SyncError::SyncFailed { chunk: 1, applied: 0, retries: 0, .. }
        ));
        assert_eq!(error.category(), ErrorCategory::Authentication);
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_forbidden_after_overwrite_reports_applied_chunk() {
        let plan = three_chunk_plan();
        let transport = ScriptedTransport::new()
            .respond(200, "{}")
            .respond(403, "forbidden");
        let client = UrlListClient::new(&transport, "acme.goskope.com", "tok");

        let error = SyncExecutor::new(&client)
            .apply(&target(), SyncMode::Replace, &plan.chunks, plan.len())
            .await
            .unwrap_err();

        match &error {
            SyncError::SyncFailed {
                chunk,
                total,
                applied,
                reason,
                ..
            } => {
                assert_eq!((*chunk, *total, *applied), (2, 3, 1));
                assert!(reason.contains("HTTP 403"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(error.category(), ErrorCategory::Authentication);
        assert!(error.to_string().contains("1 chunk(s) already applied"));
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test]
    async fn test_rejected_chunk_fails_without_retry() {
        let plan = three_chunk_plan();
        let transport = ScriptedTransport::new().respond(413, "too large");
        let client = UrlListClient::new(&transport, "acme.goskope.com", "tok");

        let error = SyncExecutor::new(&client)
            .apply(&target(), SyncMode::Append, &plan.chunks, plan.len())
            .await
            .unwrap_err();

        assert!(matches!(
            error,
            SyncError::SyncFailed { chunk: 1, applied: 0, retries: 0, ref reason, .. }
                if reason == "HTTP 413: too large"
        ));
        assert_eq!(transport.calls(), 1);
    }
}
