use crate::adapters::urllist_api::UrlListClient;
use crate::config::RunConfig;
use crate::core::chunking::ChunkPlanner;
use crate::core::deploy::DeployTrigger;
use crate::core::executor::{escalate, SyncExecutor, SyncOutcome};
use crate::core::normalizer::normalize;
use crate::core::reporter::{infer_after_count, RunReporter, SyncTarget};
use crate::core::resolver::ListResolver;
use crate::core::source::SourceReader;
use crate::domain::model::{ChunkPlan, NormalizedDomains, RemoteCount, RemoteList, RunSummary};
use crate::domain::ports::{HttpTransport, Storage};
use crate::utils::error::{Result, SyncError};

/// Source read, normalized and split into chunks; nothing sent yet.
#[derive(Debug, Clone)]
pub struct PreparedSync {
    pub normalized: NormalizedDomains,
    pub plan: ChunkPlan,
}

/// Runs one sync: read → normalize → plan → resolve → (create) → apply →
/// re-count → (deploy) → summary.
pub struct SyncEngine<T: HttpTransport, S: Storage> {
    config: RunConfig,
    transport: T,
    storage: S,
}

impl<T: HttpTransport, S: Storage> SyncEngine<T, S> {
    pub fn new(config: RunConfig, transport: T, storage: S) -> Self {
        Self {
            config,
            transport,
            storage,
        }
    }

    /// Dry run: everything up to the chunk plan, no list API calls.
    pub async fn plan_only(&self) -> Result<PreparedSync> {
        self.prepare().await
    }

    pub async fn run(&self) -> Result<RunSummary> {
        let config = &self.config;
        let reporter = RunReporter::start(config.mode, &config.source);

        tracing::info!(
            "Starting {} sync of '{}' from {}",
            config.mode,
            config.list_name,
            config.source
        );

        let prepared = self.prepare().await?;
        let plan = &prepared.plan;

        let client = UrlListClient::new(&self.transport, &config.tenant, &config.token)
            .with_retry_policy(config.retry)
            .with_timeout(config.request_timeout);

        let (target, outcome) = match ListResolver::new(&client).resolve(&config.list_name).await {
            Ok(list) => {
                let outcome = SyncExecutor::new(&client)
                    .apply(&list, config.mode, &plan.chunks, plan.len())
                    .await?;
                (SyncTarget { list, created: false }, outcome)
            }
            Err(SyncError::ListNotFound { .. }) if config.create_if_missing => {
                self.create_and_fill(&client, plan).await?
            }
            Err(error) => return Err(error),
        };

        tracing::info!(
            "✅ Sent {} domains in {}/{} chunk(s)",
            outcome.domains_sent,
            outcome.chunks_applied,
            plan.len()
        );

        let count_after = self
            .count_after(&client, &target.list, outcome.domains_sent)
            .await;

        let deploy = DeployTrigger::new(&client, config.deploy).run().await;

        Ok(reporter.summarize(
            &target,
            &prepared.normalized,
            plan,
            &outcome,
            count_after,
            deploy,
        ))
    }

    async fn prepare(&self) -> Result<PreparedSync> {
        let config = &self.config;

        let raw = SourceReader::new(&self.transport, &self.storage)
            .with_domain_column(config.domain_column.as_str())
            .with_timeout(config.source_timeout)
            .read(&config.source)
            .await?;

        let normalized = normalize(&raw.candidates);
        tracing::info!(
            "📊 Fetched {} entries: {} unique, {} duplicates, {} rejected",
            normalized.fetched,
            normalized.unique(),
            normalized.duplicates(),
            normalized.rejected
        );

        if normalized.domains.is_empty() {
            return Err(SyncError::Validation {
                source_name: config.source.to_string(),
            });
        }

        let plan = ChunkPlanner::for_list(&config.list_name, config.max_payload_bytes)
            .plan(&normalized.domains);
        tracing::info!(
            "📦 Payload {:.2} MB against a {} byte limit: {} chunk(s)",
            plan.total_megabytes(),
            plan.max_payload_bytes,
            plan.len()
        );

        Ok(PreparedSync { normalized, plan })
    }

    /// The list is created with chunk 1 as its content; the rest is appended.
    async fn create_and_fill(
        &self,
        client: &UrlListClient<'_, T>,
        plan: &ChunkPlan,
    ) -> Result<(SyncTarget, SyncOutcome)> {
        let config = &self.config;
        let Some((first, rest)) = plan.chunks.split_first() else {
            return Err(SyncError::Validation {
                source_name: config.source.to_string(),
            });
        };

        tracing::info!(
            "🆕 URL list '{}' not found; creating it with chunk 1/{} ({} domains)",
            config.list_name,
            plan.len(),
            first.len()
        );

        let entry = client
            .create(&config.list_name, &first.domains)
            .await
            .map_err(|error| escalate(error, first.index, plan.len(), 0))?;
        let id = entry.id.ok_or_else(|| SyncError::UnexpectedResponse {
            operation: "create URL list".to_string(),
            message: "created list has no id".to_string(),
        })?;
        tracing::info!("✅ Created URL list '{}' (id={})", entry.name, id);

        let list = RemoteList {
            id,
            name: entry.name,
            count: 0,
        };

        let tail = SyncExecutor::new(client)
            .apply(&list, config.mode, rest, plan.len())
            .await?;

        let outcome = SyncOutcome {
            chunks_applied: tail.chunks_applied + 1,
            domains_sent: tail.domains_sent + first.len(),
        };

        Ok((SyncTarget { list, created: true }, outcome))
    }

    async fn count_after(
        &self,
        client: &UrlListClient<'_, T>,
        list: &RemoteList,
        sent: usize,
    ) -> RemoteCount {
        let inferred = infer_after_count(self.config.mode, list.count, sent);
        if !self.config.verify_after_count {
            return RemoteCount::Inferred(inferred);
        }

        match client.fetch_count(list.id).await {
            Ok(count) => {
                if count != inferred {
                    tracing::info!(
                        "List holds {} entries, {} expected from the domains sent",
                        count,
                        inferred
                    );
                }
                RemoteCount::Observed(count)
            }
            Err(error) => {
                tracing::warn!(
                    "⚠️ Could not re-read the list size ({}); reporting {} inferred",
                    error,
                    inferred
                );
                RemoteCount::Inferred(inferred)
            }
        }
    }
}
