use crate::core::executor::SyncOutcome;
use crate::domain::model::{
    ChunkPlan, DeployOutcome, NormalizedDomains, RemoteCount, RemoteList, RunStatus, RunSummary,
    SourceDescriptor, SyncMode,
};
use crate::utils::error::Result;
use chrono::{DateTime, Utc};
use std::fmt::Write;

/// List size after the sync when it could not be read back.
pub fn infer_after_count(mode: SyncMode, before: usize, sent: usize) -> usize {
    match mode {
        SyncMode::Append => before + sent,
        SyncMode::Replace => sent,
    }
}

/// The list the run wrote to, and whether the run created it.
#[derive(Debug, Clone)]
pub struct SyncTarget {
    pub list: RemoteList,
    pub created: bool,
}

/// Collects the run's facts into a RunSummary. Pure aggregation, no I/O.
#[derive(Debug, Clone)]
pub struct RunReporter {
    mode: SyncMode,
    source: String,
    started_at: DateTime<Utc>,
}

impl RunReporter {
    pub fn start(mode: SyncMode, source: &SourceDescriptor) -> Self {
        Self {
            mode,
            source: source.to_string(),
            started_at: Utc::now(),
        }
    }

    pub fn summarize(
        &self,
        target: &SyncTarget,
        normalized: &NormalizedDomains,
        plan: &ChunkPlan,
        outcome: &SyncOutcome,
        count_after: RemoteCount,
        deploy: DeployOutcome,
    ) -> RunSummary {
        let status = match deploy {
            DeployOutcome::Failed(_) => RunStatus::DeployFailed,
            _ => RunStatus::Ok,
        };

        RunSummary {
            list_name: target.list.name.clone(),
            list_id: target.list.id,
            created: target.created,
            mode: self.mode,
            source: self.source.clone(),
            fetched: normalized.fetched,
            unique: normalized.unique(),
            sent: outcome.domains_sent,
            chunks_planned: plan.len(),
            chunks_applied: outcome.chunks_applied,
            count_before: target.list.count,
            count_after,
            deploy,
            status,
            started_at: self.started_at,
            finished_at: Utc::now(),
        }
    }
}

pub fn render(summary: &RunSummary) -> String {
    let after = match summary.count_after {
        RemoteCount::Observed(n) => n.to_string(),
        RemoteCount::Inferred(n) => format!("{} (inferred)", n),
    };
    let deploy = match &summary.deploy {
        DeployOutcome::Skipped => "skipped".to_string(),
        DeployOutcome::Deployed => "deployed".to_string(),
        DeployOutcome::Failed(reason) => format!("FAILED ({})", reason),
    };
    let created = if summary.created { " [created]" } else { "" };
    let seconds = (summary.finished_at - summary.started_at).num_milliseconds() as f64 / 1000.0;

    let mut out = String::new();
    let _ = writeln!(out, "==================== SYNC SUMMARY ====================");
    let _ = writeln!(out, "URL list       : {} (id={}){}", summary.list_name, summary.list_id, created);
    let _ = writeln!(out, "Mode           : {}", summary.mode);
    let _ = writeln!(out, "Source         : {}", summary.source);
    let _ = writeln!(out, "Fetched        : {}", summary.fetched);
    let _ = writeln!(out, "Unique         : {}", summary.unique);
    let _ = writeln!(out, "Sent           : {}", summary.sent);
    let _ = writeln!(out, "Chunks         : {}/{}", summary.chunks_applied, summary.chunks_planned);
    let _ = writeln!(out, "Count before   : {}", summary.count_before);
    let _ = writeln!(out, "Count after    : {}", after);
    let _ = writeln!(out, "Delta          : {:+}", summary.delta());
    let _ = writeln!(out, "Deploy         : {}", deploy);
    let _ = writeln!(out, "Status         : {}", summary.status);
    let _ = writeln!(out, "Duration       : {:.1}s", seconds);
    out.push_str("======================================================");
    out
}

pub fn to_json(summary: &RunSummary) -> Result<String> {
    Ok(serde_json::to_string_pretty(summary)?)
}

/// Dry-run output: what would be sent, without touching the list.
pub fn render_plan(source: &SourceDescriptor, normalized: &NormalizedDomains, plan: &ChunkPlan) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "===================== SYNC PLAN ======================");
    let _ = writeln!(out, "Source         : {}", source);
    let _ = writeln!(out, "Fetched        : {}", normalized.fetched);
    let _ = writeln!(out, "Rejected       : {}", normalized.rejected);
    let _ = writeln!(out, "Duplicates     : {}", normalized.duplicates());
    let _ = writeln!(out, "Unique         : {}", normalized.unique());
    let _ = writeln!(
        out,
        "Payload        : {} bytes ({:.2} MB, limit {} bytes)",
        plan.total_payload_bytes,
        plan.total_megabytes(),
        plan.max_payload_bytes
    );
    let _ = writeln!(out, "Chunks         : {}", plan.len());
    for chunk in &plan.chunks {
        let flag = if chunk.oversized { " OVERSIZED" } else { "" };
        let _ = writeln!(
            out,
            "  #{:<3} {:>8} domains {:>10} bytes{}",
            chunk.index,
            chunk.len(),
            chunk.payload_bytes,
            flag
        );
    }
    out.push_str("======================================================");
    out
}
