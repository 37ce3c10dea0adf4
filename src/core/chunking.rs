use crate::domain::model::{Chunk, ChunkPlan, DomainRecord, DomainSet};
use crate::domain::wire;

/// Request body limit accepted by the URL list endpoints.
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 7 * 1024 * 1024;

/// Greedy packer that splits a DomainSet into request-sized chunks.
///
/// Sizes are exact: envelope bytes, plus each serialized domain, plus one comma
/// between neighbours. A domain that alone exceeds the limit becomes its own
/// chunk flagged `oversized`.
#[derive(Debug, Clone)]
pub struct ChunkPlanner {
    max_payload_bytes: usize,
    envelope_bytes: usize,
}

impl ChunkPlanner {
    pub fn new(max_payload_bytes: usize) -> Self {
        Self::for_list("", max_payload_bytes)
    }

    /// The list name is part of the replace/create envelope, so it counts.
    pub fn for_list(list_name: &str, max_payload_bytes: usize) -> Self {
        Self {
            max_payload_bytes,
            envelope_bytes: wire::envelope_bytes(list_name),
        }
    }

    pub fn max_payload_bytes(&self) -> usize {
        self.max_payload_bytes
    }

    pub fn plan(&self, domains: &DomainSet) -> ChunkPlan {
        let mut chunks = Vec::new();
        let mut current: Vec<DomainRecord> = Vec::new();
        let mut current_bytes = self.envelope_bytes;
        let mut total_bytes = self.envelope_bytes;

        for (position, domain) in domains.iter().enumerate() {
            let entry = wire::entry_bytes(domain);
            total_bytes += entry + usize::from(position > 0);

            if !current.is_empty() && current_bytes + 1 + entry > self.max_payload_bytes {
                let full = std::mem::take(&mut current);
                chunks.push(self.close(chunks.len() + 1, full, current_bytes));
                current_bytes = self.envelope_bytes;
            }

            current_bytes += entry + usize::from(!current.is_empty());
            current.push(domain.clone());
        }

        if !current.is_empty() {
            chunks.push(self.close(chunks.len() + 1, current, current_bytes));
        }

        ChunkPlan {
            chunks,
            max_payload_bytes: self.max_payload_bytes,
            total_payload_bytes: total_bytes,
        }
    }

    fn close(&self, index: usize, domains: Vec<DomainRecord>, payload_bytes: usize) -> Chunk {
        let oversized = payload_bytes > self.max_payload_bytes;
        if oversized {
            tracing::warn!(
                "⚠️ Chunk {} holds a single entry of {} bytes, above the {} byte limit; sending it as is",
                index,
                payload_bytes,
                self.max_payload_bytes
            );
        }
        Chunk {
            index,
            domains,
            payload_bytes,
            oversized,
        }
    }
}

impl Default for ChunkPlanner {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PAYLOAD_BYTES)
    }
}
