//! Batch resolution of newline-separated input

use super::coordinator::{Resolution, ResolutionCoordinator};
use futures_util::future::join_all;

/// Maximum number of addresses resolved per batch
pub const MAX_BATCH: usize = 10;

/// Split raw input into at most [`MAX_BATCH`] trimmed, non-empty lines
///
/// Blank lines do not use up a slot; duplicates are kept.
pub fn parse_batch(raw: &str) -> Vec<&str> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .take(MAX_BATCH)
        .collect()
}

#[derive(Clone)]
pub struct BatchResolver {
    coordinator: ResolutionCoordinator,
}

impl BatchResolver {
    pub fn new(coordinator: ResolutionCoordinator) -> Self {
        Self { coordinator }
    }

    /// Resolve every line concurrently; results keep input order
    pub async fn resolve_batch(&self, raw: &str, ids: &[String]) -> Vec<Resolution> {
        let lines = parse_batch(raw);
        log::debug!("Resolving batch of {} address(es)", lines.len());
        join_all(lines.into_iter().map(|line| self.coordinator.resolve(line, ids))).await
    }

    pub fn resolve_batch_blocking(&self, raw: &str, ids: &[String]) -> Vec<Resolution> {
        parse_batch(raw)
            .into_iter()
            .map(|line| self.coordinator.resolve_blocking(line, ids))
            .collect()
    }
}
