//! Resolution coordinator - asks every requested backend about one address
//!
//! The coordinator never fails: each requested backend gets exactly one
//! [`LookupOutcome`], whatever happens to the others.

use super::classify::classify;
use super::normalize::FieldNormalizer;
use crate::database::{AddressFamily, BackendRegistry, LookupError, LookupOutcome};
use futures_util::future::join_all;
use std::net::IpAddr;
use std::sync::Arc;

/// Outcome of one backend for one address
#[derive(Debug, Clone, PartialEq)]
pub struct BackendOutcome {
    pub backend: String,
    pub outcome: LookupOutcome,
}

/// Outcomes of all requested backends for one input line
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// Input exactly as given
    pub ip: String,
    /// One entry per requested backend, in request order
    pub outcomes: Vec<BackendOutcome>,
}

impl Resolution {
    pub fn outcome(&self, backend: &str) -> Option<&LookupOutcome> {
        self.outcomes
            .iter()
            .find(|o| o.backend == backend)
            .map(|o| &o.outcome)
    }
}

#[derive(Clone)]
pub struct ResolutionCoordinator {
    registry: Arc<BackendRegistry>,
    normalizer: Arc<FieldNormalizer>,
}

impl ResolutionCoordinator {
    pub fn new(registry: Arc<BackendRegistry>, normalizer: FieldNormalizer) -> Self {
        Self {
            registry,
            normalizer: Arc::new(normalizer),
        }
    }

    /// Requested ids de-duplicated in order; all registered ids when none are given
    fn requested_ids(&self, ids: &[String]) -> Vec<String> {
        if ids.is_empty() {
            return self.registry.ids();
        }
        let mut requested: Vec<String> = Vec::with_capacity(ids.len());
        for id in ids {
            if !requested.contains(id) {
                requested.push(id.clone());
            }
        }
        requested
    }

    fn invalid(input: &str, ids: Vec<String>) -> Resolution {
        log::debug!("Invalid address: {:?}", input);
        Resolution {
            ip: input.to_string(),
            outcomes: ids
                .into_iter()
                .map(|backend| BackendOutcome {
                    backend,
                    outcome: LookupOutcome::Error(LookupError::InvalidAddress),
                })
                .collect(),
        }
    }

    /// Look up a classified address in one backend
    pub fn lookup_one(&self, ip: IpAddr, id: &str) -> LookupOutcome {
        let Some(descriptor) = self.registry.get(id) else {
            return LookupOutcome::Error(LookupError::UnknownBackend(id.to_string()));
        };
        let Some(handle) = &descriptor.handle else {
            return LookupOutcome::Unavailable;
        };
        if !descriptor.family.supports(AddressFamily::of(&ip)) {
            return LookupOutcome::Error(LookupError::FamilyUnsupported);
        }

        match handle.lookup(ip) {
            Ok(Some(raw)) => LookupOutcome::Found(self.normalizer.normalize(raw)),
            Ok(None) => LookupOutcome::NotFound,
            Err(e) => {
                log::debug!("Lookup of {} in {} failed: {}", ip, id, e);
                LookupOutcome::Error(LookupError::LookupFailed(e.to_string()))
            }
        }
    }

    /// Resolve one input line against the requested backends on the current thread
    pub fn resolve_blocking(&self, input: &str, ids: &[String]) -> Resolution {
        let ids = self.requested_ids(ids);
        let Some(ip) = classify(input).ip() else {
            return Self::invalid(input, ids);
        };

        let outcomes = ids
            .into_iter()
            .map(|backend| {
                let outcome = self.lookup_one(ip, &backend);
                BackendOutcome { backend, outcome }
            })
            .collect();

        Resolution {
            ip: input.to_string(),
            outcomes,
        }
    }

    /// Resolve one input line, querying the requested backends concurrently
    pub async fn resolve(&self, input: &str, ids: &[String]) -> Resolution {
        let ids = self.requested_ids(ids);
        let Some(ip) = classify(input).ip() else {
            return Self::invalid(input, ids);
        };

        let lookups = ids.into_iter().map(|backend| {
            let coordinator = self.clone();
            async move {
                let id = backend.clone();
                let outcome = tokio::task::spawn_blocking(move || coordinator.lookup_one(ip, &id))
                    .await
                    .unwrap_or_else(|e| {
                        log::error!("Lookup task for {} in {} failed: {}", ip, backend, e);
                        LookupOutcome::Error(LookupError::LookupFailed(format!(
                            "lookup task failed: {}",
                            e
                        )))
                    });
                BackendOutcome { backend, outcome }
            }
        });

        Resolution {
            ip: input.to_string(),
            outcomes: join_all(lookups).await,
        }
    }
}
