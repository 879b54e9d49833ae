//! ipgeo: offline multi-database IP geolocation lookup
//!
//! Resolves IPv4 and IPv6 addresses against several local geolocation
//! databases at once (MaxMind DB, IP2Location BIN and ip2region xdb) and
//! reports every backend's answer side by side in one normalized schema.
//!
//! ```no_run
//! use ipgeo::{AppConfig, BackendRegistry, FieldNormalizer, ResolutionCoordinator};
//! use std::sync::Arc;
//!
//! # async fn run() -> ipgeo::Result<()> {
//! let config = AppConfig::load()?;
//! let normalizer = FieldNormalizer::new(&config.database.locales)?;
//! let registry = BackendRegistry::open(&config.resolved_backends()?, normalizer.candidates());
//! let coordinator = ResolutionCoordinator::new(Arc::new(registry), normalizer);
//!
//! let resolution = coordinator.resolve("8.8.8.8", &[]).await;
//! for outcome in &resolution.outcomes {
//!     println!("{}: {:?}", outcome.backend, outcome.outcome);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod database;
pub mod error;
pub mod output;
pub mod resolve;
pub mod utils;

pub use config::{AppConfig, BackendConfig, BackendSource};
pub use database::{
    Backend, BackendDescriptor, BackendRegistry, LookupError, LookupOutcome, NormalizedRecord,
};
pub use error::{GeoError, Result};
pub use resolve::{
    BatchResolver, FieldNormalizer, MAX_BATCH, Resolution, ResolutionCoordinator, classify,
};
