//! Resolution pipeline
//!
//! - `classify`: decides whether an input is IPv4, IPv6 or invalid
//! - `normalize`: maps raw backend records onto [`NormalizedRecord`](crate::database::NormalizedRecord)
//! - `coordinator`: fans one address out to the requested backends
//! - `batch`: resolves up to [`MAX_BATCH`] newline-separated addresses

pub mod batch;
pub mod classify;
pub mod coordinator;
pub mod normalize;

pub use batch::{BatchResolver, MAX_BATCH, parse_batch};
pub use classify::{AddressClass, classify};
pub use coordinator::{BackendOutcome, Resolution, ResolutionCoordinator};
pub use normalize::FieldNormalizer;
