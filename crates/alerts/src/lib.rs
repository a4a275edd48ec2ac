//! The admin alert engine: a live, filterable and prioritized view of
//! unresolved alerts, with at-most-once resolution through quick actions.
mod error;

pub mod dispatch;
pub mod engine;
pub mod filter;
pub mod grouping;
pub mod ingest;
pub mod resolution;
pub mod stats;
pub mod store;
pub mod subscription;

#[cfg(test)]
mod testing;

pub use dispatch::{ActionEffects, ActionOutcome, DisabledEffects, EffectRequest, SideEffect};
pub use engine::{ActionAttempt, AlertEngine, AttemptOutcome, EngineConfig};
pub use error::Error;
pub use filter::{AlertFilter, DateRange, Selector};
pub use grouping::PriorityGroups;
pub use ingest::{ingest, Ingested, Rejected};
pub use resolution::ResolveOutcome;
pub use stats::{AlertStats, PriorityCounts};
pub use store::{AlertStore, MemoryStore, StoreError};
pub use subscription::{FeedState, Privilege, Subscription};
