//! # trafego-core
//!
//! The Trafego reconciliation engine: derives a desired set of DNS
//! records from hostname sources, mirrors provider-side state into a
//! local cache, and converges the two with a minimal operation plan -
//! creating, updating, and (after a two-phase orphan grace period)
//! deleting records it owns, while never touching records it did not
//! create.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  snapshot()  ┌────────────────────┐
//! │ Hostname     │─────────────▶│ HostnameAggregator │──┐ desired set
//! │ Sources      │              └────────────────────┘  │
//! └──────────────┘                                      ▼
//! ┌──────────────┐  list/refresh  ┌───────────┐   ┌────────────┐
//! │ DnsAdapter   │───────────────▶│ Provider  │──▶│ Reconciler │──▶ Plan
//! │ (per prov.)  │◀───────────────│ Cache     │   └────────────┘
//! └──────────────┘  create/update └───────────┘         │
//!        ▲          /delete                             ▼
//!        │                        ┌───────────┐  ┌───────────────┐
//!        └────────────────────────│ Managed   │◀─│ OrphanDetector│
//!                                 │ Records   │  └───────────────┘
//!                                 └───────────┘
//! ```
//!
//! The [`Scheduler`](services::Scheduler) drives one worker per
//! provider; the [`EngineHandle`](services::EngineHandle) exposes the
//! administrative operations (forced cycles, dry-runs, pause/resume,
//! claim/release).
//!
//! Storage is abstracted behind the repository traits in [`traits`];
//! `trafego-store` provides the SQLite implementation and [`memory`]
//! the in-memory one used by tests.

pub mod config;
pub mod error;
pub mod memory;
pub mod services;
pub mod traits;
pub mod types;

pub use config::EngineConfig;
pub use error::{EngineError, EngineResult};
pub use services::{
    DesiredSet, EngineContext, EngineHandle, HostnameAggregator, OrphanDetector, Reconciler,
    Scheduler, Trigger,
};
