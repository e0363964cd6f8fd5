//! Engine data types.

mod managed;
mod overrides;
mod plan;
mod provider;
mod records;

pub use managed::{ManagedRecord, RecordSource};
pub use overrides::HostnameOverride;
pub use plan::{AppliedOp, OpOutcome, Plan, PlanOp, PlanResult, SkippedKey};
pub use provider::ProviderDescriptor;
pub use records::{CachedRecord, DesiredRecord};
