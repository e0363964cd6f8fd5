//! Reconciliation plans and their execution results.

use serde::{Deserialize, Serialize};

use trafego_provider::{AdapterError, Record, RecordKey};

use crate::types::RecordSource;

/// One operation in a reconciliation plan.
///
/// `Claim` is store-only: it imports an existing provider record into
/// the managed store without touching the provider. The remaining
/// variants each map to one provider API call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum PlanOp {
    /// Import an existing provider record into the managed store.
    Claim {
        external_id: String,
        record: Record,
        source: RecordSource,
    },
    /// Delete the record with this provider-native id.
    Delete { external_id: String, key: RecordKey },
    /// Rewrite the record with this provider-native id.
    Update { external_id: String, record: Record },
    /// Create a new record.
    Create { record: Record },
}

impl PlanOp {
    /// The `(type, name)` key this operation concerns.
    #[must_use]
    pub fn key(&self) -> RecordKey {
        match self {
            Self::Claim { record, .. } | Self::Update { record, .. } | Self::Create { record } => {
                record.key()
            }
            Self::Delete { key, .. } => key.clone(),
        }
    }

    /// Lexicographic `(name, type)` ordering key for deterministic plans.
    #[must_use]
    pub fn sort_key(&self) -> (String, &'static str) {
        let key = self.key();
        (key.name, key.kind.as_str())
    }

    /// Whether executing this operation calls the provider API.
    #[must_use]
    pub fn mutates_provider(&self) -> bool {
        !matches!(self, Self::Claim { .. })
    }
}

/// A key excluded from the plan, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedKey {
    pub key: RecordKey,
    pub reason: String,
}

/// The ordered set of operations one reconciliation cycle intends to
/// apply: claims first (store-only), then deletes, updates, creates,
/// each group sorted by `(name, type)`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub provider_id: String,
    pub operations: Vec<PlanOp>,
    /// Keys excluded from this plan (conflicts, invalid records).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedKey>,
}

impl Plan {
    #[must_use]
    pub fn new(provider_id: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
            operations: Vec::new(),
            skipped: Vec::new(),
        }
    }

    /// True when the plan neither mutates the provider nor the store.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Number of operations that will call the provider API.
    #[must_use]
    pub fn mutation_count(&self) -> usize {
        self.operations
            .iter()
            .filter(|op| op.mutates_provider())
            .count()
    }
}

/// Outcome of one applied operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum OpOutcome {
    /// The operation committed at the provider (and the store).
    Succeeded,
    /// The operation failed after exhausting retries on a transient
    /// error; it will be retried on a later cycle.
    FailedTransient { error: AdapterError },
    /// The operation failed permanently and is not retried.
    FailedPermanent { error: AdapterError },
}

impl OpOutcome {
    #[must_use]
    pub fn from_error(error: AdapterError) -> Self {
        if error.is_transient() {
            Self::FailedTransient { error }
        } else {
            Self::FailedPermanent { error }
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

/// One plan operation together with its outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedOp {
    pub op: PlanOp,
    pub outcome: OpOutcome,
}

/// Result of applying a plan: per-operation outcomes plus counters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanResult {
    pub provider_id: String,
    /// Outcomes in application order.
    pub applied: Vec<AppliedOp>,
    /// Keys the plan skipped up front.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedKey>,
    /// True when the provider was paused and nothing was applied.
    pub dry_run: bool,
}

impl PlanResult {
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.applied.iter().filter(|a| a.outcome.is_success()).count()
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.applied.len() - self.succeeded()
    }
}
