//! Usage data supplied by the billing collaborators for a single planning run.

use std::{collections::BTreeMap, fs, path::Path};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    core::PlanType,
    prelude::*,
    quantity::{cost::Cost, rate::HourlyRate},
};

/// Everything the planner knows about the outside world, captured once per invocation.
#[must_use]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Snapshot {
    pub taken_at: DateTime<Utc>,

    #[serde(default)]
    pub plan_types: BTreeMap<PlanType, History>,
}

impl Snapshot {
    pub fn read_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read the snapshot from `{}`", path.display()))?;
        let snapshot: Self = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse the snapshot `{}`", path.display()))?;
        info!(
            taken_at = %snapshot.taken_at,
            n_plan_types = snapshot.plan_types.len(),
            "loaded the snapshot",
        );
        Ok(snapshot)
    }

    #[must_use]
    pub fn history(&self, plan_type: PlanType) -> Option<&History> {
        self.plan_types.get(&plan_type)
    }
}

/// Coverage history and related figures of a single plan type.
#[must_use]
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct History {
    #[serde(default)]
    pub granularity: Granularity,

    /// Ordered, de-duplicated samples.
    #[serde(default)]
    pub samples: Vec<HourlySample>,

    /// Currently active commitments, used to exclude those due for renewal.
    #[serde(default)]
    pub expiring: Vec<ActiveCommitment>,

    pub utilization: Option<Utilization>,

    /// Provider-side purchase recommendation, if any.
    pub recommendation: Option<ProviderRecommendation>,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    #[default]
    Hourly,

    /// Each sample sums up a whole day.
    Daily,
}

impl Granularity {
    #[must_use]
    pub const fn n_hours(self) -> f64 {
        match self {
            Self::Hourly => 1.0,
            Self::Daily => 24.0,
        }
    }
}

/// Spend within one time bucket.
#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
pub struct HourlySample {
    pub timestamp: DateTime<Utc>,

    /// On-demand-equivalent spend covered by Savings Plans.
    pub covered_spend: Cost,

    /// Total on-demand-equivalent spend.
    pub total_spend: Cost,
}

#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
pub struct ActiveCommitment {
    pub hourly_commitment: HourlyRate,
    pub ends_at: DateTime<Utc>,
}

/// Historical utilisation of the existing commitments.
#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
pub struct Utilization {
    /// What the covered usage would have cost on demand.
    pub on_demand_equivalent: Cost,

    /// Part of the commitment actually used.
    pub used_commitment: Cost,

    /// Total commitment paid, including the unused part.
    pub total_commitment: Cost,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProviderRecommendation {
    pub hourly_commitment_to_purchase: HourlyRate,
    pub recommendation_id: String,
}
