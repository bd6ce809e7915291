use crate::core::PlanType;

#[derive(Debug, thiserror::Error)]
pub enum PlanningError {
    /// The strategy configuration is unusable, nothing gets planned.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// The plan type gets skipped for this cycle.
    #[error("no usable data for `{plan_type}`: {reason}")]
    DataUnavailable { plan_type: PlanType, reason: &'static str },
}

impl PlanningError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub const fn data_unavailable(plan_type: PlanType, reason: &'static str) -> Self {
        Self::DataUnavailable { plan_type, reason }
    }
}
