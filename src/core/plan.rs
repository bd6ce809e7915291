use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    core::{PaymentOption, PlanType, Term},
    quantity::{percent::Percent, rate::HourlyRate},
};

/// A single purchase to be queued, consumed exactly once downstream.
#[serde_with::skip_serializing_none]
#[must_use]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PurchasePlan {
    /// The execution stage must never create two commitments for the same token.
    pub idempotency_token: String,

    #[serde(rename = "sp_type")]
    pub plan_type: PlanType,

    pub hourly_commitment: HourlyRate,

    /// Coverage bought, normalised to the minimum hourly spend.
    pub purchase_percent: Percent,

    pub term: Term,
    pub payment_option: PaymentOption,

    #[serde(rename = "estimated_savings_percentage")]
    pub estimated_savings: Percent,

    pub recommendation_id: Option<String>,

    /// Diagnostics for the audit trail.
    pub details: Details,
}

impl PurchasePlan {
    /// Derive the idempotency token from what gets bought and when it was planned.
    ///
    /// Re-planning from the same snapshot reproduces the token.
    #[must_use]
    pub fn idempotency_token(
        plan_type: PlanType,
        term: Term,
        payment_option: PaymentOption,
        hourly_commitment: HourlyRate,
        planned_on: NaiveDate,
    ) -> String {
        let digest = md5::compute(
            format!("{plan_type}:{term}:{payment_option}:{:.5}:{planned_on}", hourly_commitment.0)
                .as_bytes(),
        );
        format!("{digest:x}")
    }
}

/// Diagnostic-only snapshot of the decision, preserved verbatim.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Details {
    pub coverage: CoverageDetails,
    pub spending: SpendingDetails,

    #[serde(default)]
    pub strategy_params: Map<String, Value>,
}

#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
pub struct CoverageDetails {
    pub current: Percent,
    pub target: Percent,
    pub gap: Percent,
}

/// Average hourly spend.
#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
pub struct SpendingDetails {
    pub total: HourlyRate,
    pub covered: HourlyRate,
    pub uncovered: HourlyRate,
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::prelude::*;

    pub fn plan(plan_type: PlanType, purchase_percent: Percent) -> PurchasePlan {
        PurchasePlan {
            idempotency_token: format!("token-{plan_type}"),
            plan_type,
            hourly_commitment: HourlyRate(1.0),
            purchase_percent,
            term: Term::OneYear,
            payment_option: PaymentOption::NoUpfront,
            estimated_savings: Percent(30.0),
            recommendation_id: None,
            details: Details {
                coverage: CoverageDetails {
                    current: Percent::ZERO,
                    target: purchase_percent,
                    gap: purchase_percent,
                },
                spending: SpendingDetails {
                    total: HourlyRate(10.0),
                    covered: HourlyRate::ZERO,
                    uncovered: HourlyRate(10.0),
                },
                strategy_params: Map::new(),
            },
        }
    }

    #[test]
    fn test_idempotency_token_is_stable() {
        let planned_on = NaiveDate::from_ymd_opt(2026, 10, 1).unwrap();
        let token = |commitment| {
            PurchasePlan::idempotency_token(
                PlanType::Compute,
                Term::OneYear,
                PaymentOption::NoUpfront,
                HourlyRate(commitment),
                planned_on,
            )
        };
        assert_eq!(token(1.234), token(1.234));
        assert_ne!(token(1.234), token(1.235));
        assert_eq!(token(1.234).len(), 32);
    }

    #[test]
    fn test_serialize_field_names() -> Result {
        let mut plan = plan(PlanType::Database, Percent(12.5));
        plan.details.strategy_params.insert("target_strategy".to_string(), "fixed".into());
        let value = serde_json::to_value(&plan)?;
        assert_eq!(value["sp_type"], "database");
        assert_eq!(value["purchase_percent"], 12.5);
        assert_eq!(value["term"], "ONE_YEAR");
        assert_eq!(value["payment_option"], "NO_UPFRONT");
        assert_eq!(value["estimated_savings_percentage"], 30.0);
        assert_eq!(value["details"]["coverage"]["gap"], 12.5);
        assert_eq!(value["details"]["strategy_params"]["target_strategy"], "fixed");
        assert!(value.get("recommendation_id").is_none());
        Ok(())
    }

    #[test]
    fn test_details_survive_round_trip() -> Result {
        let mut plan = plan(PlanType::Compute, Percent(25.0));
        plan.details.strategy_params.insert("custom".to_string(), serde_json::json!({"a": [1, 2]}));
        let restored: PurchasePlan = serde_json::from_str(&serde_json::to_string(&plan)?)?;
        assert_eq!(restored.details.strategy_params, plan.details.strategy_params);
        Ok(())
    }
}
