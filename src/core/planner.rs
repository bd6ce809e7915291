use std::collections::BTreeMap;

use bon::Builder;
use serde_json::{Map, Value, json};

use crate::{
    config::{PlanConfig, StrategyConfig},
    core::{
        PlanType,
        PlanningError,
        cap::CapEnforcer,
        commitment::{
            calculate_effective_savings_rate,
            calculate_savings_percentage,
            commitment_from_coverage,
            coverage_from_commitment,
        },
        coverage::{CoverageAnalyzer, CoverageSummary},
        plan::{CoverageDetails, Details, PurchasePlan, SpendingDetails},
        split::SplitStrategy,
        target::TargetStrategy,
    },
    prelude::*,
    quantity::{percent::Percent, rate::HourlyRate},
    snapshot::{History, Snapshot},
};

/// Composes the planning pipeline into purchase plans.
///
/// Stateless: plan types are processed independently, and the output is a pure function
/// of the configuration and the snapshot.
#[derive(Builder)]
pub struct Planner<'a> {
    config: &'a StrategyConfig,
    snapshot: &'a Snapshot,
}

/// Purchase sized for one plan type, before the cap and minimum commitment checks.
struct Sizing {
    target: Percent,
    purchase: Percent,
    recommendation_id: Option<String>,
}

impl Planner<'_> {
    /// Plan purchases for all enabled plan types.
    ///
    /// A plan type without usable data, without a gap, or breaching the cap is skipped,
    /// so the result may have fewer plans than there are enabled plan types.
    #[instrument(skip_all, fields(taken_at = %self.snapshot.taken_at))]
    pub fn plan(&self) -> Vec<PurchasePlan> {
        let plans = self
            .config
            .plans
            .iter()
            .filter_map(|(plan_type, plan_config)| {
                match self.plan_type(*plan_type, plan_config) {
                    Ok(plan) => plan,
                    Err(error) => {
                        warn!(plan_type = %plan_type, "skipping: {error:#}");
                        None
                    }
                }
            })
            .collect::<Vec<_>>();
        info!(n_plans = plans.len(), n_enabled = self.config.plans.len(), "planned");
        plans
    }

    /// Current normalised coverage of every enabled plan type with usable data.
    #[instrument(skip_all, fields(taken_at = %self.snapshot.taken_at))]
    pub fn live_coverage(&self) -> BTreeMap<PlanType, Percent> {
        self.config
            .plans
            .iter()
            .filter_map(|(plan_type, plan_config)| {
                self.summarize(*plan_type, plan_config)
                    .inspect_err(|error| warn!(plan_type = %plan_type, "no live coverage: {error:#}"))
                    .ok()
                    .map(|(_, summary, _)| (*plan_type, summary.current_coverage()))
            })
            .collect()
    }

    #[instrument(skip_all, fields(plan_type = %plan_type))]
    fn plan_type(
        &self,
        plan_type: PlanType,
        plan_config: &PlanConfig,
    ) -> Result<Option<PurchasePlan>, PlanningError> {
        let (history, summary, savings) = self.summarize(plan_type, plan_config)?;
        let current = summary.current_coverage();

        let Some(sizing) = self.size(plan_type, history, &summary, savings)? else {
            return Ok(None);
        };

        if !CapEnforcer::new(self.config.cap).allows(current, sizing.purchase) {
            info!(
                ?current,
                purchase = ?sizing.purchase,
                cap = ?self.config.cap,
                "would exceed the cap, dropping the plan",
            );
            return Ok(None);
        }

        let hourly_commitment =
            commitment_from_coverage(summary.hourly_coverage(sizing.purchase), savings)
                .round_to_commitment();
        if hourly_commitment < self.config.min_commitment {
            info!(
                ?hourly_commitment,
                min_commitment = ?self.config.min_commitment,
                "below the minimum commitment, dropping the plan",
            );
            return Ok(None);
        }

        let plan = PurchasePlan {
            idempotency_token: PurchasePlan::idempotency_token(
                plan_type,
                plan_config.term,
                plan_config.payment_option,
                hourly_commitment,
                self.snapshot.taken_at.date_naive(),
            ),
            plan_type,
            hourly_commitment,
            purchase_percent: sizing.purchase,
            term: plan_config.term,
            payment_option: plan_config.payment_option,
            estimated_savings: savings,
            recommendation_id: sizing.recommendation_id,
            details: Details {
                coverage: CoverageDetails {
                    current,
                    target: sizing.target,
                    gap: sizing.target - current,
                },
                spending: SpendingDetails {
                    total: summary.avg_hourly_total,
                    covered: summary.avg_hourly_covered,
                    uncovered: summary.avg_hourly_uncovered(),
                },
                strategy_params: self.strategy_params(plan_config, history, &summary, savings),
            },
        };
        info!(
            ?current,
            target = ?sizing.target,
            purchase = ?plan.purchase_percent,
            hourly_commitment = ?plan.hourly_commitment,
            token = %plan.idempotency_token,
            "planned",
        );
        Ok(Some(plan))
    }

    /// Decide the purchase percentage.
    ///
    /// # Returns
    ///
    /// - [`Some`] [`Sizing`] when there is something to buy.
    /// - [`None`] when the coverage is already at or above the target.
    fn size(
        &self,
        plan_type: PlanType,
        history: &History,
        summary: &CoverageSummary,
        savings: Percent,
    ) -> Result<Option<Sizing>, PlanningError> {
        let current = summary.current_coverage();

        if self.config.target == TargetStrategy::Provider {
            let recommendation = history.recommendation.as_ref().ok_or_else(|| {
                PlanningError::data_unavailable(plan_type, "no provider recommendation")
            })?;
            // The minimum commitment applies after the rounding, same as for the split:
            if recommendation.hourly_commitment_to_purchase <= HourlyRate::ZERO {
                info!(recommendation_id = %recommendation.recommendation_id, "nothing recommended");
                return Ok(None);
            }
            // Applied at full value, bypassing the split:
            let purchase = summary.normalized_percentage(coverage_from_commitment(
                recommendation.hourly_commitment_to_purchase,
                savings,
            ));
            return Ok(Some(Sizing {
                target: current + purchase,
                purchase,
                recommendation_id: Some(recommendation.recommendation_id.clone()),
            }));
        }

        let target = self.config.target.resolve(summary, history, savings).ok_or_else(|| {
            PlanningError::data_unavailable(plan_type, "insufficient history for the target")
        })?;
        let purchase = self.config.split.calculate(current, target);
        if purchase <= Percent::ZERO {
            info!(?current, ?target, "already at the target");
            return Ok(None);
        }
        Ok(Some(Sizing { target, purchase, recommendation_id: None }))
    }

    /// Analyse the plan type's history with its discount rate.
    fn summarize(
        &self,
        plan_type: PlanType,
        plan_config: &PlanConfig,
    ) -> Result<(&History, CoverageSummary, Percent), PlanningError> {
        let history = self
            .snapshot
            .history(plan_type)
            .ok_or_else(|| PlanningError::data_unavailable(plan_type, "missing history"))?;
        let savings = Self::savings(plan_type, plan_config, history)?;
        let summary = CoverageAnalyzer::builder()
            .taken_at(self.snapshot.taken_at)
            .renewal_window(self.config.renewal_window)
            .build()
            .analyze(plan_type, history, savings)?;
        Ok((history, summary, savings))
    }

    /// Configured discount rate, or the one achieved by the existing commitments.
    fn savings(
        plan_type: PlanType,
        plan_config: &PlanConfig,
        history: &History,
    ) -> Result<Percent, PlanningError> {
        if let Some(savings) = plan_config.savings {
            return Ok(savings);
        }
        let utilization = history
            .utilization
            .ok_or_else(|| PlanningError::data_unavailable(plan_type, "unknown discount rate"))?;
        let savings = calculate_savings_percentage(
            utilization.on_demand_equivalent,
            utilization.used_commitment,
        );
        if savings.is_proper() && savings < Percent::HUNDRED {
            debug!(?savings, "derived the discount rate from the utilization");
            Ok(savings)
        } else {
            Err(PlanningError::data_unavailable(plan_type, "unusable discount rate"))
        }
    }

    fn strategy_params(
        &self,
        plan_config: &PlanConfig,
        history: &History,
        summary: &CoverageSummary,
        savings: Percent,
    ) -> Map<String, Value> {
        let mut params = Map::new();
        params.insert("target_strategy".into(), self.config.target.to_string().into());
        if let TargetStrategy::Fixed { target } = self.config.target {
            params.insert("target_percent".into(), target.0.into());
        }
        if self.config.target != TargetStrategy::Provider {
            params.insert("split_strategy".into(), self.config.split.strategy.to_string().into());
            params.insert("max_purchase_percent".into(), self.config.split.max_purchase.0.into());
            params.insert("min_purchase_percent".into(), self.config.split.min_purchase.0.into());
            if let SplitStrategy::Linear { step } = self.config.split.strategy {
                params.insert("linear_step_percent".into(), step.0.into());
            }
        }
        params.insert("cap_percent".into(), self.config.cap.0.into());
        params.insert("savings_percent".into(), savings.0.into());
        params.insert(
            "savings_source".into(),
            if plan_config.savings.is_some() { "config" } else { "utilization" }.into(),
        );
        params.insert("avg_to_min_ratio".into(), summary.avg_to_min_ratio.into());
        params.insert("min_hourly_total".into(), summary.min_hourly_total.0.into());
        params.insert("n_samples".into(), summary.n_samples.into());
        if let Some(utilization) = history.utilization {
            params.insert(
                "effective_savings_rate".into(),
                json!(
                    calculate_effective_savings_rate(
                        utilization.on_demand_equivalent,
                        utilization.total_commitment,
                    )
                    .0
                ),
            );
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use chrono::{DateTime, TimeDelta, TimeZone, Utc};

    use super::*;
    use crate::{
        core::{
            PaymentOption,
            Term,
            split::{EPSILON, Split},
        },
        quantity::cost::Cost,
        snapshot::{HourlySample, ProviderRecommendation, Utilization},
    };

    fn taken_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 1, 0, 0, 0).unwrap()
    }

    /// Flat spend of `100/h` covered at the given percentage, so the normalisation is a no-op.
    fn flat_history(coverage: f64) -> History {
        History {
            samples: (1..=24)
                .map(|hour| HourlySample {
                    timestamp: taken_at() - TimeDelta::hours(hour),
                    covered_spend: Cost(coverage),
                    total_spend: Cost(100.0),
                })
                .collect(),
            ..History::default()
        }
    }

    fn snapshot(histories: impl IntoIterator<Item = (PlanType, History)>) -> Snapshot {
        Snapshot { taken_at: taken_at(), plan_types: histories.into_iter().collect() }
    }

    fn config(target: TargetStrategy, cap: f64) -> StrategyConfig {
        let plan_config = PlanConfig {
            term: Term::OneYear,
            payment_option: PaymentOption::NoUpfront,
            savings: Some(Percent(30.0)),
        };
        StrategyConfig {
            target,
            split: Split {
                strategy: SplitStrategy::Dichotomy,
                max_purchase: Percent(50.0),
                min_purchase: Percent(1.0),
            },
            cap: Percent(cap),
            min_commitment: HourlyRate(0.001),
            renewal_window: TimeDelta::zero(),
            plans: [PlanType::Compute, PlanType::Database, PlanType::SageMaker]
                .into_iter()
                .map(|plan_type| (plan_type, plan_config))
                .collect(),
        }
    }

    fn fixed(target: f64) -> TargetStrategy {
        TargetStrategy::Fixed { target: Percent(target) }
    }

    #[test]
    fn test_dichotomy_from_half() {
        let config = config(fixed(90.0), 100.0);
        let snapshot = snapshot([(PlanType::Compute, flat_history(50.0))]);
        let plans = Planner::builder().config(&config).snapshot(&snapshot).build().plan();
        assert_eq!(plans.len(), 1);
        let plan = &plans[0];
        assert_eq!(plan.plan_type, PlanType::Compute);
        assert_abs_diff_eq!(plan.purchase_percent.0, 25.0);
        // 25% of 100/h at 30% savings:
        assert_abs_diff_eq!(plan.hourly_commitment.0, 17.5);
        assert_abs_diff_eq!(plan.details.coverage.current.0, 50.0);
        assert_abs_diff_eq!(plan.details.coverage.target.0, 90.0);
        assert_abs_diff_eq!(plan.details.coverage.gap.0, 40.0);
        assert_abs_diff_eq!(plan.details.spending.uncovered.0, 50.0);
        assert_eq!(plan.details.strategy_params["split_strategy"], "dichotomy");
        assert_eq!(plan.estimated_savings, Percent(30.0));
        assert_eq!(plan.recommendation_id, None);
    }

    #[test]
    fn test_above_target_emits_nothing() {
        let config = config(fixed(90.0), 100.0);
        let snapshot = snapshot([(PlanType::Compute, flat_history(95.0))]);
        assert!(Planner::builder().config(&config).snapshot(&snapshot).build().plan().is_empty());
    }

    #[test]
    fn test_cap_drops_only_the_offending_type() {
        // Compute: 88% + 10% = 98% > 95%. Database: 85% + 10% = 95%.
        let mut config = config(fixed(98.0), 95.0);
        config.split.max_purchase = Percent(10.0);
        let snapshot = snapshot([
            (PlanType::Compute, flat_history(88.0)),
            (PlanType::Database, flat_history(85.0)),
        ]);
        let plans = Planner::builder().config(&config).snapshot(&snapshot).build().plan();
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].plan_type, PlanType::Database);
        assert_abs_diff_eq!(plans[0].purchase_percent.0, 10.0);
    }

    #[test]
    fn test_cap_property() {
        for cap in [60.0, 80.0, 95.0, 100.0] {
            let config = config(fixed(100.0), cap);
            for coverage in [0.0, 20.0, 45.0, 70.0, 90.0, 99.5] {
                let snapshot = snapshot([(PlanType::Compute, flat_history(coverage))]);
                for plan in Planner::builder().config(&config).snapshot(&snapshot).build().plan() {
                    assert!(
                        plan.details.coverage.current + plan.purchase_percent
                            <= Percent(cap) + EPSILON,
                    );
                }
            }
        }
    }

    #[test]
    fn test_missing_data_skips_silently() {
        let config = config(fixed(90.0), 100.0);
        let snapshot = snapshot([
            (PlanType::Compute, flat_history(50.0)),
            (PlanType::Database, History::default()),
        ]);
        let plans = Planner::builder().config(&config).snapshot(&snapshot).build().plan();
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].plan_type, PlanType::Compute);
    }

    #[test]
    fn test_savings_from_utilization() {
        let mut config = config(fixed(90.0), 100.0);
        for plan_config in config.plans.values_mut() {
            plan_config.savings = None;
        }
        let mut history = flat_history(50.0);
        history.utilization = Some(Utilization {
            on_demand_equivalent: Cost(100.0),
            used_commitment: Cost(60.0),
            total_commitment: Cost(80.0),
        });
        let snapshot = snapshot([(PlanType::Compute, history), (PlanType::Database, flat_history(50.0))]);
        let plans = Planner::builder().config(&config).snapshot(&snapshot).build().plan();

        // Database has neither configured nor historical discount:
        assert_eq!(plans.len(), 1);
        let plan = &plans[0];
        assert_abs_diff_eq!(plan.estimated_savings.0, 40.0, epsilon = 1e-9);
        assert_abs_diff_eq!(plan.hourly_commitment.0, 15.0, epsilon = 1e-9);
        assert_eq!(plan.details.strategy_params["savings_source"], "utilization");
        assert_abs_diff_eq!(
            plan.details.strategy_params["effective_savings_rate"].as_f64().unwrap(),
            20.0,
            epsilon = 1e-9,
        );
    }

    #[test]
    fn test_provider_bypasses_split() {
        let config = config(TargetStrategy::Provider, 100.0);
        let mut history = flat_history(50.0);
        history.recommendation = Some(ProviderRecommendation {
            hourly_commitment_to_purchase: HourlyRate(28.0),
            recommendation_id: "rec-42".to_string(),
        });
        let snapshot = snapshot([(PlanType::Compute, history), (PlanType::Database, flat_history(50.0))]);
        let plans = Planner::builder().config(&config).snapshot(&snapshot).build().plan();
        assert_eq!(plans.len(), 1);
        let plan = &plans[0];
        assert_abs_diff_eq!(plan.hourly_commitment.0, 28.0, epsilon = 1e-9);
        // 28 / 0.7 = 40 of the 100/h minimum, more than the dichotomy would allow:
        assert_abs_diff_eq!(plan.purchase_percent.0, 40.0, epsilon = 1e-9);
        assert_eq!(plan.recommendation_id.as_deref(), Some("rec-42"));
        assert!(plan.details.strategy_params.get("split_strategy").is_none());
    }

    #[test]
    fn test_provider_is_still_capped() {
        let config = config(TargetStrategy::Provider, 80.0);
        let mut history = flat_history(50.0);
        history.recommendation = Some(ProviderRecommendation {
            hourly_commitment_to_purchase: HourlyRate(28.0),
            recommendation_id: "rec-42".to_string(),
        });
        let snapshot = snapshot([(PlanType::Compute, history)]);
        assert!(Planner::builder().config(&config).snapshot(&snapshot).build().plan().is_empty());
    }

    #[test]
    fn test_provider_minimum_commitment_after_rounding() {
        let plan_with = |hourly_commitment_to_purchase| {
            let config = config(TargetStrategy::Provider, 100.0);
            let mut history = flat_history(50.0);
            history.recommendation = Some(ProviderRecommendation {
                hourly_commitment_to_purchase: HourlyRate(hourly_commitment_to_purchase),
                recommendation_id: "rec-1".to_string(),
            });
            let snapshot = snapshot([(PlanType::Compute, history)]);
            Planner::builder().config(&config).snapshot(&snapshot).build().plan()
        };

        // Exactly the minimum is still bought, like on the split path:
        let plans = plan_with(0.001);
        assert_eq!(plans.len(), 1);
        assert_abs_diff_eq!(plans[0].hourly_commitment.0, 0.001, epsilon = 1e-12);

        // Rounds down to zero:
        assert!(plan_with(0.0004).is_empty());
        assert!(plan_with(0.0).is_empty());
    }

    #[test]
    fn test_dynamic_target() {
        let config = config(TargetStrategy::Dynamic, 100.0);
        let snapshot = snapshot([(PlanType::Compute, flat_history(0.0))]);
        let plans = Planner::builder().config(&config).snapshot(&snapshot).build().plan();
        assert_eq!(plans.len(), 1);
        assert_abs_diff_eq!(plans[0].details.coverage.target.0, 100.0);
        assert_abs_diff_eq!(plans[0].purchase_percent.0, 50.0);
    }

    #[test]
    fn test_min_commitment() {
        let mut config = config(fixed(90.0), 100.0);
        config.min_commitment = HourlyRate(20.0);
        let snapshot = snapshot([(PlanType::Compute, flat_history(50.0))]);
        assert!(Planner::builder().config(&config).snapshot(&snapshot).build().plan().is_empty());
    }

    #[test]
    fn test_idempotent() {
        let config = config(fixed(90.0), 100.0);
        let snapshot = snapshot([
            (PlanType::Compute, flat_history(10.0)),
            (PlanType::SageMaker, flat_history(60.0)),
        ]);
        let planner = Planner::builder().config(&config).snapshot(&snapshot).build();
        let tokens = |plans: Vec<PurchasePlan>| {
            plans.into_iter().map(|plan| plan.idempotency_token).collect::<Vec<_>>()
        };
        assert_eq!(tokens(planner.plan()), tokens(planner.plan()));
    }

    #[test]
    fn test_live_coverage() {
        let config = config(fixed(90.0), 100.0);
        let snapshot = snapshot([(PlanType::Compute, flat_history(73.0))]);
        let coverage = Planner::builder().config(&config).snapshot(&snapshot).build().live_coverage();
        assert_eq!(coverage.len(), 1);
        assert_abs_diff_eq!(coverage[&PlanType::Compute].0, 73.0, epsilon = 1e-9);
    }
}
