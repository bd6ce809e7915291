use std::fmt::{Display, Formatter};

use crate::{
    core::{
        coverage::{CoverageAnalyzer, CoverageSummary},
        optimal::OptimalCoverageSearch,
    },
    prelude::*,
    quantity::percent::Percent,
    snapshot::History,
};

/// Where the desired coverage comes from.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TargetStrategy {
    /// Configured percentage of the average spend.
    Fixed { target: Percent },

    /// Coverage maximising the net savings over the plan type's own history.
    Dynamic,

    /// Defer to the provider's purchase recommendation.
    Provider,
}

impl Display for TargetStrategy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fixed { .. } => write!(f, "fixed"),
            Self::Dynamic => write!(f, "dynamic"),
            Self::Provider => write!(f, "provider"),
        }
    }
}

impl TargetStrategy {
    /// Normalised target coverage of the plan type.
    ///
    /// # Returns
    ///
    /// - [`Some`] target, normalised to the minimum hourly spend.
    /// - [`None`] for the provider strategy, which bypasses the target and split logic,
    ///   or when the history is insufficient for the search.
    #[must_use]
    pub fn resolve(
        self,
        summary: &CoverageSummary,
        history: &History,
        savings: Percent,
    ) -> Option<Percent> {
        match self {
            Self::Fixed { target } => Some(summary.normalize(target)),
            Self::Dynamic => {
                let hourly_costs = CoverageAnalyzer::hourly_costs(history);
                let optimum = OptimalCoverageSearch::new(&hourly_costs, savings).run()?;
                let target = summary.normalized_percentage(optimum.coverage_hourly);
                debug!(
                    ?optimum.coverage_hourly,
                    ?optimum.coverage_pct_of_max,
                    ?target,
                    "resolved the dynamic target",
                );
                Some(target)
            }
            Self::Provider => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use chrono::{TimeDelta, TimeZone, Utc};

    use super::*;
    use crate::{core::PlanType, quantity::cost::Cost, snapshot::HourlySample};

    fn history(totals: &[f64]) -> History {
        let start = Utc.with_ymd_and_hms(2026, 9, 1, 0, 0, 0).unwrap();
        History {
            samples: totals
                .iter()
                .zip(0..)
                .map(|(total, hour)| HourlySample {
                    timestamp: start + TimeDelta::hours(hour),
                    covered_spend: Cost(0.0),
                    total_spend: Cost(*total),
                })
                .collect(),
            ..History::default()
        }
    }

    fn summarize(history: &History) -> CoverageSummary {
        CoverageAnalyzer::builder()
            .taken_at(Utc.with_ymd_and_hms(2026, 10, 1, 0, 0, 0).unwrap())
            .build()
            .analyze(PlanType::Compute, history, Percent(30.0))
            .unwrap()
    }

    #[test]
    fn test_fixed_is_normalized() {
        let history = history(&[80.0, 120.0]);
        let summary = summarize(&history);
        let target = TargetStrategy::Fixed { target: Percent(80.0) }.resolve(
            &summary,
            &history,
            Percent(30.0),
        );
        assert_abs_diff_eq!(target.unwrap().0, 100.0);
    }

    #[test]
    fn test_fixed_is_verbatim_for_flat_spend() {
        let history = history(&[50.0; 24]);
        let summary = summarize(&history);
        let target = TargetStrategy::Fixed { target: Percent(90.0) }
            .resolve(&summary, &history, Percent(30.0));
        assert_eq!(target, Some(Percent(90.0)));
    }

    #[test]
    fn test_dynamic_flat_spend() {
        let history = history(&[50.0; 24]);
        let summary = summarize(&history);
        let target = TargetStrategy::Dynamic.resolve(&summary, &history, Percent(30.0));
        assert_abs_diff_eq!(target.unwrap().0, 100.0);
    }

    #[test]
    fn test_dynamic_covers_the_peak_with_high_discount() {
        let history = history(&[10.0, 30.0, 30.0, 30.0, 30.0]);
        let summary = summarize(&history);
        let target = TargetStrategy::Dynamic.resolve(&summary, &history, Percent(30.0));
        assert_abs_diff_eq!(target.unwrap().0, 300.0, epsilon = 1e-9);
    }

    #[test]
    fn test_provider_defers() {
        let history = history(&[50.0; 24]);
        let summary = summarize(&history);
        assert!(TargetStrategy::Provider.resolve(&summary, &history, Percent(30.0)).is_none());
    }
}
