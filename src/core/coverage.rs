use average::Mean;
use bon::Builder;
use chrono::{DateTime, TimeDelta, Utc};
use itertools::Itertools;

use crate::{
    core::{PlanType, PlanningError, commitment::coverage_from_commitment},
    prelude::*,
    quantity::{percent::Percent, rate::HourlyRate},
    snapshot::History,
};

/// Coverage statistics of one plan type, derived anew on every run.
#[must_use]
#[derive(Copy, Clone, Debug)]
pub struct CoverageSummary {
    /// Covered share of the average spend.
    pub avg_coverage: Percent,

    pub avg_hourly_total: HourlyRate,
    pub avg_hourly_covered: HourlyRate,

    /// Lowest positive hourly spend, the always-safe commitment ceiling.
    pub min_hourly_total: HourlyRate,

    /// `avg_hourly_total / min_hourly_total`, or `1.0` when undefined.
    pub avg_to_min_ratio: f64,

    pub n_samples: usize,
}

impl CoverageSummary {
    /// Rescale a percentage of the average spend into a percentage of the minimum spend.
    ///
    /// Values above a hundred are expected and kept as is.
    pub fn normalize(&self, coverage: Percent) -> Percent {
        coverage * self.avg_to_min_ratio
    }

    /// Current coverage as a percentage of the minimum spend.
    pub fn current_coverage(&self) -> Percent {
        self.normalize(self.avg_coverage)
    }

    /// On-demand-equivalent hourly spend behind the normalised percentage.
    pub fn hourly_coverage(&self, coverage: Percent) -> HourlyRate {
        self.min_hourly_total * coverage.to_ratio()
    }

    /// Inverse of [`CoverageSummary::hourly_coverage`].
    pub fn normalized_percentage(&self, coverage: HourlyRate) -> Percent {
        Percent::from_ratio(coverage / self.min_hourly_total)
    }

    pub fn avg_hourly_uncovered(&self) -> HourlyRate {
        (self.avg_hourly_total - self.avg_hourly_covered).max(HourlyRate::ZERO)
    }
}

#[derive(Builder)]
pub struct CoverageAnalyzer {
    /// Snapshot time, the renewal window starts here.
    taken_at: DateTime<Utc>,

    /// Commitments ending within the window are treated as already gone.
    #[builder(default = TimeDelta::zero())]
    renewal_window: TimeDelta,
}

impl CoverageAnalyzer {
    #[instrument(skip_all, fields(plan_type = %plan_type))]
    pub fn analyze(
        &self,
        plan_type: PlanType,
        history: &History,
        savings: Percent,
    ) -> Result<CoverageSummary, PlanningError> {
        if history.samples.is_empty() {
            return Err(PlanningError::data_unavailable(plan_type, "no samples"));
        }
        let expiring_coverage = self.expiring_coverage(history, savings);
        let n_hours = history.granularity.n_hours();

        let (totals, covered): (Vec<_>, Vec<_>) = history
            .samples
            .iter()
            .map(|sample| {
                let total = HourlyRate(sample.total_spend.0 / n_hours);
                let covered = (HourlyRate(sample.covered_spend.0 / n_hours) - expiring_coverage)
                    .max(HourlyRate::ZERO)
                    .min(total.max(HourlyRate::ZERO));
                (total, covered)
            })
            .unzip();

        let avg_hourly_total = HourlyRate(totals.iter().map(|total| total.0).collect::<Mean>().mean());
        let avg_hourly_covered =
            HourlyRate(covered.iter().map(|covered| covered.0).collect::<Mean>().mean());
        let min_hourly_total = totals
            .iter()
            .copied()
            .filter(|total| *total > HourlyRate::ZERO)
            .min()
            .ok_or_else(|| PlanningError::data_unavailable(plan_type, "no positive spend"))?;

        let avg_to_min_ratio = avg_hourly_total / min_hourly_total;
        let avg_to_min_ratio =
            if avg_to_min_ratio.is_finite() && avg_to_min_ratio > 0.0 { avg_to_min_ratio } else { 1.0 };
        let avg_coverage = if avg_hourly_total > HourlyRate::ZERO {
            Percent::from_ratio(avg_hourly_covered / avg_hourly_total)
        } else {
            Percent::ZERO
        };

        let summary = CoverageSummary {
            avg_coverage,
            avg_hourly_total,
            avg_hourly_covered,
            min_hourly_total,
            avg_to_min_ratio,
            n_samples: totals.len(),
        };
        debug!(
            n_samples = summary.n_samples,
            avg_coverage = ?summary.avg_coverage,
            normalized = ?summary.current_coverage(),
            avg_hourly_total = ?summary.avg_hourly_total,
            min_hourly_total = ?summary.min_hourly_total,
            avg_to_min_ratio = summary.avg_to_min_ratio,
            ?expiring_coverage,
            "analyzed",
        );
        Ok(summary)
    }

    /// Hourly on-demand spend of each sample, as the optimal coverage search expects it.
    #[must_use]
    pub fn hourly_costs(history: &History) -> Vec<HourlyRate> {
        let n_hours = history.granularity.n_hours();
        history.samples.iter().map(|sample| HourlyRate(sample.total_spend.0 / n_hours)).collect_vec()
    }

    /// On-demand-equivalent coverage of the commitments due for renewal.
    fn expiring_coverage(&self, history: &History, savings: Percent) -> HourlyRate {
        // Beyond the representable range, everything expires within the window:
        let horizon = self.taken_at.checked_add_signed(self.renewal_window);
        history
            .expiring
            .iter()
            .filter(|commitment| horizon.is_none_or(|horizon| commitment.ends_at <= horizon))
            .map(|commitment| coverage_from_commitment(commitment.hourly_commitment, savings))
            .sum()
    }
}
