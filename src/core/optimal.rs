use itertools::Itertools;
use serde::Serialize;

use crate::{
    prelude::*,
    quantity::{cost::Cost, percent::Percent, rate::HourlyRate},
};

/// Number of evenly spaced candidate levels between the minimum and maximum cost, inclusive.
const N_LEVELS: usize = 101;

#[must_use]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Percentiles {
    pub p50: Percent,
    pub p75: Percent,
    pub p90: Percent,
}

/// The coverage level maximising the net savings over a cost history.
#[must_use]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OptimalCoverage {
    /// Hourly on-demand-equivalent spend to cover.
    pub coverage_hourly: HourlyRate,

    pub coverage_pct_of_max: Percent,

    /// Savings over the whole history compared to paying everything on demand.
    pub max_net_savings: Cost,

    /// Always-safe level, for comparison.
    pub min_hourly: HourlyRate,

    /// Savings achievable when covering only [`OptimalCoverage::min_hourly`].
    pub min_hourly_net_savings: Cost,

    /// Cost distribution as percentages of the maximum cost.
    pub percentiles: Percentiles,
}

/// Single-peak search over the commitment level.
///
/// At level `L`, the commitment `L × (1 − d) × N` is always paid, while everything
/// above `L` spills over at the on-demand rate.
pub struct OptimalCoverageSearch<'a> {
    hourly_costs: &'a [HourlyRate],
    discount: Percent,
}

impl<'a> OptimalCoverageSearch<'a> {
    pub const fn new(hourly_costs: &'a [HourlyRate], discount: Percent) -> Self {
        Self { hourly_costs, discount }
    }

    /// # Returns
    ///
    /// - [`Some`] [`OptimalCoverage`] for a non-empty history.
    /// - [`None`] for an empty history.
    #[instrument(skip_all, fields(n_costs = self.hourly_costs.len(), discount = ?self.discount))]
    pub fn run(&self) -> Option<OptimalCoverage> {
        let (min_hourly, max_hourly) =
            self.hourly_costs.iter().copied().minmax().into_option()?;
        let percentiles = self.percentiles(max_hourly);

        if min_hourly == max_hourly {
            debug!(?min_hourly, "constant costs, skipping the search");
            let net_savings = self.net_savings(min_hourly);
            return Some(OptimalCoverage {
                coverage_hourly: min_hourly,
                coverage_pct_of_max: Percent::HUNDRED,
                max_net_savings: net_savings,
                min_hourly,
                min_hourly_net_savings: net_savings,
                percentiles,
            });
        }

        #[expect(clippy::cast_precision_loss)]
        let step = (max_hourly - min_hourly) / (N_LEVELS - 1) as f64;
        #[expect(clippy::cast_precision_loss)]
        let (coverage_hourly, max_net_savings) = (0..N_LEVELS)
            .map(|index| {
                // Hit the maximum exactly, regardless of the accumulated rounding:
                if index == N_LEVELS - 1 { max_hourly } else { min_hourly + step * index as f64 }
            })
            .map(|level| (level, self.net_savings(level)))
            .min_by_key(|(_, net_savings)| -*net_savings)?;

        let result = OptimalCoverage {
            coverage_hourly,
            coverage_pct_of_max: Self::pct_of_max(coverage_hourly, max_hourly),
            max_net_savings,
            min_hourly,
            min_hourly_net_savings: self.net_savings(min_hourly),
            percentiles,
        };
        debug!(
            ?result.coverage_hourly,
            ?result.coverage_pct_of_max,
            ?result.max_net_savings,
            ?result.min_hourly_net_savings,
            "found the optimum",
        );
        Some(result)
    }

    /// Net savings of committing to the level, compared to paying everything on demand.
    fn net_savings(&self, level: HourlyRate) -> Cost {
        // Each cost is spent over one hour, so the sums are the costs:
        let on_demand_cost = Cost(self.hourly_costs.iter().map(|cost| cost.0).sum());
        let spillover_cost = Cost(
            self.hourly_costs.iter().map(|cost| (*cost - level).max(HourlyRate::ZERO).0).sum(),
        );
        let commitment_cost =
            level * (1.0 - self.discount.to_ratio()) * self.hourly_costs.len();
        on_demand_cost - (commitment_cost + spillover_cost)
    }

    fn percentiles(&self, max_hourly: HourlyRate) -> Percentiles {
        let sorted = self.hourly_costs.iter().copied().sorted_unstable().collect_vec();
        let percentile = |rank: f64| Self::pct_of_max(interpolate(&sorted, rank), max_hourly);
        Percentiles { p50: percentile(0.50), p75: percentile(0.75), p90: percentile(0.90) }
    }

    fn pct_of_max(level: HourlyRate, max_hourly: HourlyRate) -> Percent {
        if max_hourly > HourlyRate::ZERO {
            Percent::from_ratio(level / max_hourly)
        } else {
            Percent::HUNDRED
        }
    }
}

/// Linear interpolation between the closest ranks of the sorted non-empty values.
#[expect(clippy::cast_precision_loss)]
#[expect(clippy::cast_possible_truncation)]
#[expect(clippy::cast_sign_loss)]
fn interpolate(sorted: &[HourlyRate], rank: f64) -> HourlyRate {
    let position = rank * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    sorted[lower] + (sorted[upper] - sorted[lower]) * (position - lower as f64)
}
