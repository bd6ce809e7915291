//! Conversions between a commitment and the on-demand spend it covers.

use crate::quantity::{cost::Cost, percent::Percent, rate::HourlyRate};

/// On-demand-equivalent spend covered by the hourly commitment.
///
/// A commitment of `$1/h` at 30% savings covers `$1.43/h` of on-demand usage.
/// Savings of 100% or more are meaningless and leave the commitment as is.
#[must_use]
pub fn coverage_from_commitment(commitment: HourlyRate, savings: Percent) -> HourlyRate {
    if savings >= Percent::HUNDRED {
        return commitment;
    }
    commitment / (1.0 - savings.to_ratio())
}

/// Hourly commitment needed to cover the on-demand-equivalent spend.
#[must_use]
pub fn commitment_from_coverage(coverage: HourlyRate, savings: Percent) -> HourlyRate {
    coverage * (1.0 - savings.to_ratio())
}

/// Savings achieved by the actually used commitment relative to the on-demand price.
#[must_use]
pub fn calculate_savings_percentage(on_demand: Cost, used_commitment: Cost) -> Percent {
    relative_savings(on_demand, used_commitment)
}

/// Same as [`calculate_savings_percentage`], but against the total commitment including
/// the unused part, so that waste lowers the rate.
#[must_use]
pub fn calculate_effective_savings_rate(on_demand: Cost, total_commitment: Cost) -> Percent {
    relative_savings(on_demand, total_commitment)
}

fn relative_savings(on_demand: Cost, paid: Cost) -> Percent {
    if on_demand <= Cost::ZERO {
        return Percent::ZERO;
    }
    Percent::from_ratio((on_demand - paid) / on_demand)
}
