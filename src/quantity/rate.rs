use std::ops::Mul;

use crate::quantity::cost::Cost;

quantity!(
    /// Spend or commitment per hour, in the billing currency.
    HourlyRate, suffix: "/h", precision: 3
);

impl HourlyRate {
    /// Round the rate to the commitment granularity accepted by the purchase API.
    #[must_use]
    pub fn round_to_commitment(self) -> Self {
        Self((self.0 * 1000.0).round() / 1000.0)
    }
}

/// Rate times the number of hours.
impl Mul<usize> for HourlyRate {
    type Output = Cost;

    #[expect(clippy::cast_precision_loss)]
    fn mul(self, n_hours: usize) -> Self::Output {
        Cost(self.0 * n_hours as f64)
    }
}
