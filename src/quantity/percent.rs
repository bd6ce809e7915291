quantity!(
    /// Percentage points, `100.0` being the whole.
    ///
    /// Normalised coverage may legitimately exceed a hundred.
    Percent, suffix: "%", precision: 2
);

impl Percent {
    pub const HUNDRED: Self = Self(100.0);

    /// Convert the percentage into a ratio, `1.0` being the whole.
    #[must_use]
    pub fn to_ratio(self) -> f64 {
        0.01 * self.0
    }

    #[must_use]
    pub fn from_ratio(ratio: f64) -> Self {
        Self(ratio * 100.0)
    }

    /// Whether the value is a finite number within `0..=100`.
    #[must_use]
    pub fn is_proper(self) -> bool {
        self.0.is_finite() && (0.0..=100.0).contains(&self.0)
    }
}
