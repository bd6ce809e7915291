use std::fmt::{Display, Formatter};

use crate::quantity::percent::Percent;

/// Tolerance for comparing coverage percentages.
///
/// Repeated halving accumulates rounding noise: a candidate landing within the tolerance
/// of the target still fits, and a gap within the tolerance is no gap.
pub const EPSILON: Percent = Percent(1e-9);

/// How much of the coverage gap to close in one purchasing cycle.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SplitStrategy {
    /// Close the whole gap, limited by the maximum purchase.
    OneShot,

    /// Close the gap in fixed steps.
    Linear { step: Percent },

    /// Halve the maximum purchase until it fits under the target.
    Dichotomy,
}

impl Display for SplitStrategy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OneShot => write!(f, "one_shot"),
            Self::Linear { .. } => write!(f, "linear"),
            Self::Dichotomy => write!(f, "dichotomy"),
        }
    }
}

/// Split strategy with its purchase limits.
///
/// Every call recomputes purely from the current coverage, so there is no state to lose
/// when a cycle gets interrupted.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Split {
    pub strategy: SplitStrategy,
    pub max_purchase: Percent,
    pub min_purchase: Percent,
}

impl Split {
    /// Purchase percentage for this cycle, [`Percent::ZERO`] meaning «nothing to buy».
    ///
    /// Both coverages are normalised to the minimum hourly spend.
    #[must_use]
    pub fn calculate(&self, current: Percent, target: Percent) -> Percent {
        let gap = target - current;
        if gap <= EPSILON {
            return Percent::ZERO;
        }
        if gap < self.min_purchase {
            // Anything smaller than the exact gap would leave an unbuyable remainder:
            return gap;
        }
        match self.strategy {
            SplitStrategy::OneShot => gap.min(self.max_purchase),
            SplitStrategy::Linear { step } => gap.min(step).min(self.max_purchase),
            SplitStrategy::Dichotomy => self.dichotomy(gap),
        }
    }

    fn dichotomy(&self, gap: Percent) -> Percent {
        let mut candidate = self.max_purchase;
        while candidate > gap + EPSILON {
            candidate = candidate / 2.0;
            if candidate < self.min_purchase {
                return gap;
            }
        }
        let residual = gap - candidate;
        if residual > EPSILON && residual < self.min_purchase {
            // The next cycle could not close the remainder, take it now, within the limit:
            return gap.min(self.max_purchase);
        }
        candidate.min(gap)
    }
}
