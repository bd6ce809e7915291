use std::collections::BTreeMap;

use crate::{
    core::{PlanType, plan::PurchasePlan, split::EPSILON},
    prelude::*,
    quantity::percent::Percent,
};

/// Absolute ceiling on the normalised coverage of any plan type.
///
/// Checked once while planning and once more right before the execution, since other
/// purchases may have landed in between. Exceeding the cap drops the plan, it is not an error.
#[derive(Copy, Clone, Debug)]
pub struct CapEnforcer {
    cap: Percent,
}

impl CapEnforcer {
    pub const fn new(cap: Percent) -> Self {
        Self { cap }
    }

    #[must_use]
    pub fn allows(&self, current: Percent, purchase: Percent) -> bool {
        current + purchase <= self.cap + EPSILON
    }

    /// Execution-time pass against the freshly recomputed live coverage.
    ///
    /// Plans are checked independently: a dropped plan does not affect its siblings.
    #[instrument(skip_all, fields(n_plans = plans.len(), cap = ?self.cap))]
    pub fn retain_executable(
        &self,
        plans: Vec<PurchasePlan>,
        live_coverage: &BTreeMap<PlanType, Percent>,
    ) -> Vec<PurchasePlan> {
        plans
            .into_iter()
            .filter(|plan| {
                let Some(current) = live_coverage.get(&plan.plan_type).copied() else {
                    warn!(
                        plan_type = %plan.plan_type,
                        token = %plan.idempotency_token,
                        "no live coverage, dropping the plan",
                    );
                    return false;
                };
                let is_allowed = self.allows(current, plan.purchase_percent);
                if !is_allowed {
                    info!(
                        plan_type = %plan.plan_type,
                        token = %plan.idempotency_token,
                        ?current,
                        purchase = ?plan.purchase_percent,
                        "would exceed the cap by now, dropping the plan",
                    );
                }
                is_allowed
            })
            .collect()
    }
}
