//! Strategy configuration: parsed and validated in one pass before any planning starts.

use std::{collections::BTreeMap, fs, path::Path};

use chrono::TimeDelta;
use enumset::EnumSet;
use serde::Deserialize;

use crate::{
    core::{
        PaymentOption,
        PlanType,
        PlanningError,
        Term,
        split::{Split, SplitStrategy},
        target::TargetStrategy,
    },
    prelude::*,
    quantity::{percent::Percent, rate::HourlyRate},
};

/// Longest commitment term, in days.
const MAX_RENEWAL_WINDOW_DAYS: i64 = 3 * 366;

/// Immutable, validated planning configuration.
#[must_use]
#[derive(Clone, Debug)]
pub struct StrategyConfig {
    pub target: TargetStrategy,
    pub split: Split,

    /// Absolute ceiling on the normalised coverage.
    pub cap: Percent,

    /// Smaller purchases are not worth placing.
    pub min_commitment: HourlyRate,

    /// Commitments ending within the window are re-bought.
    pub renewal_window: TimeDelta,

    pub plans: BTreeMap<PlanType, PlanConfig>,
}

#[must_use]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PlanConfig {
    pub term: Term,
    pub payment_option: PaymentOption,

    /// Discount rate, when known upfront. Otherwise, derived from the historical utilisation.
    pub savings: Option<Percent>,
}

impl StrategyConfig {
    pub fn read_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read the configuration from `{}`", path.display()))?;
        let config = contents
            .parse::<Self>()
            .with_context(|| format!("failed to load the configuration `{}`", path.display()))?;
        info!(
            target_strategy = %config.target,
            split_strategy = %config.split.strategy,
            cap = ?config.cap,
            enabled = ?config.enabled().iter().collect::<Vec<_>>(),
            "loaded the configuration",
        );
        Ok(config)
    }

    pub fn enabled(&self) -> EnumSet<PlanType> {
        self.plans.keys().copied().collect()
    }
}

impl std::str::FromStr for StrategyConfig {
    type Err = PlanningError;

    fn from_str(contents: &str) -> Result<Self, Self::Err> {
        toml::from_str::<RawConfig>(contents)
            .map_err(|error| PlanningError::configuration(error.to_string()))?
            .validate()
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default = "RawConfig::default_cap_percent")]
    cap_percent: f64,

    #[serde(default = "RawConfig::default_min_commitment_per_plan")]
    min_commitment_per_plan: f64,

    #[serde(default)]
    renewal_window_days: i64,

    target: RawTarget,
    split: RawSplit,

    #[serde(default)]
    plans: BTreeMap<String, RawPlan>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTarget {
    strategy: String,
    percent: Option<f64>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSplit {
    strategy: String,

    #[serde(default = "RawSplit::default_max_purchase_percent")]
    max_purchase_percent: f64,

    #[serde(default = "RawSplit::default_min_purchase_percent")]
    min_purchase_percent: f64,

    linear_step_percent: Option<f64>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPlan {
    #[serde(default = "RawPlan::default_enabled")]
    enabled: bool,

    #[serde(default)]
    term: Term,

    #[serde(default)]
    payment_option: PaymentOption,

    savings_percent: Option<f64>,
}

impl RawConfig {
    const fn default_cap_percent() -> f64 {
        100.0
    }

    const fn default_min_commitment_per_plan() -> f64 {
        0.001
    }

    fn validate(self) -> Result<StrategyConfig, PlanningError> {
        let cap = proper_percent("cap_percent", self.cap_percent)?;

        if !self.min_commitment_per_plan.is_finite() || self.min_commitment_per_plan < 0.0 {
            return Err(PlanningError::configuration(format!(
                "`min_commitment_per_plan` must be non-negative, got {}",
                self.min_commitment_per_plan,
            )));
        }
        if !(0..=MAX_RENEWAL_WINDOW_DAYS).contains(&self.renewal_window_days) {
            return Err(PlanningError::configuration(format!(
                "`renewal_window_days` must be within `[0, {MAX_RENEWAL_WINDOW_DAYS}]`, got {}",
                self.renewal_window_days,
            )));
        }
        let renewal_window = TimeDelta::try_days(self.renewal_window_days).ok_or_else(|| {
            PlanningError::configuration("`renewal_window_days` is out of range")
        })?;

        let mut plans = BTreeMap::new();
        for (name, plan) in self.plans {
            let plan_type = name.parse::<PlanType>()?;
            if plan.enabled {
                plans.insert(plan_type, plan.validate(plan_type)?);
            }
        }
        if plans.is_empty() {
            return Err(PlanningError::configuration("no plan type is enabled"));
        }

        Ok(StrategyConfig {
            target: self.target.validate()?,
            split: self.split.validate()?,
            cap,
            min_commitment: HourlyRate(self.min_commitment_per_plan),
            renewal_window,
            plans,
        })
    }
}

impl RawTarget {
    fn validate(self) -> Result<TargetStrategy, PlanningError> {
        match self.strategy.as_str() {
            "fixed" => {
                let percent = self.percent.ok_or_else(|| {
                    PlanningError::configuration("`fixed` target strategy requires `percent`")
                })?;
                Ok(TargetStrategy::Fixed { target: proper_percent("target.percent", percent)? })
            }
            "dynamic" => Ok(TargetStrategy::Dynamic),
            "provider" => Ok(TargetStrategy::Provider),
            strategy => Err(PlanningError::configuration(format!(
                "unknown target strategy `{strategy}`, expected `fixed`, `dynamic` or `provider`",
            ))),
        }
    }
}

impl RawSplit {
    const fn default_max_purchase_percent() -> f64 {
        50.0
    }

    const fn default_min_purchase_percent() -> f64 {
        1.0
    }

    fn validate(self) -> Result<Split, PlanningError> {
        let max_purchase = proper_percent("split.max_purchase_percent", self.max_purchase_percent)?;
        let min_purchase = proper_percent("split.min_purchase_percent", self.min_purchase_percent)?;
        if min_purchase >= max_purchase {
            return Err(PlanningError::configuration(format!(
                "`split.min_purchase_percent` ({min_purchase}) must be less than `split.max_purchase_percent` ({max_purchase})",
            )));
        }
        let strategy = match self.strategy.as_str() {
            "one_shot" => SplitStrategy::OneShot,
            "linear" => {
                let step = self.linear_step_percent.ok_or_else(|| {
                    PlanningError::configuration("`linear` split strategy requires `linear_step_percent`")
                })?;
                let step = proper_percent("split.linear_step_percent", step)?;
                if step <= Percent::ZERO || step > max_purchase {
                    return Err(PlanningError::configuration(format!(
                        "`split.linear_step_percent` must be within `(0, {max_purchase}]`, got {step}",
                    )));
                }
                SplitStrategy::Linear { step }
            }
            "dichotomy" => SplitStrategy::Dichotomy,
            strategy => {
                return Err(PlanningError::configuration(format!(
                    "unknown split strategy `{strategy}`, expected `one_shot`, `linear` or `dichotomy`",
                )));
            }
        };
        Ok(Split { strategy, max_purchase, min_purchase })
    }
}

impl RawPlan {
    const fn default_enabled() -> bool {
        true
    }

    fn validate(self, plan_type: PlanType) -> Result<PlanConfig, PlanningError> {
        let savings = self
            .savings_percent
            .map(|savings| {
                let savings = Percent(savings);
                if savings.is_proper() && savings < Percent::HUNDRED {
                    Ok(savings)
                } else {
                    Err(PlanningError::configuration(format!(
                        "`plans.{plan_type}.savings_percent` must be within `[0, 100)`, got {savings}",
                    )))
                }
            })
            .transpose()?;
        Ok(PlanConfig { term: self.term, payment_option: self.payment_option, savings })
    }
}

fn proper_percent(name: &str, value: f64) -> Result<Percent, PlanningError> {
    let percent = Percent(value);
    if percent.is_proper() {
        Ok(percent)
    } else {
        Err(PlanningError::configuration(format!(
            "`{name}` must be within `[0, 100]`, got {value}",
        )))
    }
}
