use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::core::PlanningError;

/// Savings Plan family.
#[derive(
    Debug,
    Hash,
    Ord,
    PartialOrd,
    Serialize,
    Deserialize,
    clap::ValueEnum,
    enumset::EnumSetType,
)]
#[serde(rename_all = "snake_case")]
pub enum PlanType {
    /// EC2, Fargate and Lambda usage.
    Compute,

    /// Managed database usage.
    Database,

    /// `SageMaker` usage.
    #[serde(rename = "sagemaker")]
    #[value(name = "sagemaker")]
    SageMaker,
}

impl Display for PlanType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Compute => write!(f, "compute"),
            Self::Database => write!(f, "database"),
            Self::SageMaker => write!(f, "sagemaker"),
        }
    }
}

impl FromStr for PlanType {
    type Err = PlanningError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "compute" => Ok(Self::Compute),
            "database" => Ok(Self::Database),
            "sagemaker" => Ok(Self::SageMaker),
            _ => Err(PlanningError::configuration(format!(
                "unknown plan type `{name}`, expected `compute`, `database` or `sagemaker`",
            ))),
        }
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Term {
    #[default]
    OneYear,
    ThreeYear,
}

impl Display for Term {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OneYear => write!(f, "ONE_YEAR"),
            Self::ThreeYear => write!(f, "THREE_YEAR"),
        }
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentOption {
    #[default]
    NoUpfront,
    PartialUpfront,
    AllUpfront,
}

impl Display for PaymentOption {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoUpfront => write!(f, "NO_UPFRONT"),
            Self::PartialUpfront => write!(f, "PARTIAL_UPFRONT"),
            Self::AllUpfront => write!(f, "ALL_UPFRONT"),
        }
    }
}
