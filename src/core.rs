pub mod cap;
pub mod commitment;
pub mod coverage;
mod error;
pub mod optimal;
pub mod plan;
mod plan_type;
pub mod planner;
pub mod split;
pub mod target;

pub use self::{
    error::PlanningError,
    plan_type::{PaymentOption, PlanType, Term},
};
