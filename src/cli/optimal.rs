use std::path::PathBuf;

use clap::Parser;

use crate::{
    core::{PlanType, coverage::CoverageAnalyzer, optimal::OptimalCoverageSearch},
    prelude::*,
    quantity::{percent::Percent, rate::HourlyRate},
    snapshot::Snapshot,
    tables::build_optimal_coverage_table,
};

#[derive(Parser)]
pub struct OptimalArgs {
    /// Savings Plan discount rate.
    #[clap(long = "discount-percent")]
    discount: Percent,

    /// Literal hourly costs, instead of a snapshot.
    #[clap(
        long,
        value_delimiter = ',',
        num_args = 1..,
        conflicts_with_all = ["snapshot_path", "plan_type"],
    )]
    costs: Vec<HourlyRate>,

    /// Usage snapshot in JSON.
    #[clap(long = "snapshot")]
    snapshot_path: Option<PathBuf>,

    /// Plan type to take the history of, when reading a snapshot.
    #[clap(long = "plan-type", requires = "snapshot_path")]
    plan_type: Option<PlanType>,

    /// Print the result as JSON.
    #[clap(long)]
    json: bool,
}

impl OptimalArgs {
    #[instrument(skip_all)]
    pub fn run(self) -> Result {
        ensure!(self.discount.is_proper(), "the discount must be within `[0, 100]`");
        ensure!(
            self.costs.iter().all(|cost| cost.0.is_finite()),
            "the hourly costs must be finite numbers",
        );

        let hourly_costs = if let Some(snapshot_path) = &self.snapshot_path {
            let plan_type = self.plan_type.context("`--plan-type` is required with a snapshot")?;
            let snapshot = Snapshot::read_from(snapshot_path)?;
            let history =
                snapshot.history(plan_type).with_context(|| format!("no history for `{plan_type}`"))?;
            CoverageAnalyzer::hourly_costs(history)
        } else {
            self.costs
        };

        let optimum = OptimalCoverageSearch::new(&hourly_costs, self.discount)
            .run()
            .context("no hourly costs to search over")?;
        info!(
            coverage_hourly = ?optimum.coverage_hourly,
            coverage_pct_of_max = ?optimum.coverage_pct_of_max,
            "found the optimal coverage",
        );
        if self.json {
            println!("{}", serde_json::to_string_pretty(&optimum)?);
        } else {
            println!("{}", build_optimal_coverage_table(&optimum));
        }
        Ok(())
    }
}
