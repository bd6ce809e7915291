use clap::Parser;

use crate::{
    cli::input::{ConfigArgs, QueueArgs, SnapshotArgs},
    core::{cap::CapEnforcer, planner::Planner},
    prelude::*,
    tables::build_plans_table,
};

#[derive(Parser)]
pub struct RecheckArgs {
    #[clap(flatten)]
    config: ConfigArgs,

    #[clap(flatten)]
    snapshot: SnapshotArgs,

    #[clap(flatten)]
    queue: QueueArgs,
}

impl RecheckArgs {
    #[instrument(skip_all)]
    pub fn run(self) -> Result {
        let config = self.config.load()?;
        let snapshot = self.snapshot.load()?;
        let plans = self.queue.read()?;
        let n_queued = plans.len();

        let live_coverage =
            Planner::builder().config(&config).snapshot(&snapshot).build().live_coverage();
        let plans = CapEnforcer::new(config.cap).retain_executable(plans, &live_coverage);
        info!(n_queued, n_executable = plans.len(), "re-checked");

        println!("{}", build_plans_table(&plans));
        self.queue.write(&plans)
    }
}
