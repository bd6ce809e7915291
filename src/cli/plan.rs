use clap::Parser;

use crate::{
    cli::input::{ConfigArgs, QueueArgs, SnapshotArgs},
    core::planner::Planner,
    prelude::*,
    tables::build_plans_table,
};

#[derive(Parser)]
pub struct PlanArgs {
    #[clap(flatten)]
    config: ConfigArgs,

    #[clap(flatten)]
    snapshot: SnapshotArgs,

    #[clap(flatten)]
    queue: QueueArgs,

    /// Do not write the queue (dry run).
    #[clap(long)]
    dry_run: bool,
}

impl PlanArgs {
    #[instrument(skip_all)]
    pub fn run(self) -> Result {
        let config = self.config.load()?;
        let snapshot = self.snapshot.load()?;
        let plans = Planner::builder().config(&config).snapshot(&snapshot).build().plan();
        println!("{}", build_plans_table(&plans));
        if self.dry_run {
            info!(n_plans = plans.len(), "dry run, not queueing");
        } else {
            self.queue.write(&plans)?;
        }
        Ok(())
    }
}
