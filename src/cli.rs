mod input;
mod optimal;
mod plan;
mod recheck;

use clap::{Parser, Subcommand};

use crate::{
    cli::{optimal::OptimalArgs, plan::PlanArgs, recheck::RecheckArgs},
    prelude::*,
};

#[derive(Parser)]
#[command(author, version, about, propagate_version = true)]
#[must_use]
pub struct Args {
    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn run(self) -> Result {
        match self.command {
            Command::Plan(args) => args.run(),
            Command::Recheck(args) => args.run(),
            Command::Optimal(args) => args.run(),
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Main command: plan the purchases for the current cycle and queue them.
    #[clap(name = "plan")]
    Plan(Box<PlanArgs>),

    /// Re-check the queued plans against the cap right before the execution.
    #[clap(name = "recheck")]
    Recheck(Box<RecheckArgs>),

    /// Find the coverage level maximising the net savings over a cost history.
    #[clap(name = "optimal")]
    Optimal(Box<OptimalArgs>),
}
