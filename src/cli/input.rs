use std::{fs, path::PathBuf};

use clap::Parser;

use crate::{config::StrategyConfig, core::plan::PurchasePlan, prelude::*, snapshot::Snapshot};

#[derive(Parser)]
pub struct ConfigArgs {
    /// Strategy configuration in TOML.
    #[clap(long = "config", env = "PLANNER_CONFIG", default_value = "planner.toml")]
    config_path: PathBuf,
}

impl ConfigArgs {
    pub fn load(&self) -> Result<StrategyConfig> {
        StrategyConfig::read_from(&self.config_path)
    }
}

#[derive(Parser)]
pub struct SnapshotArgs {
    /// Usage snapshot in JSON, as captured from the billing collaborators.
    #[clap(long = "snapshot", env = "PLANNER_SNAPSHOT")]
    snapshot_path: PathBuf,
}

impl SnapshotArgs {
    pub fn load(&self) -> Result<Snapshot> {
        Snapshot::read_from(&self.snapshot_path)
    }
}

/// Purchase queue in JSON.
#[derive(Parser)]
pub struct QueueArgs {
    #[clap(long = "queue", env = "PLANNER_QUEUE", default_value = "queue.json")]
    queue_path: PathBuf,
}

impl QueueArgs {
    pub fn read(&self) -> Result<Vec<PurchasePlan>> {
        let contents = fs::read_to_string(&self.queue_path)
            .with_context(|| format!("failed to read the queue from `{}`", self.queue_path.display()))?;
        let plans: Vec<PurchasePlan> = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse the queue `{}`", self.queue_path.display()))?;
        info!(n_plans = plans.len(), "read the queue");
        Ok(plans)
    }

    pub fn write(&self, plans: &[PurchasePlan]) -> Result {
        let contents = serde_json::to_string_pretty(plans)?;
        fs::write(&self.queue_path, contents)
            .with_context(|| format!("failed to write the queue to `{}`", self.queue_path.display()))?;
        info!(n_plans = plans.len(), path = %self.queue_path.display(), "queued");
        Ok(())
    }
}
