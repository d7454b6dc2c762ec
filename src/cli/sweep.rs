//! Sweep command implementation

use crate::config::Config;
use crate::continuity::ContinuityTracker;
use crate::store::{JsonFileStore, MAX_WINDOW_HOURS};
use anyhow::Context;
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub struct SweepArgs {
    /// Signal store file
    #[arg(long)]
    pub store: Option<PathBuf>,

    /// Also deactivate signals not re-detected within this many hours
    #[arg(long, value_parser = clap::value_parser!(i64).range(0..=MAX_WINDOW_HOURS))]
    pub hours: Option<i64>,
}

impl SweepArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let store_path = self.store.as_ref().unwrap_or(&config.store.path);
        let store = JsonFileStore::open(store_path)
            .await
            .with_context(|| format!("Failed to open signal store {}", store_path.display()))?;
        let tracker = ContinuityTracker::new(Arc::new(store), config.continuity.clone());

        let hours = self.hours.unwrap_or(config.continuity.stale_hours);
        let deactivated = tracker.mark_stale(hours).await?;
        println!("Deactivated {} signal(s)", deactivated);
        Ok(())
    }
}
