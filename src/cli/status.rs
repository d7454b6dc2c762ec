//! Status command implementation

use super::output::{print_json, print_signal_table, OutputFormat};
use crate::config::Config;
use crate::signal::Signal;
use crate::store::{JsonFileStore, SignalStore};
use anyhow::Context;
use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Signal store file
    #[arg(long)]
    pub store: Option<PathBuf>,

    /// Active signals to list
    #[arg(long, default_value = "10")]
    pub top: usize,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

impl StatusArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let store_path = self.store.as_ref().unwrap_or(&config.store.path);
        let store = JsonFileStore::open(store_path)
            .await
            .with_context(|| format!("Failed to open signal store {}", store_path.display()))?;

        let all = store.list_signals(false).await?;
        let total = all.len();
        let top = top_active(all, self.top);
        let active = top.active;

        match self.format {
            OutputFormat::Json => print_json(&serde_json::json!({
                "store": store_path.display().to_string(),
                "active": active,
                "inactive": total - active,
                "top": top.signals,
            })),
            OutputFormat::Table => {
                println!("Store: {}", store_path.display());
                println!("  Active:   {}", active);
                println!("  Inactive: {}", total - active);
                println!();
                print_signal_table(&top.signals);
                Ok(())
            }
        }
    }
}

struct TopActive {
    active: usize,
    signals: Vec<Signal>,
}

/// Active signals ranked by score, then by how often they recurred
fn top_active(signals: Vec<Signal>, limit: usize) -> TopActive {
    let mut active: Vec<Signal> = signals.into_iter().filter(|s| s.is_active).collect();
    let count = active.len();
    active.sort_by(|a, b| {
        b.overall_score
            .cmp(&a.overall_score)
            .then_with(|| b.detection_count.cmp(&a.detection_count))
            .then_with(|| a.option_symbol.cmp(&b.option_symbol))
    });
    active.truncate(limit);
    TopActive {
        active: count,
        signals: active,
    }
}
