use anyhow::Result;
use chrono::Utc;
use vendo_core::config::VendoConfig;
use vendo_core::run::{self, RunLogSink};
use vendo_core::run_log::JsonlRunLog;

use super::create_spinner;
use crate::render::{render_action, render_plan, render_summary};

pub async fn run(config: &VendoConfig, dry_run: bool) -> Result<()> {
    let options = config.run_options(dry_run)?;
    let remote = &config.remote;
    let log = JsonlRunLog::new(config.log_dir()?);

    let spinner = create_spinner("Scheduling vendor tasks".to_string());
    let result = run::run(remote, remote, Some(&log as &dyn RunLogSink), &options, Utc::now()).await;
    spinner.finish_and_clear();
    let result = result?;

    println!("{}", render_plan(&result.plan, options.timezone));

    if !result.actions.is_empty() {
        println!();
        for action in &result.actions {
            println!("{}", render_action(action, options.timezone));
        }
    }

    println!("\n{}", render_summary(&result));
    Ok(())
}
