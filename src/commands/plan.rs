use anyhow::Result;
use chrono::Utc;
use vendo_core::config::VendoConfig;
use vendo_core::run::{self, Plan};

use super::create_spinner;
use crate::render::{render_plan, render_skipped};

pub async fn run(config: &VendoConfig) -> Result<()> {
    let options = config.run_options(true)?;
    let remote = &config.remote;
    let now = Utc::now();

    let spinner = create_spinner("Reading calendars".to_string());
    let mut trace = Vec::new();
    let inputs = run::gather(remote, &options, now, &mut trace).await;
    spinner.finish_and_clear();

    let inputs = inputs?;

    if let Some(warning) = render_skipped(&inputs.skipped) {
        println!("{warning}\n");
    }

    let schedule = run::plan(&inputs, &options, now)?;
    println!("{}", render_plan(&Plan::from(&schedule), options.timezone));

    for step in &schedule.trace {
        tracing::debug!("{step}");
    }
    Ok(())
}
