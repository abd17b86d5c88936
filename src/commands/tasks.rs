use anyhow::Result;
use chrono::Utc;
use owo_colors::OwoColorize;
use vendo_core::color::TaskColor;
use vendo_core::config::VendoConfig;
use vendo_core::run;

use super::create_spinner;
use crate::render::{render_skipped, render_task};

pub async fn run(config: &VendoConfig) -> Result<()> {
    let options = config.run_options(true)?;

    let spinner = create_spinner(format!("Reading {}", config.calendar_id));
    let mut trace = Vec::new();
    let inputs = run::gather(&config.remote, &options, Utc::now(), &mut trace).await;
    spinner.finish_and_clear();
    let inputs = inputs?;

    if let Some(warning) = render_skipped(&inputs.skipped) {
        println!("{warning}\n");
    }

    if inputs.tasks.is_empty() {
        println!("{}", "No vendor tasks".dimmed());
        return Ok(());
    }

    for task in &inputs.tasks {
        let color = TaskColor::classify(task, inputs.today);
        println!("{}", render_task(task, color, options.timezone));
    }
    Ok(())
}
