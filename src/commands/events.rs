use anyhow::{Context, Result};
use chrono::Utc;
use vendo_core::config::VendoConfig;
use vendo_core::date_range::DateRange;
use vendo_core::run::CalendarRead;

use super::create_spinner;
use crate::render::Render;

pub async fn run(config: &VendoConfig, calendar_id: &str, days: u32) -> Result<()> {
    let range = DateRange::upcoming(Utc::now(), days)?;

    let spinner = create_spinner(format!("Reading {calendar_id}"));
    let result = config.remote.list_events(calendar_id, &range).await;
    spinner.finish_and_clear();
    let events = result.with_context(|| format!("Could not list events of {calendar_id}"))?;

    println!("Events: {}", events.len());
    for event in &events {
        println!("{}", event.render());
    }
    Ok(())
}
