use anyhow::{Context, Result};
use vendo_core::config::VendoConfig;

use super::create_spinner;
use crate::render::Render;

pub async fn run(config: &VendoConfig) -> Result<()> {
    let provider = config.remote.provider.name();

    let spinner = create_spinner(format!("Asking {provider}"));
    let calendars = config.remote.list_calendars().await;
    spinner.finish_and_clear();

    for calendar in calendars.with_context(|| format!("Could not list calendars from {provider}"))? {
        println!("{}", calendar.render());
    }
    Ok(())
}
