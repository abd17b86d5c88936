pub mod calendars;
pub mod events;
pub mod plan;
pub mod run;
pub mod tasks;

pub use crate::utils::tui::create_spinner;
