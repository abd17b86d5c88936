//! Core of vendo: turns `#vendo` tagged calendar events into a conflict-free
//! schedule inside working hours.
//!
//! - [`tags`] and [`task`] read tasks out of event descriptions
//! - [`busy`] indexes the time already taken on the monitored calendars
//! - [`scheduler`] places tasks around it
//! - [`color`] picks a status color per task
//! - [`run`] ties it together against any [`run::CalendarRead`] /
//!   [`run::CalendarWrite`] implementation, such as [`remote::Remote`]
//! - [`run_log`] persists each run as JSON lines

pub mod busy;
pub mod color;
pub mod config;
pub mod date_range;
pub mod error;
pub mod event;
pub mod remote;
pub mod run;
pub mod run_log;
pub mod scheduler;
pub mod tags;
pub mod task;

pub use error::{VendoError, VendoResult};
