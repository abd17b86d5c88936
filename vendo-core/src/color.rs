//! Status colors for vendor tasks.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::task::Task;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskColor {
    Overdue,
    Done,
    Normal,
}

impl TaskColor {
    /// Done wins over overdue; a task due today is not overdue yet.
    pub fn classify(task: &Task, today: NaiveDate) -> TaskColor {
        if task.is_done {
            TaskColor::Done
        } else if task.due_date.is_some_and(|due| due < today) {
            TaskColor::Overdue
        } else {
            TaskColor::Normal
        }
    }
}

impl fmt::Display for TaskColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskColor::Overdue => "overdue",
            TaskColor::Done => "done",
            TaskColor::Normal => "normal",
        };
        write!(f, "{name}")
    }
}

/// Provider color ids for each status. Defaults are Google Calendar ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorPalette {
    pub overdue: String,
    pub done: String,
    pub normal: String,
}

impl Default for ColorPalette {
    fn default() -> Self {
        ColorPalette {
            overdue: "11".into(),
            done: "8".into(),
            normal: "5".into(),
        }
    }
}

impl ColorPalette {
    pub fn id(&self, color: TaskColor) -> &str {
        match color {
            TaskColor::Overdue => &self.overdue,
            TaskColor::Done => &self.done,
            TaskColor::Normal => &self.normal,
        }
    }

    /// Provider color id for a task on `today`.
    pub fn color_for(&self, task: &Task, today: NaiveDate) -> &str {
        self.id(TaskColor::classify(task, today))
    }
}
