use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::task::{Priority, Task};

/// Which subsequence of the collection to show. Filtering is purely a
/// display concern; hidden tasks stay in storage untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    All,
    Completed,
    Incomplete,
}

/// Presentation hint for long texts so they still fit; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeClass {
    Normal,
    Small,
    Xsmall,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayTask {
    pub id: u64,
    pub text: String,
    pub completed: bool,
    pub priority: Priority,
    pub size_class: SizeClass,
}

impl From<&Task> for DisplayTask {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id,
            text: task.text.clone(),
            completed: task.completed,
            priority: task.priority,
            size_class: size_class(&task.text),
        }
    }
}

pub fn size_class(text: &str) -> SizeClass {
    let len = text.chars().count();
    if len > 90 {
        SizeClass::Xsmall
    } else if len > 60 {
        SizeClass::Small
    } else {
        SizeClass::Normal
    }
}

/// Projects the collection in display order.
pub fn to_display_list(tasks: &[Task]) -> Vec<DisplayTask> {
    tasks.iter().map(DisplayTask::from).collect()
}

/// The subsequence of display tasks visible under `mode`.
pub fn filtered(tasks: &[Task], mode: ViewMode) -> Vec<DisplayTask> {
    tasks
        .iter()
        .filter(|task| match mode {
            ViewMode::All => true,
            ViewMode::Completed => task.completed,
            ViewMode::Incomplete => !task.completed,
        })
        .map(DisplayTask::from)
        .collect()
}

/// `(remaining, total)` for the count line.
pub fn remaining_count(tasks: &[Task]) -> (usize, usize) {
    let total = tasks.len();
    let remaining = tasks.iter().filter(|t| !t.completed).count();
    (remaining, total)
}

pub fn is_empty(tasks: &[Task]) -> bool {
    tasks.is_empty()
}

/// Rounded completion percentage; 0 for an empty collection.
pub fn progress_percent(tasks: &[Task]) -> u8 {
    let total = tasks.len();
    if total == 0 {
        return 0;
    }
    let completed = tasks.iter().filter(|t| t.completed).count();
    ((100.0 * completed as f64 / total as f64).round()) as u8
}
