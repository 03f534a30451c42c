use clap::ValueEnum;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    pub id: u64,

    pub text: String,

    #[serde(default)]
    pub completed: bool,

    #[serde(default)]
    pub priority: Priority,
}

impl Task {
    pub fn new(id: u64, text: String, priority: Priority) -> Self {
        Self {
            id,
            text,
            completed: false,
            priority,
        }
    }
}

/// One raw element of the persisted `todos` array. Older versions stored
/// bare strings, and records written before ids existed have no `id` field;
/// the store's normalization pass upgrades both shapes.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StoredEntry {
    Legacy(String),
    Record {
        #[serde(default)]
        id: Option<u64>,
        text: String,
        #[serde(default)]
        completed: bool,
        #[serde(default)]
        priority: Priority,
    },
}
