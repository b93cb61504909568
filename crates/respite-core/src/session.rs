use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::plan::{self, TaskChip};

/// Transient planner state carried between invocations: the selected
/// task chip, the viewed date, the running timer, and user-added
/// palette chips. Persisted as a small side file next to the plan blob.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub selected: Option<TaskChip>,

    #[serde(default)]
    pub viewed: Option<NaiveDate>,

    #[serde(default)]
    pub timer: Option<TimerSession>,

    #[serde(default)]
    pub custom_tasks: Vec<TaskChip>,
}

/// A running timer. Exists only between start and pause/stop; elapsed
/// time is a wall-clock delta computed on read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerSession {
    pub task: TaskChip,
    pub started_at: DateTime<Utc>,
}

impl TimerSession {
    pub fn elapsed_secs(&self, now: DateTime<Utc>) -> u64 {
        now.signed_duration_since(self.started_at)
            .num_seconds()
            .max(0) as u64
    }
}

impl Session {
    pub fn viewed_date(&self, today: NaiveDate) -> NaiveDate {
        self.viewed.unwrap_or(today)
    }

    /// Built-in chips followed by user-added ones.
    pub fn palette(&self) -> Vec<TaskChip> {
        let mut chips = plan::builtin_palette();
        chips.extend(self.custom_tasks.iter().cloned());
        chips
    }

    pub fn emoji_for(&self, task: &str) -> String {
        plan::emoji_for(task, &self.custom_tasks)
    }

    /// Adds a custom chip with the fallback emoji. Returns false when a
    /// chip with that name already exists.
    pub fn add_custom_task(&mut self, name: &str) -> bool {
        if self.palette().iter().any(|chip| chip.name == name) {
            return false;
        }
        self.custom_tasks
            .push(TaskChip::new(name, plan::FALLBACK_EMOJI));
        true
    }
}
