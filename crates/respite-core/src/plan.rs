use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::datetime::date_key;

pub const SLOT_COUNT: usize = 5;

/// The five fixed daily time windows a task can be assigned to.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Slot {
    #[value(name = "morning1")]
    Morning1,
    #[value(name = "morning2")]
    Morning2,
    #[value(name = "afternoon1")]
    Afternoon1,
    #[value(name = "afternoon2")]
    Afternoon2,
    #[value(name = "evening")]
    Evening,
}

impl Slot {
    pub const ALL: [Slot; SLOT_COUNT] = [
        Slot::Morning1,
        Slot::Morning2,
        Slot::Afternoon1,
        Slot::Afternoon2,
        Slot::Evening,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Slot::Morning1 => "morning1",
            Slot::Morning2 => "morning2",
            Slot::Afternoon1 => "afternoon1",
            Slot::Afternoon2 => "afternoon2",
            Slot::Evening => "evening",
        }
    }

    pub fn window(self) -> &'static str {
        match self {
            Slot::Morning1 => "08:00 - 10:00",
            Slot::Morning2 => "10:00 - 12:00",
            Slot::Afternoon1 => "14:00 - 16:00",
            Slot::Afternoon2 => "16:00 - 18:00",
            Slot::Evening => "19:00 - 21:00",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A task name paired with its display emoji.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskChip {
    pub name: String,
    pub emoji: String,
}

impl TaskChip {
    pub fn new(name: &str, emoji: &str) -> Self {
        Self {
            name: name.to_string(),
            emoji: emoji.to_string(),
        }
    }
}

impl fmt::Display for TaskChip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.emoji, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub task: String,
    pub emoji: String,
    #[serde(default)]
    pub minutes: u64,
}

pub type DayRecord = BTreeMap<Slot, Assignment>;

/// All persisted planner state: one day record per ISO date key.
///
/// Serialized as a single JSON object; the whole blob is replaced on
/// every save.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlanBook {
    days: BTreeMap<String, DayRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayStats {
    pub total_minutes: u64,
    pub busy_slots: usize,
    pub efficiency: u8,
}

impl PlanBook {
    /// Overwrites whatever was in `(date, slot)` and resets its minutes.
    pub fn assign(&mut self, date: NaiveDate, slot: Slot, task: &str, emoji: &str) {
        let record = self.days.entry(date_key(date)).or_default();
        record.insert(
            slot,
            Assignment {
                task: task.to_string(),
                emoji: emoji.to_string(),
                minutes: 0,
            },
        );
    }

    pub fn day(&self, date: NaiveDate) -> Option<&DayRecord> {
        self.days.get(&date_key(date))
    }

    pub fn slot(&self, date: NaiveDate, slot: Slot) -> Option<&Assignment> {
        self.day(date).and_then(|record| record.get(&slot))
    }

    /// Adds `minutes` to every assignment in the day that carries `task`.
    ///
    /// Matching is by task name, not slot identity: a task assigned to two
    /// slots is credited twice. Returns how many slots matched.
    pub fn credit(&mut self, date: NaiveDate, task: &str, minutes: u64) -> usize {
        let Some(record) = self.days.get_mut(&date_key(date)) else {
            return 0;
        };

        let mut touched = 0;
        for assignment in record.values_mut() {
            if assignment.task == task {
                assignment.minutes += minutes;
                touched += 1;
            }
        }
        touched
    }

    /// Stored minutes for `task` on `date`, summed across matching slots.
    pub fn task_minutes(&self, date: NaiveDate, task: &str) -> u64 {
        self.day(date)
            .map(|record| {
                record
                    .values()
                    .filter(|assignment| assignment.task == task)
                    .map(|assignment| assignment.minutes)
                    .sum()
            })
            .unwrap_or(0)
    }

    pub fn stats(&self, date: NaiveDate) -> DayStats {
        let (total_minutes, busy_slots) = self
            .day(date)
            .map(|record| {
                let total = record.values().map(|a| a.minutes).sum();
                let busy = record.values().filter(|a| a.minutes > 0).count();
                (total, busy)
            })
            .unwrap_or((0, 0));

        let efficiency = ((busy_slots as f64 / SLOT_COUNT as f64) * 100.0).round() as u8;

        DayStats {
            total_minutes,
            busy_slots,
            efficiency,
        }
    }

    pub fn day_count(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}

const BUILTIN_PALETTE: [(&str, &str); 6] = [
    ("study", "📖"),
    ("exercise", "🏃"),
    ("reading", "📚"),
    ("coding", "💻"),
    ("rest", "😴"),
    ("play", "🎮"),
];

pub const FALLBACK_EMOJI: &str = "📝";

pub fn builtin_palette() -> Vec<TaskChip> {
    BUILTIN_PALETTE
        .iter()
        .map(|(name, emoji)| TaskChip::new(name, emoji))
        .collect()
}

/// Emoji for a task name: built-in palette first, then `extra` chips,
/// then the generic fallback.
pub fn emoji_for(task: &str, extra: &[TaskChip]) -> String {
    BUILTIN_PALETTE
        .iter()
        .find(|(name, _)| *name == task)
        .map(|(_, emoji)| emoji.to_string())
        .or_else(|| {
            extra
                .iter()
                .find(|chip| chip.name == task)
                .map(|chip| chip.emoji.clone())
        })
        .unwrap_or_else(|| FALLBACK_EMOJI.to_string())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{PlanBook, Slot, emoji_for};

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("valid date")
    }

    #[test]
    fn assign_overwrites_and_resets_minutes() {
        let mut book = PlanBook::default();
        let day = date("2026-02-10");

        book.assign(day, Slot::Morning1, "study", "📖");
        book.credit(day, "study", 30);
        assert_eq!(book.slot(day, Slot::Morning1).expect("assigned").minutes, 30);

        book.assign(day, Slot::Morning1, "coding", "💻");
        let assignment = book.slot(day, Slot::Morning1).expect("assigned");
        assert_eq!(assignment.task, "coding");
        assert_eq!(assignment.emoji, "💻");
        assert_eq!(assignment.minutes, 0);
    }

    #[test]
    fn credit_matches_by_name_across_slots() {
        let mut book = PlanBook::default();
        let day = date("2026-02-10");

        book.assign(day, Slot::Morning1, "study", "📖");
        book.assign(day, Slot::Evening, "study", "📖");
        book.assign(day, Slot::Afternoon1, "rest", "😴");

        let touched = book.credit(day, "study", 25);
        assert_eq!(touched, 2);
        assert_eq!(book.slot(day, Slot::Morning1).expect("assigned").minutes, 25);
        assert_eq!(book.slot(day, Slot::Evening).expect("assigned").minutes, 25);
        assert_eq!(book.slot(day, Slot::Afternoon1).expect("assigned").minutes, 0);
        assert_eq!(book.task_minutes(day, "study"), 50);
    }

    #[test]
    fn credit_on_other_date_touches_nothing() {
        let mut book = PlanBook::default();
        book.assign(date("2026-02-10"), Slot::Morning1, "study", "📖");

        assert_eq!(book.credit(date("2026-02-11"), "study", 10), 0);
        assert_eq!(
            book.slot(date("2026-02-10"), Slot::Morning1)
                .expect("assigned")
                .minutes,
            0
        );
    }

    #[test]
    fn stats_for_empty_and_full_days() {
        let mut book = PlanBook::default();
        let day = date("2026-02-12");

        let empty = book.stats(day);
        assert_eq!(empty.total_minutes, 0);
        assert_eq!(empty.busy_slots, 0);
        assert_eq!(empty.efficiency, 0);

        for slot in Slot::ALL {
            book.assign(day, slot, slot.key(), "📝");
            book.credit(day, slot.key(), 10);
        }

        let full = book.stats(day);
        assert_eq!(full.total_minutes, 50);
        assert_eq!(full.busy_slots, 5);
        assert_eq!(full.efficiency, 100);
    }

    #[test]
    fn stats_ignore_zero_minute_assignments() {
        let mut book = PlanBook::default();
        let day = date("2026-02-12");

        book.assign(day, Slot::Morning1, "study", "📖");
        book.assign(day, Slot::Morning2, "rest", "😴");
        book.credit(day, "study", 45);

        let stats = book.stats(day);
        assert_eq!(stats.total_minutes, 45);
        assert_eq!(stats.busy_slots, 1);
        assert_eq!(stats.efficiency, 20);
    }

    #[test]
    fn emoji_lookup_falls_back() {
        assert_eq!(emoji_for("study", &[]), "📖");
        assert_eq!(emoji_for("violin", &[]), "📝");
        let extra = vec![super::TaskChip::new("violin", "🎻")];
        assert_eq!(emoji_for("violin", &extra), "🎻");
    }

    #[test]
    fn plan_book_serializes_as_plain_object() {
        let mut book = PlanBook::default();
        book.assign(date("2026-02-10"), Slot::Morning1, "study", "📖");

        let text = serde_json::to_string(&book).expect("serialize");
        assert!(text.starts_with("{\"2026-02-10\""));
        assert!(text.contains("\"morning1\""));

        let back: PlanBook = serde_json::from_str(&text).expect("deserialize");
        assert_eq!(back, book);
    }
}
