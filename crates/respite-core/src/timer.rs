//! Timer state transitions, kept free of I/O so they are testable on
//! their own: idle -> running (start), running -> idle (pause keeps the
//! selection, stop clears it). Elapsed whole minutes are credited to
//! every slot in the viewed day that carries the timed task's name.

use anyhow::anyhow;
use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, info};

use crate::plan::{PlanBook, TaskChip};
use crate::session::{Session, TimerSession};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PauseOutcome {
    pub task: TaskChip,
    pub elapsed_secs: u64,
    pub credited_minutes: u64,
    pub touched_slots: usize,
}

/// Starts a timer for the selected task. Rejected when nothing is
/// selected or a timer is already running.
pub fn start(session: &mut Session, now: DateTime<Utc>) -> anyhow::Result<TaskChip> {
    if let Some(timer) = &session.timer {
        return Err(anyhow!(
            "a timer is already running for '{}'; pause or stop it first",
            timer.task.name
        ));
    }

    let Some(task) = session.selected.clone() else {
        return Err(anyhow!("select a task before starting the timer"));
    };

    info!(task = %task.name, "starting timer");
    session.timer = Some(TimerSession {
        task: task.clone(),
        started_at: now,
    });

    Ok(task)
}

/// Folds the running timer into the viewed day's record and clears it.
/// Returns `None` when no timer is running.
pub fn pause(
    session: &mut Session,
    book: &mut PlanBook,
    viewed: NaiveDate,
    now: DateTime<Utc>,
) -> Option<PauseOutcome> {
    let timer = session.timer.take()?;

    let elapsed_secs = timer.elapsed_secs(now);
    let credited_minutes = elapsed_secs / 60;
    let touched_slots = book.credit(viewed, &timer.task.name, credited_minutes);

    debug!(
        task = %timer.task.name,
        elapsed_secs,
        credited_minutes,
        touched_slots,
        "paused timer"
    );

    Some(PauseOutcome {
        task: timer.task,
        elapsed_secs,
        credited_minutes,
        touched_slots,
    })
}

/// Pause semantics plus clearing the selection. The selection is
/// cleared even when no timer was running.
pub fn stop(
    session: &mut Session,
    book: &mut PlanBook,
    viewed: NaiveDate,
    now: DateTime<Utc>,
) -> Option<PauseOutcome> {
    let outcome = pause(session, book, viewed, now);
    session.selected = None;
    outcome
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate, TimeZone, Utc};

    use super::{pause, start, stop};
    use crate::plan::{PlanBook, Slot, TaskChip};
    use crate::session::Session;

    fn day() -> NaiveDate {
        NaiveDate::parse_from_str("2026-02-10", "%Y-%m-%d").expect("valid date")
    }

    fn now() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 10, 9, 0, 0)
            .single()
            .expect("valid now")
    }

    #[test]
    fn start_without_selection_is_rejected() {
        let mut session = Session::default();
        let err = start(&mut session, now()).expect_err("must reject");
        assert!(err.to_string().contains("select a task"));
        assert!(session.timer.is_none());
    }

    #[test]
    fn start_twice_is_rejected() {
        let mut session = Session {
            selected: Some(TaskChip::new("study", "📖")),
            ..Session::default()
        };

        start(&mut session, now()).expect("first start");
        let err = start(&mut session, now()).expect_err("second start must fail");
        assert!(err.to_string().contains("already running"));
    }

    #[test]
    fn pause_credits_whole_minutes_to_matching_slots() {
        let mut session = Session {
            selected: Some(TaskChip::new("study", "📖")),
            ..Session::default()
        };
        let mut book = PlanBook::default();
        book.assign(day(), Slot::Morning1, "study", "📖");
        book.assign(day(), Slot::Evening, "study", "📖");
        book.assign(day(), Slot::Morning2, "rest", "😴");

        start(&mut session, now()).expect("start");
        let outcome = pause(&mut session, &mut book, day(), now() + Duration::seconds(150))
            .expect("pause outcome");

        assert_eq!(outcome.elapsed_secs, 150);
        assert_eq!(outcome.credited_minutes, 2);
        assert_eq!(outcome.touched_slots, 2);
        assert_eq!(book.slot(day(), Slot::Morning1).expect("slot").minutes, 2);
        assert_eq!(book.slot(day(), Slot::Evening).expect("slot").minutes, 2);
        assert_eq!(book.slot(day(), Slot::Morning2).expect("slot").minutes, 0);
        assert!(session.timer.is_none());
        assert!(session.selected.is_some());
    }

    #[test]
    fn sub_minute_session_credits_nothing() {
        let mut session = Session {
            selected: Some(TaskChip::new("study", "📖")),
            ..Session::default()
        };
        let mut book = PlanBook::default();
        book.assign(day(), Slot::Morning1, "study", "📖");

        start(&mut session, now()).expect("start");
        let outcome = pause(&mut session, &mut book, day(), now() + Duration::seconds(59))
            .expect("pause outcome");

        assert_eq!(outcome.credited_minutes, 0);
        assert_eq!(book.slot(day(), Slot::Morning1).expect("slot").minutes, 0);
    }

    #[test]
    fn pause_when_idle_is_a_no_op() {
        let mut session = Session::default();
        let mut book = PlanBook::default();
        assert!(pause(&mut session, &mut book, day(), now()).is_none());
    }

    #[test]
    fn stop_clears_selection_even_when_idle() {
        let mut session = Session {
            selected: Some(TaskChip::new("study", "📖")),
            ..Session::default()
        };
        let mut book = PlanBook::default();

        assert!(stop(&mut session, &mut book, day(), now()).is_none());
        assert!(session.selected.is_none());
    }
}
