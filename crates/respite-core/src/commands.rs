use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::thread;

use anyhow::{Context, anyhow};
use chrono::{DateTime, Local, NaiveDate, Utc};
use tracing::{debug, info, instrument, warn};

use crate::cli::{Command, TasksCommand};
use crate::config::Config;
use crate::datastore::{self, DataStore};
use crate::datetime::{date_key, days_until, format_clock, format_minutes, parse_date_expr};
use crate::plan::{Slot, TaskChip};
use crate::render::Renderer;
use crate::timer;

#[instrument(skip(store, cfg, renderer, command))]
pub fn dispatch(
    store: &mut DataStore,
    cfg: &Config,
    renderer: &mut Renderer,
    command: Command,
) -> anyhow::Result<()> {
    let now = Utc::now();
    let today = Local::now().date_naive();

    debug!(?command, today = %date_key(today), "dispatching command");

    match command {
        Command::Assign { slot, task } => cmd_assign(store, renderer, slot, &task, today),
        Command::Select { task, slot } => cmd_select(store, task.as_deref(), slot, today),
        Command::Start => cmd_start(store, now),
        Command::Pause => cmd_pause(store, renderer, today, now),
        Command::Stop => cmd_stop(store, renderer, today, now),
        Command::Status => cmd_status(store, today, now),
        Command::Watch => cmd_watch(store, renderer, today),
        Command::Show => cmd_show(store, renderer, today),
        Command::Stats => cmd_stats(store, renderer, today),
        Command::Date { expr } => cmd_date(store, expr.as_deref(), today),
        Command::Countdown => cmd_countdown(cfg),
        Command::Tasks { action } => cmd_tasks(store, renderer, action),
        Command::Export { output } => cmd_export(store, output, today),
        Command::Import { path } => cmd_import(store, &path),
        Command::Clear { yes } => cmd_clear(store, yes),
    }
}

#[instrument(skip(store, renderer, task, today))]
fn cmd_assign(
    store: &mut DataStore,
    renderer: &mut Renderer,
    slot: Slot,
    task: &str,
    today: NaiveDate,
) -> anyhow::Result<()> {
    info!("command assign");

    let task = task.trim();
    if task.is_empty() {
        return Err(anyhow!("task name cannot be empty"));
    }

    let session = store.load_session()?;
    let mut book = store.load_plan()?;
    let viewed = session.viewed_date(today);
    let emoji = session.emoji_for(task);

    book.assign(viewed, slot, task, &emoji);
    store.save_plan(&book)?;

    println!(
        "Assigned {emoji} {task} to {} ({}) on {}.",
        slot.key(),
        slot.window(),
        date_key(viewed)
    );
    renderer.print_stats(viewed, &book.stats(viewed))?;
    Ok(())
}

#[instrument(skip(store, task, today))]
fn cmd_select(
    store: &mut DataStore,
    task: Option<&str>,
    slot: Option<Slot>,
    today: NaiveDate,
) -> anyhow::Result<()> {
    info!("command select");

    let mut session = store.load_session()?;
    let viewed = session.viewed_date(today);

    let chip = match (task, slot) {
        (Some(name), None) => {
            let name = name.trim();
            if name.is_empty() {
                return Err(anyhow!("task name cannot be empty"));
            }
            TaskChip {
                name: name.to_string(),
                emoji: session.emoji_for(name),
            }
        }
        (None, Some(slot)) => {
            let book = store.load_plan()?;
            let assignment = book.slot(viewed, slot).ok_or_else(|| {
                anyhow!(
                    "nothing is assigned to {} on {}; assign a task to this slot first",
                    slot.key(),
                    date_key(viewed)
                )
            })?;
            let chip = TaskChip {
                name: assignment.task.clone(),
                emoji: assignment.emoji.clone(),
            };
            println!(
                "Selected {chip} ({} so far on {}).",
                format_minutes(book.task_minutes(viewed, &chip.name)),
                date_key(viewed)
            );
            session.selected = Some(chip);
            store.save_session(&session)?;
            return Ok(());
        }
        _ => return Err(anyhow!("give a task name or --slot SLOT")),
    };

    println!("Selected {chip}.");
    session.selected = Some(chip);
    store.save_session(&session)?;
    Ok(())
}

#[instrument(skip(store, now))]
fn cmd_start(store: &mut DataStore, now: DateTime<Utc>) -> anyhow::Result<()> {
    info!("command start");

    let mut session = store.load_session()?;
    let task = timer::start(&mut session, now)?;
    store.save_session(&session)?;

    println!("Timer started for {task}.");
    Ok(())
}

#[instrument(skip(store, renderer, today, now))]
fn cmd_pause(
    store: &mut DataStore,
    renderer: &mut Renderer,
    today: NaiveDate,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command pause");

    let mut session = store.load_session()?;
    let mut book = store.load_plan()?;
    let viewed = session.viewed_date(today);

    let Some(outcome) = timer::pause(&mut session, &mut book, viewed, now) else {
        println!("No timer is running.");
        return Ok(());
    };

    store.save_plan(&book)?;
    store.save_session(&session)?;

    println!(
        "Paused {} after {} — {} credited across {} slot(s).",
        outcome.task,
        format_clock(outcome.elapsed_secs),
        format_minutes(outcome.credited_minutes),
        outcome.touched_slots
    );
    if outcome.touched_slots == 0 && outcome.credited_minutes > 0 {
        warn!(task = %outcome.task.name, "no matching slot; minutes dropped");
        println!(
            "Note: no slot on {} carries '{}'; the time was not recorded.",
            date_key(viewed),
            outcome.task.name
        );
    }

    renderer.print_stats(viewed, &book.stats(viewed))?;
    Ok(())
}

#[instrument(skip(store, renderer, today, now))]
fn cmd_stop(
    store: &mut DataStore,
    renderer: &mut Renderer,
    today: NaiveDate,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command stop");

    let mut session = store.load_session()?;
    let mut book = store.load_plan()?;
    let viewed = session.viewed_date(today);

    let outcome = timer::stop(&mut session, &mut book, viewed, now);
    store.save_plan(&book)?;
    store.save_session(&session)?;

    match outcome {
        Some(outcome) => {
            println!(
                "Stopped {} after {} — {} credited across {} slot(s). Selection cleared.",
                outcome.task,
                format_clock(outcome.elapsed_secs),
                format_minutes(outcome.credited_minutes),
                outcome.touched_slots
            );
            renderer.print_stats(viewed, &book.stats(viewed))?;
        }
        None => println!("No timer was running. Selection cleared."),
    }

    Ok(())
}

#[instrument(skip(store, today, now))]
fn cmd_status(store: &mut DataStore, today: NaiveDate, now: DateTime<Utc>) -> anyhow::Result<()> {
    info!("command status");

    let session = store.load_session()?;
    let book = store.load_plan()?;
    let viewed = session.viewed_date(today);

    match &session.selected {
        Some(chip) => println!("selected  {chip}"),
        None => println!("selected  -"),
    }

    match &session.timer {
        Some(timer) => println!(
            "timer     {} running for {}",
            format_clock(timer.elapsed_secs(now)),
            timer.task
        ),
        None => println!("timer     idle"),
    }

    if let Some(chip) = &session.selected {
        let mut minutes = book.task_minutes(viewed, &chip.name);
        if let Some(timer) = &session.timer
            && timer.task.name == chip.name
        {
            minutes += timer.elapsed_secs(now) / 60;
        }
        println!("today     {} on {}", format_minutes(minutes), date_key(viewed));
    }

    Ok(())
}

/// The interactive tick loop: repaints the running clock every second
/// and the day stats every sixty. Ends when the timer goes away
/// (paused or stopped from another invocation) or on Ctrl-C.
#[instrument(skip(store, renderer, today))]
fn cmd_watch(
    store: &mut DataStore,
    renderer: &mut Renderer,
    today: NaiveDate,
) -> anyhow::Result<()> {
    info!("command watch");

    let session = store.load_session()?;
    if session.timer.is_none() {
        println!("No timer is running.");
        return Ok(());
    }

    let mut out = io::stdout();
    let mut ticks: u64 = 0;

    loop {
        // Reload each tick so a pause from another terminal ends the loop.
        let session = store.load_session()?;
        let Some(timer) = &session.timer else {
            writeln!(out)?;
            println!("Timer is no longer running.");
            return Ok(());
        };

        let now = Utc::now();
        let book = store.load_plan()?;
        let viewed = session.viewed_date(today);
        let stored = book.task_minutes(viewed, &timer.task.name);
        let elapsed = timer.elapsed_secs(now);

        write!(
            out,
            "\r{} {}  ({} on {})   ",
            timer.task,
            format_clock(elapsed),
            format_minutes(stored + elapsed / 60),
            date_key(viewed)
        )?;
        out.flush()?;

        if ticks > 0 && ticks % 60 == 0 {
            writeln!(out)?;
            renderer.print_stats(viewed, &book.stats(viewed))?;
        }

        ticks += 1;
        thread::sleep(std::time::Duration::from_secs(1));
    }
}

#[instrument(skip(store, renderer, today))]
fn cmd_show(
    store: &mut DataStore,
    renderer: &mut Renderer,
    today: NaiveDate,
) -> anyhow::Result<()> {
    info!("command show");

    let session = store.load_session()?;
    let book = store.load_plan()?;
    let viewed = session.viewed_date(today);

    renderer.print_board(viewed, book.day(viewed))?;
    Ok(())
}

#[instrument(skip(store, renderer, today))]
fn cmd_stats(
    store: &mut DataStore,
    renderer: &mut Renderer,
    today: NaiveDate,
) -> anyhow::Result<()> {
    info!("command stats");

    let session = store.load_session()?;
    let book = store.load_plan()?;
    let viewed = session.viewed_date(today);

    renderer.print_stats(viewed, &book.stats(viewed))?;
    Ok(())
}

#[instrument(skip(store, expr, today))]
fn cmd_date(store: &mut DataStore, expr: Option<&str>, today: NaiveDate) -> anyhow::Result<()> {
    info!("command date");

    let mut session = store.load_session()?;
    let viewed = session.viewed_date(today);

    let Some(expr) = expr else {
        let suffix = if viewed == today { " (today)" } else { "" };
        println!("Viewing {}{suffix}.", date_key(viewed));
        return Ok(());
    };

    let new_date = parse_date_expr(expr, viewed, today)?;

    // Storing None for "today" keeps the view following the clock.
    session.viewed = if new_date == today {
        None
    } else {
        Some(new_date)
    };
    store.save_session(&session)?;

    println!("Now viewing {}.", date_key(new_date));
    Ok(())
}

#[instrument(skip(cfg))]
fn cmd_countdown(cfg: &Config) -> anyhow::Result<()> {
    info!("command countdown");

    let end = cfg.vacation_end()?;
    let days = days_until(end, Local::now());

    if days == 0 {
        println!("The vacation is over ({} has passed).", date_key(end));
    } else {
        println!("{days} day(s) left until {}.", date_key(end));
    }
    Ok(())
}

#[instrument(skip(store, renderer, action))]
fn cmd_tasks(
    store: &mut DataStore,
    renderer: &mut Renderer,
    action: Option<TasksCommand>,
) -> anyhow::Result<()> {
    info!("command tasks");

    let mut session = store.load_session()?;

    match action {
        None => renderer.print_palette(&session.palette())?,
        Some(TasksCommand::Add { name }) => {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(anyhow!("task name cannot be empty"));
            }
            if session.add_custom_task(&name) {
                store.save_session(&session)?;
                println!("Added task '{name}' to the palette.");
            } else {
                println!("Task '{name}' is already in the palette.");
            }
        }
    }

    Ok(())
}

#[instrument(skip(store, output, today))]
fn cmd_export(
    store: &mut DataStore,
    output: Option<PathBuf>,
    today: NaiveDate,
) -> anyhow::Result<()> {
    info!("command export");

    let Some(raw) = store.raw_plan()? else {
        return Err(anyhow!("no plan data to export yet"));
    };

    let path = output.unwrap_or_else(|| PathBuf::from(format!("respite-plan-{}.json", date_key(today))));
    fs::write(&path, &raw).with_context(|| format!("failed writing {}", path.display()))?;

    println!("Exported plan to {}.", path.display());
    Ok(())
}

#[instrument(skip(store, path))]
fn cmd_import(store: &mut DataStore, path: &Path) -> anyhow::Result<()> {
    info!("command import");

    let text =
        fs::read_to_string(path).with_context(|| format!("failed reading {}", path.display()))?;

    // Parse first; a malformed file must leave the stored plan untouched.
    let book = datastore::parse_plan(&text)
        .with_context(|| format!("import rejected: {}", path.display()))?;

    store.save_plan(&book)?;
    println!("Imported {} day(s) from {}.", book.day_count(), path.display());
    Ok(())
}

#[instrument(skip(store))]
fn cmd_clear(store: &mut DataStore, yes: bool) -> anyhow::Result<()> {
    info!("command clear");

    if !yes && !ask_confirmation("This removes all planner data. Continue? [y/N] ") {
        println!("Aborted.");
        return Ok(());
    }

    store.clear()?;
    println!("All planner data removed.");
    Ok(())
}

fn ask_confirmation(prompt: &str) -> bool {
    print!("{prompt}");
    let _ = io::stdout().flush();

    let mut answer = String::new();
    if io::stdin().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
